use chrono::{Datelike, Duration, NaiveDate};

/// Spreadsheet serial day-counts use the 1899-12-30 epoch.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Only values above this are treated as spreadsheet serials; smaller bare
/// numbers (a stray year, an id) fall through to the pattern parsers.
const SERIAL_FLOOR: f64 = 30000.0;

// two-digit-year forms go first: chrono's %Y happily reads "25" as year 25
const DAY_FIRST_FORMATS: [&str; 4] = ["%d/%m/%y", "%d-%m-%y", "%d/%m/%Y", "%d-%m-%Y"];
const YEAR_FIRST_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Normalizes one raw cell value to a calendar date.
///
/// Resolution order: spreadsheet serial, explicit day-first patterns,
/// unambiguous year-first patterns, then a token fallback that still reads
/// day before month. Source documents come from a day-first region, so
/// `03/04/2025` is always April 3rd. Trailing time-of-day is ignored.
/// Returns `None` for anything unparseable; callers drop such rows instead
/// of failing the batch.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let text = strip_time(raw.trim());
    if text.is_empty() {
        return None;
    }

    if let Some(date) = parse_serial(text) {
        return Some(date);
    }
    for format in DAY_FIRST_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in YEAR_FIRST_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    parse_tokens(text)
}

/// Keeps only the date part of values like `15/03/2025 14:30` or
/// `2025-03-15T14:30:00`.
fn strip_time(text: &str) -> &str {
    let end = text
        .find(|c: char| c == ' ' || c == 'T')
        .unwrap_or(text.len());
    &text[..end]
}

fn parse_serial(text: &str) -> Option<NaiveDate> {
    if !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = text.parse().ok()?;
    if value <= SERIAL_FLOOR {
        return None;
    }
    let (year, month, day) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)?;
    epoch.checked_add_signed(Duration::days(value as i64))
}

/// Last-resort parse: three numeric tokens separated by `/`, `-` or `.`,
/// read day-first unless the leading token is a four-digit year.
fn parse_tokens(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text.split(['/', '-', '.']).collect();
    if tokens.len() != 3 {
        return None;
    }
    let numbers: Vec<u32> = tokens
        .iter()
        .map(|t| t.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;

    let (year, month, day) = if tokens[0].len() == 4 {
        (numbers[0], numbers[1], numbers[2])
    } else {
        (expand_year(numbers[2]), numbers[1], numbers[0])
    };
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

/// Two-digit years follow the usual pivot: 00-68 => 2000s, 69-99 => 1900s.
fn expand_year(year: u32) -> u32 {
    match year {
        0..=68 => 2000 + year,
        69..=99 => 1900 + year,
        _ => year,
    }
}

pub fn in_range(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    date >= from && date <= to
}

/// Monday on or before the given date; weekly buckets anchor here.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
