use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dates::{in_range, normalize_date};
use crate::models::{metric, MetricBag};
use crate::table::{Row, Table};

/// Performance rows outside this service group belong to other teams and are
/// excluded before grouping.
const SERVICE_GROUP: &str = "C_Ops Support";

/// Reduced output of one extractor: one metric bag per (agent key, date).
pub type SourceTable = BTreeMap<(String, NaiveDate), MetricBag>;

/// One derived metric value for a single source row.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    /// Count-like: summed within the (agent, date) group.
    Count(i64),
    /// Rate-like: averaged within the group, missing values excluded from
    /// the mean rather than counted as zero.
    Rate(Option<f64>),
}

/// Everything that distinguishes one source extractor from another. The
/// engine in [`run_extractor`] is shared; sales, performance, and audits
/// differ only in this description.
pub struct SourceConfig {
    pub name: &'static str,
    pub date_column: &'static str,
    pub agent_column: &'static str,
    /// Columns (beyond date and agent) whose absence empties the extractor.
    pub required: &'static [&'static str],
    /// Row-level predicate applied after date filtering.
    pub filter: Option<fn(&Row) -> bool>,
    /// Per-row metric derivation.
    pub derive: fn(&Row) -> Vec<(&'static str, Value)>,
    /// When set, a group whose rate has no numeric observations reports 0
    /// instead of null. Only audits opt in: an audit that produced no valid
    /// score is scored as failing, while performance rates stay null so
    /// means over observed days stay unbiased.
    pub rate_missing_as_zero: bool,
}

/// Per-group accumulation state: running sums for counts, (sum, n) pairs
/// for rates.
#[derive(Debug, Clone, Default)]
struct Accum {
    counts: BTreeMap<&'static str, i64>,
    rates: BTreeMap<&'static str, (f64, u32)>,
}

/// Filters one snapshot to the date range and reduces it to one metric bag
/// per (agent key, date). Absent or empty input and missing required
/// columns both degrade to an empty table; no source problem is fatal.
pub fn run_extractor(
    config: &SourceConfig,
    table: Option<&Table>,
    from: NaiveDate,
    to: NaiveDate,
) -> SourceTable {
    let Some(table) = table else {
        debug!(source = config.name, "no snapshot provided");
        return SourceTable::new();
    };
    if table.is_empty() {
        debug!(source = config.name, "snapshot is empty");
        return SourceTable::new();
    }

    for &column in [config.date_column, config.agent_column]
        .iter()
        .chain(config.required)
    {
        if table.column(column).is_none() {
            warn!(
                source = config.name,
                column, "required column missing, source contributes no rows"
            );
            return SourceTable::new();
        }
    }

    let mut groups: BTreeMap<(String, NaiveDate), Accum> = BTreeMap::new();
    let mut unparseable = 0usize;

    for row in table.rows() {
        let date = match row.get(config.date_column).and_then(normalize_date) {
            Some(date) => date,
            None => {
                unparseable += 1;
                continue;
            }
        };
        if !in_range(date, from, to) {
            continue;
        }
        let Some(agent_raw) = row.get(config.agent_column) else {
            continue;
        };
        let agent = agent_raw.to_lowercase();
        if let Some(filter) = config.filter {
            if !filter(&row) {
                continue;
            }
        }

        let accum = groups.entry((agent, date)).or_default();
        for (name, value) in (config.derive)(&row) {
            match value {
                Value::Count(n) => *accum.counts.entry(name).or_insert(0) += n,
                Value::Rate(Some(v)) => {
                    let (sum, n) = accum.rates.entry(name).or_insert((0.0, 0));
                    *sum += v;
                    *n += 1;
                }
                // keep the column present so the group reports null (or
                // zero, per policy) instead of omitting it
                Value::Rate(None) => {
                    accum.rates.entry(name).or_insert((0.0, 0));
                }
            }
        }
    }

    if unparseable > 0 {
        debug!(
            source = config.name,
            rows = unparseable,
            "dropped rows with unparseable dates"
        );
    }

    groups
        .into_iter()
        .map(|(key, accum)| {
            let mut bag = MetricBag {
                counts: accum.counts,
                ..MetricBag::default()
            };
            for (name, (sum, n)) in accum.rates {
                let mean = if n > 0 {
                    Some(sum / n as f64)
                } else if config.rate_missing_as_zero {
                    Some(0.0)
                } else {
                    None
                };
                bag.rates.insert(name, mean);
            }
            (key, bag)
        })
        .collect()
}

/// Sales snapshot: monetary strings scrubbed to integers, split into shared
/// and exclusive sub-totals by product name.
pub fn extract_sales(table: Option<&Table>, from: NaiveDate, to: NaiveDate) -> SourceTable {
    const CONFIG: SourceConfig = SourceConfig {
        name: "sales",
        date_column: "date",
        agent_column: "ds_agent_email",
        required: &[],
        filter: None,
        derive: derive_sales,
        rate_missing_as_zero: false,
    };
    run_extractor(&CONFIG, table, from, to)
}

fn derive_sales(row: &Row) -> Vec<(&'static str, Value)> {
    let price = scrub_money(row.get("qt_price_local").unwrap_or(""));
    let product = row
        .get("ds_product_name")
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let shared = if product == "van_compartida" { price } else { 0 };
    let exclusive = if product == "van_exclusive" { price } else { 0 };
    vec![
        (metric::SALES_TOTAL, Value::Count(price)),
        (metric::SALES_SHARED, Value::Count(shared)),
        (metric::SALES_EXCLUSIVE, Value::Count(exclusive)),
    ]
}

/// Amounts arrive contaminated with currency symbols and Latin-style
/// thousands separators (`$1.234`, `1,234`). Strip all of them; the period
/// is a separator here, never a decimal point.
fn scrub_money(raw: &str) -> i64 {
    raw.replace(['$', ',', '.'], "").trim().parse().unwrap_or(0)
}

/// Support-performance snapshot: one ticket per row, survey and resolution
/// indicators derived, satisfaction and response-time figures averaged.
pub fn extract_performance(table: Option<&Table>, from: NaiveDate, to: NaiveDate) -> SourceTable {
    const CONFIG: SourceConfig = SourceConfig {
        name: "performance",
        date_column: "Fecha de Referencia",
        agent_column: "Assignee Email",
        required: &["Group Support Service"],
        filter: Some(in_service_group),
        derive: derive_performance,
        rate_missing_as_zero: false,
    };
    run_extractor(&CONFIG, table, from, to)
}

fn in_service_group(row: &Row) -> bool {
    row.get("Group Support Service") == Some(SERVICE_GROUP)
}

fn derive_performance(row: &Row) -> Vec<(&'static str, Value)> {
    let has_survey = row.get("CSAT").is_some() || row.get("NPS Score").is_some();
    let resolved = row
        .get("Status")
        .is_some_and(|s| s.eq_ignore_ascii_case("solved"));
    let reopen = to_f64(row.get("Reopen")).map_or(0, |v| v as i64);

    vec![
        (metric::SURVEY_COUNT, Value::Count(i64::from(has_survey))),
        (metric::CSAT, Value::Rate(to_f64(row.get("CSAT")))),
        (metric::NPS, Value::Rate(to_f64(row.get("NPS Score")))),
        (
            metric::FIRST_RESPONSE_TIME,
            Value::Rate(to_f64(row.get("Firt (h)"))),
        ),
        (
            metric::FIRST_RESPONSE_RATE,
            Value::Rate(to_f64(row.get("% Firt"))),
        ),
        (
            metric::FULL_RESOLUTION_TIME,
            Value::Rate(to_f64(row.get("Furt (h)"))),
        ),
        (
            metric::FULL_RESOLUTION_RATE,
            Value::Rate(to_f64(row.get("% Furt"))),
        ),
        (metric::REOPEN_COUNT, Value::Count(reopen)),
        (metric::TICKET_COUNT, Value::Count(1)),
        (metric::RESOLVED_COUNT, Value::Count(i64::from(resolved))),
    ]
}

/// Quality-audit snapshot: one audit per row; identifiers without an `@`
/// are non-agent audits and are skipped.
pub fn extract_audits(table: Option<&Table>, from: NaiveDate, to: NaiveDate) -> SourceTable {
    const CONFIG: SourceConfig = SourceConfig {
        name: "audits",
        date_column: "Date Time",
        agent_column: "Audited Agent",
        required: &[],
        filter: Some(is_agent_audit),
        derive: derive_audit,
        rate_missing_as_zero: true,
    };
    run_extractor(&CONFIG, table, from, to)
}

fn is_agent_audit(row: &Row) -> bool {
    row.get("Audited Agent").is_some_and(|a| a.contains('@'))
}

fn derive_audit(row: &Row) -> Vec<(&'static str, Value)> {
    vec![
        (metric::AUDIT_COUNT, Value::Count(1)),
        (
            metric::AUDIT_SCORE,
            Value::Rate(to_f64(row.get("Total Audit Score"))),
        ),
    ]
}

/// Lenient numeric coercion: anything that does not parse is missing, not
/// zero.
fn to_f64(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
