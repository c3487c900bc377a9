use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::dates::week_start_of;
use crate::models::{
    AgentInfo, DailyRow, MetricBag, Metrics, WeeklyRow, COUNT_METRICS, RATE_METRICS,
};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Buckets the daily matrix into 7-day windows anchored to the batch's
/// earliest date (not calendar-absolute weeks) and rolls each (agent, week)
/// group up: counts summed, rates averaged without weighting. The weekly
/// view deliberately keeps simple means; the weighted discipline belongs to
/// the summary.
pub fn build_weekly(daily: &[DailyRow]) -> Vec<WeeklyRow> {
    let Some(first_date) = daily.iter().map(|row| row.date).min() else {
        return Vec::new();
    };
    let anchor = week_start_of(first_date);

    struct Group {
        agent: AgentInfo,
        counts: BTreeMap<&'static str, i64>,
        rates: BTreeMap<&'static str, (f64, u32)>,
    }

    let mut groups: BTreeMap<(String, i64), Group> = BTreeMap::new();
    for row in daily {
        let index = (row.date - anchor).num_days() / 7;
        let group = groups
            .entry((row.agent_email.clone(), index))
            .or_insert_with(|| Group {
                agent: row.agent.clone(),
                counts: BTreeMap::new(),
                rates: BTreeMap::new(),
            });
        for name in COUNT_METRICS {
            *group.counts.entry(name).or_insert(0) += row.metrics.count(name);
        }
        for name in RATE_METRICS {
            if let Some(value) = row.metrics.rate(name) {
                let (sum, n) = group.rates.entry(name).or_insert((0.0, 0));
                *sum += value;
                *n += 1;
            }
        }
    }

    groups
        .into_iter()
        .map(|((agent_email, index), group)| {
            let mut bag = MetricBag {
                counts: group.counts,
                ..MetricBag::default()
            };
            for (name, (sum, n)) in group.rates {
                bag.rates.insert(name, Some(sum / n as f64));
            }
            WeeklyRow {
                week: week_label(anchor, index),
                agent_email,
                agent: group.agent,
                metrics: Metrics::from_bag(&bag),
            }
        })
        .collect()
}

/// `Week 3 to 9 of March`, or `Week 28 of April to 4 of May` when the
/// window straddles a month boundary.
fn week_label(anchor: NaiveDate, index: i64) -> String {
    let start = anchor + Duration::days(index * 7);
    let end = start + Duration::days(6);
    let end_month = MONTH_NAMES[end.month0() as usize];
    if start.month() == end.month() {
        format!("Week {} to {} of {}", start.day(), end.day(), end_month)
    } else {
        let start_month = MONTH_NAMES[start.month0() as usize];
        format!(
            "Week {} of {} to {} of {}",
            start.day(),
            start_month,
            end.day(),
            end_month
        )
    }
}
