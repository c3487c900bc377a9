use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::extract::SourceTable;
use crate::models::{DailyRow, MetricBag, Metrics};
use crate::roster::{self, Roster};

/// Outer-merges the extractor outputs on (agent key, date) and fixes the
/// result into typed daily rows: counts default to zero, rates are rounded,
/// roster identity is attached, rows sort by (date, agent). Sources carry
/// disjoint metric sets, so the union is order-independent; on a name
/// collision the first source to produce a value keeps it.
pub fn build_daily(sources: Vec<SourceTable>, roster: &Roster) -> Vec<DailyRow> {
    let mut merged: BTreeMap<(String, NaiveDate), MetricBag> = BTreeMap::new();

    for source in sources {
        for (key, bag) in source {
            let entry = merged.entry(key).or_default();
            for (name, value) in bag.counts {
                entry.counts.entry(name).or_insert(value);
            }
            for (name, value) in bag.rates {
                entry.rates.entry(name).or_insert(value);
            }
        }
    }

    let mut rows: Vec<DailyRow> = merged
        .into_iter()
        .map(|((agent_email, date), bag)| DailyRow {
            date,
            agent: roster::attach(roster, &agent_email),
            agent_email,
            metrics: Metrics::from_bag(&bag),
        })
        .collect();

    rows.sort_by(|a, b| (a.date, &a.agent_email).cmp(&(b.date, &b.agent_email)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{metric, AgentInfo};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn source(entries: &[(&str, NaiveDate, &[(&'static str, i64)], &[(&'static str, Option<f64>)])]) -> SourceTable {
        let mut table = SourceTable::new();
        for (agent, date, counts, rates) in entries {
            let bag = MetricBag {
                counts: counts.iter().copied().collect(),
                rates: rates.iter().copied().collect(),
            };
            table.insert((agent.to_string(), *date), bag);
        }
        table
    }

    #[test]
    fn outer_join_keeps_every_pair_from_any_source() {
        let d1 = ymd(2025, 3, 10);
        let d2 = ymd(2025, 3, 11);
        let sales = source(&[
            ("a@x.com", d1, &[(metric::SALES_TOTAL, 100)], &[]),
        ]);
        let perf = source(&[
            ("a@x.com", d1, &[(metric::TICKET_COUNT, 2)], &[(metric::CSAT, Some(4.5))]),
            ("b@x.com", d2, &[(metric::TICKET_COUNT, 1)], &[]),
        ]);
        let audits = source(&[
            ("c@x.com", d1, &[(metric::AUDIT_COUNT, 1)], &[(metric::AUDIT_SCORE, Some(90.0))]),
        ]);

        let daily = build_daily(vec![sales, perf, audits], &Roster::new());
        assert_eq!(daily.len(), 3);

        // merged pair carries both sources' metrics
        let a = &daily[0];
        assert_eq!(a.agent_email, "a@x.com");
        assert_eq!(a.metrics.sales_total, 100);
        assert_eq!(a.metrics.ticket_count, 2);
        assert_eq!(a.metrics.csat, Some(4.5));
        // absent metrics defaulted
        assert_eq!(a.metrics.audit_count, 0);
        assert_eq!(a.metrics.audit_score, None);
    }

    #[test]
    fn merge_is_independent_of_source_order() {
        let d = ymd(2025, 3, 10);
        let sales = source(&[("a@x.com", d, &[(metric::SALES_TOTAL, 100)], &[])]);
        let perf = source(&[("a@x.com", d, &[(metric::TICKET_COUNT, 1)], &[])]);

        let forward = build_daily(vec![sales.clone(), perf.clone()], &Roster::new());
        let reverse = build_daily(vec![perf, sales], &Roster::new());
        assert_eq!(forward, reverse);
    }

    #[test]
    fn rows_sort_by_date_then_agent() {
        let d1 = ymd(2025, 3, 10);
        let d2 = ymd(2025, 3, 11);
        let perf = source(&[
            ("b@x.com", d1, &[(metric::TICKET_COUNT, 1)], &[]),
            ("a@x.com", d2, &[(metric::TICKET_COUNT, 1)], &[]),
            ("a@x.com", d1, &[(metric::TICKET_COUNT, 1)], &[]),
        ]);
        let daily = build_daily(vec![perf], &Roster::new());
        let keys: Vec<(NaiveDate, &str)> = daily
            .iter()
            .map(|r| (r.date, r.agent_email.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![(d1, "a@x.com"), (d1, "b@x.com"), (d2, "a@x.com")]
        );
    }

    #[test]
    fn rates_are_rounded_to_two_decimals() {
        let d = ymd(2025, 3, 10);
        let perf = source(&[(
            "a@x.com",
            d,
            &[],
            &[(metric::CSAT, Some(4.666_666_7))],
        )]);
        let daily = build_daily(vec![perf], &Roster::new());
        assert_eq!(daily[0].metrics.csat, Some(4.67));
    }

    #[test]
    fn all_empty_sources_yield_an_empty_matrix() {
        let daily = build_daily(
            vec![SourceTable::new(), SourceTable::new(), SourceTable::new()],
            &Roster::new(),
        );
        assert!(daily.is_empty());
    }

    #[test]
    fn agents_missing_from_the_roster_are_retained_with_blanks() {
        let d = ymd(2025, 3, 15);
        let sales = source(&[("ghost@x.com", d, &[(metric::SALES_TOTAL, 500)], &[])]);

        let mut roster = Roster::new();
        roster.insert(
            "a@x.com".to_string(),
            AgentInfo {
                first_name: "Ana".to_string(),
                ..AgentInfo::default()
            },
        );

        let daily = build_daily(vec![sales], &roster);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].metrics.sales_total, 500);
        assert_eq!(daily[0].agent, AgentInfo::default());
    }
}
