use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{
    weight_metric, AgentInfo, DailyRow, MetricBag, Metrics, SummaryRow, COUNT_METRICS,
    RATE_METRICS, RECORD_TYPE_SUPERVISOR,
};

/// Weighted running state for one rate metric: numerator Σ(rate × weight)
/// and denominator Σ(weight). Days (or agents) with a null rate contribute
/// to neither, so means stay unbiased by absent data.
#[derive(Debug, Clone, Copy, Default)]
struct Weighted {
    numerator: f64,
    weight: i64,
}

impl Weighted {
    fn add(&mut self, rate: f64, weight: i64) {
        self.numerator += rate * weight as f64;
        self.weight += weight;
    }

    /// Undefined (null) on a zero denominator, never 0/0 = 0.
    fn mean(self) -> Option<f64> {
        (self.weight > 0).then(|| self.numerator / self.weight as f64)
    }
}

#[derive(Debug, Clone, Default)]
struct Accum {
    agent: AgentInfo,
    counts: BTreeMap<&'static str, i64>,
    rates: BTreeMap<&'static str, Weighted>,
}

impl Accum {
    fn add_counts(&mut self, metrics: &Metrics) {
        for name in COUNT_METRICS {
            *self.counts.entry(name).or_insert(0) += metrics.count(name);
        }
    }

    fn into_metrics(self) -> Metrics {
        let mut bag = MetricBag {
            counts: self.counts,
            ..MetricBag::default()
        };
        for (name, weighted) in self.rates {
            bag.rates.insert(name, weighted.mean());
        }
        Metrics::from_bag(&bag)
    }
}

/// Builds the two-tier summary: per-agent totals with weighted rate
/// averages, rolled up to one total row per supervisor with the same
/// weighting discipline, supervisor rows placed above their agents.
///
/// Each rate is weighted by its companion count (surveys for csat/nps,
/// resolved tickets for response and resolution figures, audits for the
/// audit score). The supervisor step weights each agent's aggregated rate
/// by that agent's accumulated weight, which composes to the same result as
/// aggregating straight from days.
pub fn build_summary(daily: &[DailyRow]) -> Vec<SummaryRow> {
    // day -> agent
    let mut agents: BTreeMap<String, Accum> = BTreeMap::new();
    for row in daily {
        let accum = agents.entry(row.agent_email.clone()).or_default();
        accum.agent = row.agent.clone();
        accum.add_counts(&row.metrics);
        for name in RATE_METRICS {
            if let Some(rate) = row.metrics.rate(name) {
                let weight = row.metrics.count(weight_metric(name));
                accum
                    .rates
                    .entry(name)
                    .or_default()
                    .add(rate, weight);
            }
        }
    }

    // agent -> supervisor, reusing the agents' weighted numerators so the
    // two-stage mean matches a one-stage mean from days
    let mut supervisor_order: Vec<String> = Vec::new();
    let mut supervisors: BTreeMap<String, Accum> = BTreeMap::new();
    for accum in agents.values() {
        let name = accum.agent.supervisor.clone();
        if name.is_empty() {
            continue;
        }
        if !supervisors.contains_key(&name) {
            supervisor_order.push(name.clone());
        }
        let total = supervisors.entry(name).or_default();
        total.agent = AgentInfo {
            supervisor: accum.agent.supervisor.clone(),
            supervisor_email: accum.agent.supervisor_email.clone(),
            ..AgentInfo::default()
        };
        for name in COUNT_METRICS {
            *total.counts.entry(name).or_insert(0) +=
                accum.counts.get(name).copied().unwrap_or(0);
        }
        for (&name, weighted) in &accum.rates {
            let entry = total.rates.entry(name).or_default();
            entry.numerator += weighted.numerator;
            entry.weight += weighted.weight;
        }
    }

    debug!(
        agents = agents.len(),
        supervisors = supervisors.len(),
        "summary aggregation complete"
    );

    let mut agent_rows: BTreeMap<String, Vec<SummaryRow>> = BTreeMap::new();
    let mut orphans: Vec<SummaryRow> = Vec::new();
    for (email, accum) in agents {
        let supervisor = accum.agent.supervisor.clone();
        let row = SummaryRow {
            record_type: String::new(),
            supervisor: supervisor.clone(),
            agent_email: email,
            agent: accum.agent.clone(),
            metrics: accum.into_metrics(),
        };
        if supervisor.is_empty() {
            orphans.push(row);
        } else {
            agent_rows.entry(supervisor).or_default().push(row);
        }
    }

    let mut rows = Vec::new();
    for name in supervisor_order {
        let accum = supervisors.remove(&name).unwrap_or_default();
        rows.push(SummaryRow {
            record_type: RECORD_TYPE_SUPERVISOR.to_string(),
            supervisor: name.clone(),
            agent_email: String::new(),
            agent: accum.agent.clone(),
            metrics: accum.into_metrics(),
        });
        rows.extend(agent_rows.remove(&name).unwrap_or_default());
    }
    // agents without a supervisor trail the table; there is no meaningful
    // total row to head them
    rows.extend(orphans);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn agent_info(supervisor: &str) -> AgentInfo {
        AgentInfo {
            supervisor: supervisor.to_string(),
            supervisor_email: if supervisor.is_empty() {
                String::new()
            } else {
                format!("{}@x.com", supervisor.to_lowercase())
            },
            ..AgentInfo::default()
        }
    }

    fn day(agent: &str, supervisor: &str, date: NaiveDate, metrics: Metrics) -> DailyRow {
        DailyRow {
            date,
            agent_email: agent.to_string(),
            agent: agent_info(supervisor),
            metrics,
        }
    }

    #[test]
    fn agent_rates_are_weighted_by_their_companion_counts() {
        let daily = vec![
            day(
                "a@x.com",
                "Sofia",
                ymd(2025, 3, 10),
                Metrics {
                    survey_count: 3,
                    csat: Some(5.0),
                    ..Metrics::default()
                },
            ),
            day(
                "a@x.com",
                "Sofia",
                ymd(2025, 3, 11),
                Metrics {
                    survey_count: 1,
                    csat: Some(1.0),
                    ..Metrics::default()
                },
            ),
        ];
        let summary = build_summary(&daily);
        let agent = summary
            .iter()
            .find(|r| r.agent_email == "a@x.com")
            .unwrap();
        // (5*3 + 1*1) / 4 = 4.0, not the naive (5+1)/2 = 3.0
        assert_eq!(agent.metrics.csat, Some(4.0));
        assert_eq!(agent.metrics.survey_count, 4);
    }

    #[test]
    fn zero_weight_yields_null_not_zero() {
        let daily = vec![day(
            "a@x.com",
            "Sofia",
            ymd(2025, 3, 10),
            Metrics {
                // response time observed, but nothing resolved to weight it
                first_response_time: Some(2.5),
                resolved_count: 0,
                ..Metrics::default()
            },
        )];
        let summary = build_summary(&daily);
        let agent = summary
            .iter()
            .find(|r| r.agent_email == "a@x.com")
            .unwrap();
        assert_eq!(agent.metrics.first_response_time, None);
        assert_eq!(agent.metrics.csat, None);
    }

    #[test]
    fn supervisor_rows_precede_their_agents() {
        let daily = vec![
            day(
                "b@x.com",
                "Sofia",
                ymd(2025, 3, 10),
                Metrics {
                    ticket_count: 1,
                    ..Metrics::default()
                },
            ),
            day(
                "a@x.com",
                "Sofia",
                ymd(2025, 3, 10),
                Metrics {
                    ticket_count: 2,
                    ..Metrics::default()
                },
            ),
            day(
                "c@x.com",
                "Marco",
                ymd(2025, 3, 10),
                Metrics {
                    ticket_count: 4,
                    ..Metrics::default()
                },
            ),
        ];
        let summary = build_summary(&daily);
        let shape: Vec<(&str, &str, &str)> = summary
            .iter()
            .map(|r| {
                (
                    r.record_type.as_str(),
                    r.supervisor.as_str(),
                    r.agent_email.as_str(),
                )
            })
            .collect();
        // supervisors in first-appearance order over the email-sorted agents
        assert_eq!(
            shape,
            vec![
                (RECORD_TYPE_SUPERVISOR, "Sofia", ""),
                ("", "Sofia", "a@x.com"),
                ("", "Sofia", "b@x.com"),
                (RECORD_TYPE_SUPERVISOR, "Marco", ""),
                ("", "Marco", "c@x.com"),
            ]
        );
        // supervisor totals sum their agents
        assert_eq!(summary[0].metrics.ticket_count, 3);
        assert_eq!(summary[3].metrics.ticket_count, 4);
        // identity fields blank except supervisor name/email
        assert_eq!(summary[0].agent.first_name, "");
        assert_eq!(summary[0].agent.supervisor_email, "sofia@x.com");
    }

    #[test]
    fn supervisor_rates_weight_agents_by_their_volume() {
        let daily = vec![
            day(
                "a@x.com",
                "Sofia",
                ymd(2025, 3, 10),
                Metrics {
                    survey_count: 9,
                    csat: Some(5.0),
                    ..Metrics::default()
                },
            ),
            day(
                "b@x.com",
                "Sofia",
                ymd(2025, 3, 10),
                Metrics {
                    survey_count: 1,
                    csat: Some(1.0),
                    ..Metrics::default()
                },
            ),
        ];
        let summary = build_summary(&daily);
        let total = &summary[0];
        assert_eq!(total.record_type, RECORD_TYPE_SUPERVISOR);
        // (5*9 + 1*1) / 10 = 4.6, not the per-agent-equal (5+1)/2
        assert_eq!(total.metrics.csat, Some(4.6));
    }

    #[test]
    fn two_stage_weighting_matches_one_stage_from_days() {
        // several agents, uneven weights, spread over days
        let daily = vec![
            day("a@x.com", "Sofia", ymd(2025, 3, 10), Metrics {
                survey_count: 2,
                csat: Some(4.0),
                resolved_count: 3,
                full_resolution_time: Some(6.0),
                ..Metrics::default()
            }),
            day("a@x.com", "Sofia", ymd(2025, 3, 11), Metrics {
                survey_count: 5,
                csat: Some(3.0),
                resolved_count: 1,
                full_resolution_time: Some(2.0),
                ..Metrics::default()
            }),
            day("b@x.com", "Sofia", ymd(2025, 3, 10), Metrics {
                survey_count: 1,
                csat: Some(5.0),
                resolved_count: 4,
                full_resolution_time: Some(8.0),
                ..Metrics::default()
            }),
        ];

        // one-stage weighted mean straight from daily rows
        let direct = |rate: fn(&Metrics) -> Option<f64>, weight: fn(&Metrics) -> i64| {
            let mut acc = Weighted::default();
            for row in &daily {
                if let Some(v) = rate(&row.metrics) {
                    acc.add(v, weight(&row.metrics));
                }
            }
            acc.mean().unwrap()
        };
        let direct_csat = direct(|m| m.csat, |m| m.survey_count);
        let direct_furt = direct(|m| m.full_resolution_time, |m| m.resolved_count);

        let summary = build_summary(&daily);
        let total = &summary[0];
        assert_eq!(total.record_type, RECORD_TYPE_SUPERVISOR);
        let round2 = |v: f64| (v * 100.0).round() / 100.0;
        assert!((total.metrics.csat.unwrap() - round2(direct_csat)).abs() < 1e-9);
        assert!(
            (total.metrics.full_resolution_time.unwrap() - round2(direct_furt)).abs() < 1e-9
        );
    }

    #[test]
    fn agents_without_a_supervisor_trail_with_no_total_row() {
        let daily = vec![
            day(
                "a@x.com",
                "Sofia",
                ymd(2025, 3, 10),
                Metrics {
                    ticket_count: 1,
                    ..Metrics::default()
                },
            ),
            day(
                "ghost@x.com",
                "",
                ymd(2025, 3, 10),
                Metrics {
                    sales_total: 500,
                    ..Metrics::default()
                },
            ),
        ];
        let summary = build_summary(&daily);
        let last = summary.last().unwrap();
        assert_eq!(last.agent_email, "ghost@x.com");
        assert_eq!(last.record_type, "");
        assert_eq!(last.metrics.sales_total, 500);
        // no blank-supervisor total row anywhere
        assert!(!summary
            .iter()
            .any(|r| r.record_type == RECORD_TYPE_SUPERVISOR && r.supervisor.is_empty()));
    }
}
