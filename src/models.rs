use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Identity and organizational fields attached from the roster. Every field
/// defaults to an empty string so rows with no roster match keep their
/// volume with blank identity instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentInfo {
    pub first_name: String,
    pub last_name: String,
    pub second_last_name: String,
    pub contract_type: String,
    pub start_date: String,
    pub supervisor: String,
    pub supervisor_email: String,
}

/// Metric column names shared by the three result tables.
pub mod metric {
    pub const SURVEY_COUNT: &str = "survey_count";
    pub const CSAT: &str = "csat";
    pub const NPS: &str = "nps";
    pub const FIRST_RESPONSE_TIME: &str = "first_response_time";
    pub const FIRST_RESPONSE_RATE: &str = "first_response_rate";
    pub const FULL_RESOLUTION_TIME: &str = "full_resolution_time";
    pub const FULL_RESOLUTION_RATE: &str = "full_resolution_rate";
    pub const REOPEN_COUNT: &str = "reopen_count";
    pub const TICKET_COUNT: &str = "ticket_count";
    pub const RESOLVED_COUNT: &str = "resolved_count";
    pub const AUDIT_COUNT: &str = "audit_count";
    pub const AUDIT_SCORE: &str = "audit_score";
    pub const SALES_TOTAL: &str = "sales_total";
    pub const SALES_SHARED: &str = "sales_shared";
    pub const SALES_EXCLUSIVE: &str = "sales_exclusive";
}

/// Count metrics aggregate by sum and render as integers.
pub const COUNT_METRICS: [&str; 8] = [
    metric::SURVEY_COUNT,
    metric::REOPEN_COUNT,
    metric::TICKET_COUNT,
    metric::RESOLVED_COUNT,
    metric::AUDIT_COUNT,
    metric::SALES_TOTAL,
    metric::SALES_SHARED,
    metric::SALES_EXCLUSIVE,
];

/// Rate metrics aggregate by (possibly weighted) mean and stay nullable.
pub const RATE_METRICS: [&str; 7] = [
    metric::CSAT,
    metric::NPS,
    metric::FIRST_RESPONSE_TIME,
    metric::FIRST_RESPONSE_RATE,
    metric::FULL_RESOLUTION_TIME,
    metric::FULL_RESOLUTION_RATE,
    metric::AUDIT_SCORE,
];

/// The count metric that denominates a given rate: survey scores are
/// weighted by surveys received, response/resolution figures by tickets
/// resolved, audit scores by audits performed.
pub fn weight_metric(rate: &str) -> &'static str {
    match rate {
        metric::CSAT | metric::NPS => metric::SURVEY_COUNT,
        metric::AUDIT_SCORE => metric::AUDIT_COUNT,
        _ => metric::RESOLVED_COUNT,
    }
}

/// Rate values are rounded to two decimal places in every result table.
pub fn round_rate(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * 100.0).round() / 100.0)
}

/// Loose bag of metric values keyed by column name, used while merging
/// extractor outputs before they are fixed into a typed [`Metrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricBag {
    pub counts: BTreeMap<&'static str, i64>,
    pub rates: BTreeMap<&'static str, Option<f64>>,
}

impl MetricBag {
    pub fn count(&self, name: &str) -> i64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn rate(&self, name: &str) -> Option<f64> {
        self.rates.get(name).copied().flatten()
    }
}

/// One fully-typed set of metric columns: counts as integers defaulting to
/// zero, rates as nullable decimals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub survey_count: i64,
    pub csat: Option<f64>,
    pub nps: Option<f64>,
    pub first_response_time: Option<f64>,
    pub first_response_rate: Option<f64>,
    pub full_resolution_time: Option<f64>,
    pub full_resolution_rate: Option<f64>,
    pub reopen_count: i64,
    pub ticket_count: i64,
    pub resolved_count: i64,
    pub audit_count: i64,
    pub audit_score: Option<f64>,
    pub sales_total: i64,
    pub sales_shared: i64,
    pub sales_exclusive: i64,
}

impl Metrics {
    /// Fixes a merged bag into typed columns, rounding every rate.
    pub fn from_bag(bag: &MetricBag) -> Self {
        Self {
            survey_count: bag.count(metric::SURVEY_COUNT),
            csat: round_rate(bag.rate(metric::CSAT)),
            nps: round_rate(bag.rate(metric::NPS)),
            first_response_time: round_rate(bag.rate(metric::FIRST_RESPONSE_TIME)),
            first_response_rate: round_rate(bag.rate(metric::FIRST_RESPONSE_RATE)),
            full_resolution_time: round_rate(bag.rate(metric::FULL_RESOLUTION_TIME)),
            full_resolution_rate: round_rate(bag.rate(metric::FULL_RESOLUTION_RATE)),
            reopen_count: bag.count(metric::REOPEN_COUNT),
            ticket_count: bag.count(metric::TICKET_COUNT),
            resolved_count: bag.count(metric::RESOLVED_COUNT),
            audit_count: bag.count(metric::AUDIT_COUNT),
            audit_score: round_rate(bag.rate(metric::AUDIT_SCORE)),
            sales_total: bag.count(metric::SALES_TOTAL),
            sales_shared: bag.count(metric::SALES_SHARED),
            sales_exclusive: bag.count(metric::SALES_EXCLUSIVE),
        }
    }

    pub fn count(&self, name: &str) -> i64 {
        match name {
            metric::SURVEY_COUNT => self.survey_count,
            metric::REOPEN_COUNT => self.reopen_count,
            metric::TICKET_COUNT => self.ticket_count,
            metric::RESOLVED_COUNT => self.resolved_count,
            metric::AUDIT_COUNT => self.audit_count,
            metric::SALES_TOTAL => self.sales_total,
            metric::SALES_SHARED => self.sales_shared,
            metric::SALES_EXCLUSIVE => self.sales_exclusive,
            _ => 0,
        }
    }

    pub fn rate(&self, name: &str) -> Option<f64> {
        match name {
            metric::CSAT => self.csat,
            metric::NPS => self.nps,
            metric::FIRST_RESPONSE_TIME => self.first_response_time,
            metric::FIRST_RESPONSE_RATE => self.first_response_rate,
            metric::FULL_RESOLUTION_TIME => self.full_resolution_time,
            metric::FULL_RESOLUTION_RATE => self.full_resolution_rate,
            metric::AUDIT_SCORE => self.audit_score,
            _ => None,
        }
    }
}

/// One row of the daily matrix: exactly one per (agent, date) pair seen in
/// any source within range.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub agent_email: String,
    pub agent: AgentInfo,
    pub metrics: Metrics,
}

/// One row of the weekly roll-up, keyed by (agent, week label).
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyRow {
    pub week: String,
    pub agent_email: String,
    pub agent: AgentInfo,
    pub metrics: Metrics,
}

/// Tag for supervisor total rows in the summary table; agent rows carry an
/// empty tag.
pub const RECORD_TYPE_SUPERVISOR: &str = "TOTAL_SUPERVISOR";

/// One row of the two-tier summary. Supervisor rows have blank identity
/// fields apart from the supervisor name and email.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub record_type: String,
    pub supervisor: String,
    pub agent_email: String,
    pub agent: AgentInfo,
    pub metrics: Metrics,
}
