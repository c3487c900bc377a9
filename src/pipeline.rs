use chrono::NaiveDate;
use tracing::info;

use crate::error::{ReportError, Result};
use crate::models::{DailyRow, SummaryRow, WeeklyRow};
use crate::table::Table;
use crate::{daily, extract, roster, summary, weekly};

/// The three derived tables produced by one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reports {
    pub daily: Vec<DailyRow>,
    pub weekly: Vec<WeeklyRow>,
    pub summary: Vec<SummaryRow>,
}

/// Runs the whole reconciliation batch: extract each source, outer-merge
/// into the daily matrix, roll up weekly and summary views. Every input is
/// optional; a missing or malformed source contributes no rows instead of
/// failing the batch. The only rejected condition is an inverted date
/// range.
pub fn build_reports(
    sales: Option<&Table>,
    performance: Option<&Table>,
    audits: Option<&Table>,
    roster_table: Option<&Table>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Reports> {
    if from > to {
        return Err(ReportError::InvalidDateRange { from, to });
    }

    let roster = roster::parse_roster(roster_table);
    info!(agents = roster.len(), %from, %to, "starting batch");

    let sales_daily = extract::extract_sales(sales, from, to);
    let performance_daily = extract::extract_performance(performance, from, to);
    let audit_daily = extract::extract_audits(audits, from, to);
    info!(
        sales = sales_daily.len(),
        performance = performance_daily.len(),
        audits = audit_daily.len(),
        "sources extracted"
    );

    let daily = daily::build_daily(vec![sales_daily, performance_daily, audit_daily], &roster);
    let weekly = weekly::build_weekly(&daily);
    let summary = summary::build_summary(&daily);
    info!(
        daily = daily.len(),
        weekly = weekly.len(),
        summary = summary.len(),
        "reports built"
    );

    Ok(Reports {
        daily,
        weekly,
        summary,
    })
}
