use std::path::Path;

use anyhow::Context;

use crate::models::{AgentInfo, Metrics};
use crate::pipeline::Reports;

const IDENTITY_HEADERS: [&str; 7] = [
    "first_name",
    "last_name",
    "second_last_name",
    "contract_type",
    "start_date",
    "supervisor",
    "supervisor_email",
];

const METRIC_HEADERS: [&str; 15] = [
    "survey_count",
    "csat",
    "nps",
    "first_response_time",
    "first_response_rate",
    "full_resolution_time",
    "full_resolution_rate",
    "reopen_count",
    "ticket_count",
    "resolved_count",
    "audit_count",
    "audit_score",
    "sales_total",
    "sales_shared",
    "sales_exclusive",
];

/// Writes `daily.csv`, `weekly.csv`, and `summary.csv` into the output
/// directory. Counts render as integers, rates with two decimals or empty
/// when null, dates in ISO form. Formatting only; the computed values are
/// the pipeline's.
pub fn write_reports(reports: &Reports, out_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    write_daily(reports, &out_dir.join("daily.csv"))?;
    write_weekly(reports, &out_dir.join("weekly.csv"))?;
    write_summary(reports, &out_dir.join("summary.csv"))?;
    Ok(())
}

fn write_daily(reports: &Reports, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut header = vec!["date".to_string()];
    header.extend(identity_header_with_email());
    header.extend(METRIC_HEADERS.iter().map(|h| h.to_string()));
    writer.write_record(&header)?;

    for row in &reports.daily {
        let mut record = vec![row.date.to_string()];
        record.extend(identity_cells(&row.agent, &row.agent_email));
        record.extend(metric_cells(&row.metrics));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_weekly(reports: &Reports, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut header = vec!["week".to_string()];
    header.extend(identity_header_with_email());
    header.extend(METRIC_HEADERS.iter().map(|h| h.to_string()));
    writer.write_record(&header)?;

    for row in &reports.weekly {
        let mut record = vec![row.week.clone()];
        record.extend(identity_cells(&row.agent, &row.agent_email));
        record.extend(metric_cells(&row.metrics));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary(reports: &Reports, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut header = vec!["record_type".to_string(), "supervisor".to_string()];
    header.extend(
        IDENTITY_HEADERS
            .iter()
            // supervisor already leads the summary; email slots in after the
            // name columns
            .filter(|h| **h != "supervisor")
            .map(|h| h.to_string()),
    );
    header.insert(5, "email".to_string());
    writer.write_record(&header)?;

    for row in &reports.summary {
        let record = vec![
            row.record_type.clone(),
            row.supervisor.clone(),
            row.agent.first_name.clone(),
            row.agent.last_name.clone(),
            row.agent.second_last_name.clone(),
            row.agent_email.clone(),
            row.agent.contract_type.clone(),
            row.agent.start_date.clone(),
            row.agent.supervisor_email.clone(),
        ]
        .into_iter()
        .chain(metric_cells(&row.metrics))
        .collect::<Vec<_>>();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn identity_header_with_email() -> Vec<String> {
    let mut header: Vec<String> = IDENTITY_HEADERS.iter().map(|h| h.to_string()).collect();
    header.insert(3, "email".to_string());
    header
}

fn identity_cells(agent: &AgentInfo, email: &str) -> Vec<String> {
    vec![
        agent.first_name.clone(),
        agent.last_name.clone(),
        agent.second_last_name.clone(),
        email.to_string(),
        agent.contract_type.clone(),
        agent.start_date.clone(),
        agent.supervisor.clone(),
        agent.supervisor_email.clone(),
    ]
}

fn metric_cells(metrics: &Metrics) -> Vec<String> {
    vec![
        metrics.survey_count.to_string(),
        rate_cell(metrics.csat),
        rate_cell(metrics.nps),
        rate_cell(metrics.first_response_time),
        rate_cell(metrics.first_response_rate),
        rate_cell(metrics.full_resolution_time),
        rate_cell(metrics.full_resolution_rate),
        metrics.reopen_count.to_string(),
        metrics.ticket_count.to_string(),
        metrics.resolved_count.to_string(),
        metrics.audit_count.to_string(),
        rate_cell(metrics.audit_score),
        metrics.sales_total.to_string(),
        metrics.sales_shared.to_string(),
        metrics.sales_exclusive.to_string(),
    ]
}

fn rate_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}
