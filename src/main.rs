use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod daily;
mod dates;
mod error;
mod export;
mod extract;
mod models;
mod pipeline;
mod roster;
mod summary;
mod table;
mod weekly;

use table::Table;

#[derive(Parser)]
#[command(name = "support-report-pipeline")]
#[command(
    about = "Reconciles sales, performance, audit, and roster snapshots into daily, weekly, and summary reports",
    long_about = None
)]
struct Cli {
    /// Sales transactions CSV
    #[arg(long)]
    sales: Option<PathBuf>,
    /// Support-performance tickets CSV
    #[arg(long)]
    performance: Option<PathBuf>,
    /// Quality audits CSV
    #[arg(long)]
    audits: Option<PathBuf>,
    /// Agent/supervisor roster CSV
    #[arg(long)]
    roster: Option<PathBuf>,
    /// Start of the reporting range (inclusive), e.g. 2025-03-01
    #[arg(long)]
    from: NaiveDate,
    /// End of the reporting range (inclusive)
    #[arg(long)]
    to: NaiveDate,
    /// Directory receiving daily.csv, weekly.csv, and summary.csv
    #[arg(long, default_value = "reports")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let sales = load_snapshot(cli.sales.as_deref())?;
    let performance = load_snapshot(cli.performance.as_deref())?;
    let audits = load_snapshot(cli.audits.as_deref())?;
    let roster = load_snapshot(cli.roster.as_deref())?;

    let reports = pipeline::build_reports(
        sales.as_ref(),
        performance.as_ref(),
        audits.as_ref(),
        roster.as_ref(),
        cli.from,
        cli.to,
    )?;

    export::write_reports(&reports, &cli.out_dir)?;
    println!(
        "Wrote {} daily, {} weekly, and {} summary rows to {}.",
        reports.daily.len(),
        reports.weekly.len(),
        reports.summary.len(),
        cli.out_dir.display()
    );
    Ok(())
}

/// Reads one snapshot CSV if a path was given. Tries comma first, then
/// retries with semicolons when the comma read collapses everything into a
/// single wide column, matching how these exports commonly arrive.
fn load_snapshot(path: Option<&Path>) -> anyhow::Result<Option<Table>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let mut table =
        read_csv(path, b',').with_context(|| format!("failed to read {}", path.display()))?;
    if looks_semicolon_delimited(&table) {
        table = read_csv(path, b';')
            .with_context(|| format!("failed to read {}", path.display()))?;
    }
    info!(
        path = %path.display(),
        rows = table.height(),
        "snapshot loaded"
    );
    Ok(Some(table))
}

fn looks_semicolon_delimited(table: &Table) -> bool {
    table.headers().len() == 1 && table.headers()[0].contains(';')
}

fn read_csv(path: &Path, delimiter: u8) -> anyhow::Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(Table::new(headers, rows))
}
