use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid date range: {from} is after {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },
}

pub type Result<T> = std::result::Result<T, ReportError>;
