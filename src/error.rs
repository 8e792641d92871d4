use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while loading, merging, aggregating or serving dashboard data.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv error in {file}: {source}")]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unparseable date {value:?} in {file} at row {row}")]
    Date {
        file: PathBuf,
        row: u64,
        value: String,
    },

    #[error("invalid value {value:?} for column {column} in {file} at row {row}")]
    Value {
        file: PathBuf,
        row: u64,
        column: String,
        value: String,
    },

    #[error("{file} is missing required column {column}")]
    MissingColumn { file: PathBuf, column: String },

    #[error("no transaction files found in {0}")]
    NoTransactions(PathBuf),

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid query: {0}")]
    Query(String),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("authentication error: {0}")]
    Auth(String),
}

impl DashboardError {
    pub(crate) fn csv(file: impl Into<PathBuf>, source: csv::Error) -> Self {
        DashboardError::Csv {
            file: file.into(),
            source,
        }
    }

    /// True for errors caused by caller input rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DashboardError::InvalidRange { .. } | DashboardError::Query(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
