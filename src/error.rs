use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CafeteriaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Unknown report: {0}")]
    UnknownReport(String),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Database not found at {0}. Run `cafeteria init` first.")]
    NotInitialized(PathBuf),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, CafeteriaError>;
