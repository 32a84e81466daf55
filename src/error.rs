use chrono::NaiveDate;
use thiserror::Error;

use crate::schema::{ExpenseId, UnitId};

#[derive(Error, Debug)]
pub enum StayLedgerError {
    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("Invalid stay from {check_in} to {check_out}: {details}")]
    InvalidStay {
        check_in: NaiveDate,
        check_out: NaiveDate,
        details: String,
    },

    #[error("Invalid total price {0}: must be a finite, non-negative amount")]
    InvalidPrice(f64),

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Unit {unit_id} is still referenced by {stays} stays, {expenses} expenses and {prices} prices")]
    UnitInUse {
        unit_id: UnitId,
        stays: usize,
        expenses: usize,
        prices: usize,
    },

    #[error("Import is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StayLedgerError>;
