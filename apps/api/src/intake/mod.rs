//! Spreadsheet intake: pulls the client name, tax year and requested documents out of
//! an uploaded workbook. Runs inside spawn_blocking; calamine parsing is CPU-bound.

pub mod spreadsheet;

use thiserror::Error;

pub use spreadsheet::{parse_workbook, SheetExtract};

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Failed to read spreadsheet: {0}")]
    Unreadable(String),

    #[error("Spreadsheet is empty")]
    Empty,

    #[error("Unable to determine client name from spreadsheet header")]
    ClientNameNotFound,

    #[error("Worksheet does not contain any item rows")]
    NoItemRows,

    #[error("No worksheet items detected in the spreadsheet")]
    NoItems,
}
