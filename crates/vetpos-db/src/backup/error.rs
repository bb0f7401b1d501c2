//! # Backup Error Types
//!
//! ## Where Each Error Stops the Import
//! ```text
//! bytes ──► unpack ──────► validate ────────► parse ──────► merge (1 tx)
//!            │               │                  │              │
//!            ▼               ▼                  ▼              ▼
//!     InvalidBackup     Validation(all)   Parse{table,row}    Db
//!     Archive / Csv     nothing merged    nothing merged      rolled back
//! ```
//! Export only fails with `Io`, `Archive`, `Csv` or `Db`.

use thiserror::Error;

use crate::error::DbError;
use crate::table::Table;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Not a ZIP, or a ZIP without a single recognized table.
    #[error("Invalid backup: {0}")]
    InvalidBackup(String),

    /// Every referential problem found in the archive.
    #[error("Backup rejected: {} referential problem(s)", .0.len())]
    Validation(Vec<String>),

    /// A field that doesn't parse as its column's type. `row` counts data
    /// rows from 1.
    #[error("{} row {row}: invalid {column} '{value}': {reason}", .table.file_name())]
    Parse {
        table: Table,
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for BackupError {
    fn from(err: sqlx::Error) -> Self {
        BackupError::Db(DbError::from(err))
    }
}

/// Convenience type alias for backup results.
pub type BackupResult<T> = Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_file_row_and_column() {
        let err = BackupError::Parse {
            table: Table::Products,
            row: 3,
            column: "price".into(),
            value: "abc".into(),
            reason: "not a number".into(),
        };
        assert_eq!(err.to_string(), "products.csv row 3: invalid price 'abc': not a number");
    }

    #[test]
    fn test_validation_summary() {
        let err = BackupError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Backup rejected: 2 referential problem(s)");
    }
}
