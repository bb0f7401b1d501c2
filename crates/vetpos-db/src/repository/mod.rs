//! # Repository Module
//!
//! One repository per table. Repositories own the SQL; store operations and
//! the backup service compose them inside transactions.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command                                                                │
//! │       │  db.clients().search("ana")                                     │
//! │       ▼                                                                 │
//! │  ClientRepository                                                       │
//! │  ├── list_all / get_by_id / count           (reads on the pool)         │
//! │  ├── insert / update / delete / upsert      (writes + StoreChange)      │
//! │  └── *_in(executor, ..)                     (same SQL, caller's tx)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_in` functions take any sqlx executor, so the same statement runs on
//! the pool or on `&mut *tx`. They never notify; whoever commits does.
//!
//! ## Available Repositories
//!
//! - [`ClientRepository`] - Clients, search, debt
//! - [`PetRepository`] - Pets by owner
//! - [`ProductRepository`] - Catalog, search, stock
//! - [`SaleRepository`] - Sales and their line items
//! - [`PaymentRepository`] - Debt payments
//! - [`TreatmentRepository`] - Clinical history
//! - [`AppointmentRepository`] - Calendar
//! - [`SupplierRepository`] - Suppliers and balances
//! - [`RestockRepository`] - Restock orders and their line items
//! - [`TransactionRepository`] - Cash book

pub mod appointment;
pub mod client;
pub mod payment;
pub mod pet;
pub mod product;
pub mod restock;
pub mod sale;
pub mod supplier;
pub mod transaction;
pub mod treatment;

pub use appointment::AppointmentRepository;
pub use client::ClientRepository;
pub use payment::PaymentRepository;
pub use pet::PetRepository;
pub use product::ProductRepository;
pub use restock::RestockRepository;
pub use sale::SaleRepository;
pub use supplier::SupplierRepository;
pub use transaction::TransactionRepository;
pub use treatment::TreatmentRepository;

use sqlx::sqlite::{SqliteArguments, SqliteQueryResult};
use sqlx::Sqlite;

use crate::error::{DbError, DbResult};

/// An unexecuted statement with its arguments.
pub(crate) type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Builds a `LIKE` pattern matching `term` anywhere, with wildcards escaped.
/// Use together with `ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Optional text as stored: blank means NULL, so a value written to a
/// backup reads back unchanged.
pub(crate) fn opt_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Turns "no row touched" into NotFound.
pub(crate) fn expect_row(result: SqliteQueryResult, entity: &str, id: &str) -> DbResult<()> {
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(entity, id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_blank_optional_text_is_null() {
        assert_eq!(opt_text(&None), None);
        assert_eq!(opt_text(&Some(String::new())), None);
        assert_eq!(opt_text(&Some("  ".to_string())), None);
        assert_eq!(opt_text(&Some(" Golden ".to_string())), Some(" Golden "));
    }
}
