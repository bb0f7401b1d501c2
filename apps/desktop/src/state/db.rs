//! # Database State
//!
//! Wraps the `Database` handle for use in commands.
//!
//! ## Thread Safety
//! `Database` holds a `SqlitePool` and the change feed sender, both safe to
//! share. Commands run queries concurrently without extra locking.

use vetpos_db::Database;

/// Shared store handle given to commands.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let products = db_state.inner().products().search("kibble").await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
