//! # Backup Commands
//!
//! Export and import of the whole store as a ZIP of CSV files.
//!
//! Unlike every other command these never fail: the outcome, good or bad,
//! comes back as a [`BackupReport`] the backup screen shows as-is.
//!
//! ```text
//! export_backup(path) ──► BackupService::export_to_path ──┐
//!                                                         ├──► BackupReport
//! import_backup(path) ──► BackupService::import_path ─────┘    { success,
//!                                                                message,
//!                                                                tables }
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

use crate::state::DbState;
use vetpos_db::{BackupError, Table};

/// How many referential problems the message lists before summarizing.
const MAX_LISTED_PROBLEMS: usize = 10;

/// Outcome of an export or import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub success: bool,
    pub message: String,
    /// Rows written or merged per table. Empty on failure.
    pub tables: BTreeMap<Table, usize>,
}

impl BackupReport {
    fn failed(message: String) -> Self {
        BackupReport {
            success: false,
            message,
            tables: BTreeMap::new(),
        }
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().sum()
    }
}

/// Writes every non-empty table to `path`.
pub async fn export_backup(db: &DbState, path: &Path) -> BackupReport {
    info!(path = %path.display(), "export_backup command");

    match db.inner().backup().export_to_path(path).await {
        Ok(summary) => {
            let rows = summary.total_rows();
            BackupReport {
                success: true,
                message: format!(
                    "Exported {} rows from {} tables to {}",
                    rows,
                    summary.tables.len(),
                    path.display()
                ),
                tables: summary.tables,
            }
        }
        Err(e) => {
            error!(error = %e, "Export failed");
            BackupReport::failed(format!("Export failed: {}", describe(&e)))
        }
    }
}

/// Merges the archive at `path` into the store.
pub async fn import_backup(db: &DbState, path: &Path) -> BackupReport {
    info!(path = %path.display(), "import_backup command");

    match db.inner().backup().import_path(path).await {
        Ok(summary) => {
            let rows = summary.total_rows();
            BackupReport {
                success: true,
                message: format!("Imported {} rows into {} tables", rows, summary.tables.len()),
                tables: summary.tables,
            }
        }
        Err(e) => {
            error!(error = %e, "Import failed");
            BackupReport::failed(format!("Import failed: {}", describe(&e)))
        }
    }
}

/// Message text for a failure. Store internals stay in the log.
fn describe(err: &BackupError) -> String {
    match err {
        BackupError::Validation(problems) => {
            let mut text = format!("{} invalid reference(s), nothing was imported", problems.len());
            for problem in problems.iter().take(MAX_LISTED_PROBLEMS) {
                text.push_str("\n- ");
                text.push_str(problem);
            }
            if problems.len() > MAX_LISTED_PROBLEMS {
                text.push_str(&format!("\n- ... and {} more", problems.len() - MAX_LISTED_PROBLEMS));
            }
            text
        }
        BackupError::Parse { .. } => format!("{}, nothing was imported", err),
        BackupError::Db(e) if e.is_user_error() => e.to_string(),
        BackupError::Db(_) => "database operation failed".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetpos_core::{Client, Pet};
    use vetpos_db::{Database, DbConfig};

    async fn test_db() -> DbState {
        DbState::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let source = test_db().await;
        let owner = Client::new("Ana Torres");
        source.inner().clients().insert(&owner).await.unwrap();
        source
            .inner()
            .pets()
            .insert(&Pet::new("Luna", "Dog", owner.id.clone()))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.zip");

        let report = export_backup(&source, &path).await;
        assert!(report.success, "{}", report.message);
        assert_eq!(report.tables.get(&Table::Clients), Some(&1));
        assert_eq!(report.tables.get(&Table::Pets), Some(&1));
        assert_eq!(report.total_rows(), 2);

        let target = test_db().await;
        let report = import_backup(&target, &path).await;
        assert!(report.success, "{}", report.message);
        assert_eq!(report.message, "Imported 2 rows into 2 tables");
        assert_eq!(target.inner().pets().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failures_become_reports() {
        let db = test_db().await;
        let dir = tempfile::tempdir().unwrap();

        let report = import_backup(&db, &dir.path().join("missing.zip")).await;
        assert!(!report.success);
        assert!(report.message.starts_with("Import failed:"));
        assert!(report.tables.is_empty());

        let junk = dir.path().join("junk.zip");
        std::fs::write(&junk, b"definitely not a zip").unwrap();
        let report = import_backup(&db, &junk).await;
        assert!(!report.success);
        assert!(report.message.contains("Invalid backup"));

        let report = export_backup(&db, &dir.path().join("no/such/dir/out.zip")).await;
        assert!(!report.success);
    }

    #[test]
    fn test_lists_problems() {
        let problems: Vec<String> = (0..12).map(|i| format!("problem {}", i)).collect();
        let text = describe(&BackupError::Validation(problems));
        assert!(text.starts_with("12 invalid reference(s)"));
        assert!(text.contains("- problem 9"));
        assert!(!text.contains("- problem 10"));
        assert!(text.ends_with("... and 2 more"));
    }
}
