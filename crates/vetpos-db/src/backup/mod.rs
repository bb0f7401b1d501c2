//! # Backup and Restore
//!
//! Whole-store snapshots as a ZIP of CSV files, one per non-empty table.
//!
//! ## Import Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Idle                                                                   │
//! │   │                                                                     │
//! │   ▼                                                                     │
//! │  Unpacking ──── not a ZIP / nothing recognized ──► InvalidBackup        │
//! │   │                                                                     │
//! │   ▼                                                                     │
//! │  Validating ─── dangling references ───────────► Rejected (all listed)  │
//! │   │                                                                     │
//! │   ▼                                                                     │
//! │  Merging   parse every table, then upsert parents first in ONE tx       │
//! │   │                                                                     │
//! │   ├──► Succeeded   commit, notify every merged table                    │
//! │   └──► Failed      rollback, store untouched                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Import never deletes. Rows absent from the archive stay as they are;
//! rows present overwrite the row with the same identity.
//!
//! ## Example
//! ```rust,ignore
//! let summary = db.backup().export_to_path("clinic-2026-05-04.zip").await?;
//! let merged = other_db.backup().import_path("clinic-2026-05-04.zip").await?;
//! assert_eq!(summary.total_rows(), merged.total_rows());
//! ```

pub mod archive;
pub mod codec;
pub mod error;
pub mod record;
pub mod validate;

pub use error::{BackupError, BackupResult};
pub use record::BackupRecord;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::error::DbError;
use crate::pool::Database;
use crate::table::Table;

/// Where an import is. Logged at every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Unpacking,
    Validating,
    Rejected,
    Merging,
    Succeeded,
    Failed,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImportPhase::Unpacking => "unpacking",
            ImportPhase::Validating => "validating",
            ImportPhase::Rejected => "rejected",
            ImportPhase::Merging => "merging",
            ImportPhase::Succeeded => "succeeded",
            ImportPhase::Failed => "failed",
        })
    }
}

/// Rows written per table. Tables without rows are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub tables: BTreeMap<Table, usize>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> usize {
        self.tables.values().sum()
    }
}

/// Rows merged per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub tables: BTreeMap<Table, usize>,
}

impl ImportSummary {
    pub fn total_rows(&self) -> usize {
        self.tables.values().sum()
    }
}

/// Export and import of the whole store.
#[derive(Debug, Clone)]
pub struct BackupService {
    db: Database,
}

impl BackupService {
    pub fn new(db: Database) -> Self {
        BackupService { db }
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Writes the archive to `writer`.
    ///
    /// A failure part-way leaves whatever was already written.
    pub async fn export_to_writer<W: Write + Seek>(&self, writer: W) -> BackupResult<ExportSummary> {
        let (tables, summary) = self.collect_rows().await?;
        archive::write_archive(writer, &tables)?;

        info!(
            tables = summary.tables.len(),
            rows = summary.total_rows(),
            "Backup exported"
        );
        Ok(summary)
    }

    /// Builds the archive in memory.
    pub async fn export_to_bytes(&self) -> BackupResult<(Vec<u8>, ExportSummary)> {
        let mut cursor = Cursor::new(Vec::new());
        let summary = self.export_to_writer(&mut cursor).await?;
        Ok((cursor.into_inner(), summary))
    }

    /// Writes the archive to a file, replacing it if it exists.
    pub async fn export_to_path(&self, path: impl AsRef<Path>) -> BackupResult<ExportSummary> {
        let path = path.as_ref();
        let (bytes, summary) = self.export_to_bytes().await?;
        tokio::fs::write(path, &bytes).await?;

        info!(path = %path.display(), bytes = bytes.len(), "Backup file written");
        Ok(summary)
    }

    /// Encodes every non-empty table, in declaration order.
    async fn collect_rows(&self) -> BackupResult<(Vec<(Table, Vec<Vec<String>>)>, ExportSummary)> {
        let mut tables = Vec::new();
        let mut summary = ExportSummary::default();

        for table in Table::ALL {
            let records = BackupRecord::load(&self.db, table).await?;
            if records.is_empty() {
                debug!(%table, "Empty table left out of backup");
                continue;
            }

            let rows: Vec<Vec<String>> = records.iter().map(BackupRecord::to_row).collect();
            summary.tables.insert(table, rows.len());
            tables.push((table, rows));
        }

        Ok((tables, summary))
    }

    // -------------------------------------------------------------------------
    // Import
    // -------------------------------------------------------------------------

    /// Restores an archive from any seekable reader.
    pub async fn import_from_reader<R: Read + Seek>(&self, reader: R) -> BackupResult<ImportSummary> {
        info!(phase = %ImportPhase::Unpacking, "Import started");
        let raw = archive::read_archive(reader)?;
        for name in raw.unknown_entries() {
            debug!(file = %name, "Ignoring unknown archive entry");
        }

        info!(phase = %ImportPhase::Validating, tables = raw.tables().len(), "Checking references");
        let problems = validate::check_references(&raw);
        if !problems.is_empty() {
            warn!(
                phase = %ImportPhase::Rejected,
                problems = problems.len(),
                first = %problems[0],
                "Backup rejected"
            );
            return Err(BackupError::Validation(problems));
        }

        info!(phase = %ImportPhase::Merging, "Merging archive into store");
        match self.merge(&raw).await {
            Ok(summary) => {
                info!(
                    phase = %ImportPhase::Succeeded,
                    rows = summary.total_rows(),
                    "Import finished"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(phase = %ImportPhase::Failed, error = %e, "Import failed, store unchanged");
                Err(e)
            }
        }
    }

    pub async fn import_bytes(&self, bytes: &[u8]) -> BackupResult<ImportSummary> {
        self.import_from_reader(Cursor::new(bytes)).await
    }

    pub async fn import_path(&self, path: impl AsRef<Path>) -> BackupResult<ImportSummary> {
        let path = path.as_ref();
        info!(path = %path.display(), "Reading backup file");
        let bytes = tokio::fs::read(path).await?;
        self.import_bytes(&bytes).await
    }

    /// Parses every table first, then upserts parents before children in a
    /// single transaction.
    async fn merge(&self, raw: &archive::RawArchive) -> BackupResult<ImportSummary> {
        let mut batches = Vec::new();
        for table in raw.tables() {
            if let Some(rows) = raw.table(table) {
                batches.push((table, record::parse_table(table, rows)?));
            }
        }

        let mut tx = self.db.pool().begin().await?;
        let mut summary = ImportSummary::default();

        for (table, records) in &batches {
            for record in records {
                record.upsert(&mut *tx).await?;
            }
            debug!(%table, rows = records.len(), "Table merged");
            summary.tables.insert(*table, records.len());
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.db.changes().notify_all(summary.tables.keys().copied());
        Ok(summary)
    }
}
