//! # vetpos-db: Database Layer for VetPOS
//!
//! This crate provides store access for the VetPOS clinic system.
//! It uses SQLite for local storage with sqlx for async operations, and owns
//! the ZIP/CSV backup format.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VetPOS Data Flow                                │
//! │                                                                         │
//! │  App command (checkout, import_backup, ...)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    vetpos-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │  ┌────────────┐  ┌──────────────┐  ┌────────────┐  ┌─────────┐ │   │
//! │  │  │  Database  │  │ Repositories │  │ Operations │  │ Backup  │ │   │
//! │  │  │  (pool.rs) │◄─│ one per table│◄─│ checkout   │  │ ZIP/CSV │ │   │
//! │  │  │            │  │              │  │ accounts   │  │ export  │ │   │
//! │  │  │ SqlitePool │  │  *_in(tx)    │  │ reports    │  │ import  │ │   │
//! │  │  └─────┬──────┘  └──────────────┘  └────────────┘  └─────────┘ │   │
//! │  │        │                                                        │   │
//! │  │        └──► ChangeFeed ──► StoreChange { table } after commit   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/vetpos/vetpos.db (per platform data dir)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`table`] - The closed set of tables and their relationships
//! - [`changes`] - Post-commit change notifications
//! - [`repository`] - One repository per table
//! - [`operations`] - Multi-table writes (checkout, payments, restock) and reports
//! - [`backup`] - Whole-store export and merge-import
//! - [`seed`] - Demo data
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vetpos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/vetpos.db")).await?;
//!
//! let owners = db.clients().search("ana").await?;
//! let receipt = db.checkout().checkout(&request).await?;
//! db.backup().export_to_path("backup.zip").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backup;
pub mod changes;
pub mod error;
pub mod migrations;
pub mod operations;
pub mod pool;
pub mod repository;
pub mod seed;
pub mod table;

// =============================================================================
// Re-exports
// =============================================================================

pub use changes::{ChangeFeed, StoreChange};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use table::{ForeignKey, Table};

// Repository re-exports for convenience
pub use repository::{
    AppointmentRepository, ClientRepository, PaymentRepository, PetRepository, ProductRepository,
    RestockRepository, SaleRepository, SupplierRepository, TransactionRepository,
    TreatmentRepository,
};

pub use backup::{BackupError, BackupResult, BackupService, ExportSummary, ImportSummary};
pub use operations::{
    AccountsService, CheckoutService, ClinicReport, ReportService, RestockLine, RestockRequest,
    SaleReceipt,
};
pub use seed::{seed_demo, SeedSummary};
