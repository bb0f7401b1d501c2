//! # Store Operations
//!
//! Writes that span several tables. Each one runs in a single SQLite
//! transaction and notifies only after the commit, so a failure leaves the
//! store and the screens exactly as they were.
//!
//! ```text
//! CheckoutService   checkout, delete_sale
//! AccountsService   record_payment, receive_restock, pay_supplier
//! ReportService     read-only aggregates for a date range
//! ```

pub mod accounts;
pub mod checkout;
pub mod reports;

pub use accounts::{AccountsService, RestockLine, RestockRequest};
pub use checkout::{CheckoutService, SaleReceipt};
pub use reports::{ClinicReport, ReportService};
