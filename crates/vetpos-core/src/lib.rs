//! # vetpos-core: Clinic Domain Model and Business Rules
//!
//! Entities, money arithmetic and every rule that can be decided without
//! touching the store. Nothing in here performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VetPOS Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  vetpos-desktop (app shell)                     │   │
//! │  │   config • cart • per-screen reducers • live queries • commands │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vetpos-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────┐ │   │
//! │  │   │  types   │ │  money   │ │ checkout │ │  report  │ │ valid│ │   │
//! │  │   │ Client   │ │  Money   │ │  Plan    │ │ Summary  │ │ rules│ │   │
//! │  │   │ Pet ...  │ │          │ │          │ │ CashFlow │ │      │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘ └──────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO FILES                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           vetpos-db (SQLite, repositories, backup)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Client, Pet, Product, Sale, ...)
//! - [`money`] - Integer-cent money type
//! - [`checkout`] - Cart → sale plan (totals, stock deltas, debt)
//! - [`report`] - Aggregates over loaded rows
//! - [`validation`] - Field rules for user input
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use vetpos_core::{Money, Product};
//!
//! let mut kibble = Product::new("Kibble 2kg", "food", 1500);
//! kibble.stock = 4;
//!
//! assert!(kibble.can_sell(4));
//! assert_eq!(kibble.price() * 3, Money::from_cents(4500));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use checkout::{CheckoutLine, CheckoutPlan, CheckoutRequest};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typos at the counter (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest amount, in cents, a single price, payment or sale may carry.
///
/// Keeps every line total and cart total well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Reorder point used when the clinic has not configured one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Generates a fresh entity identifier (UUID v4 text).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time truncated to milliseconds, the precision backups keep.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    use chrono::SubsecRound;
    chrono::Utc::now().trunc_subsecs(3)
}
