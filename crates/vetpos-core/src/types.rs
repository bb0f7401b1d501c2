//! # Domain Types
//!
//! Entities persisted by the clinic store.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Entity Relationships                            │
//! │                                                                         │
//! │   Client ◄──── Pet ◄──── Treatment ────► Product (service, optional)    │
//! │     ▲  ▲        ▲                           ▲                           │
//! │     │  │        └──── Appointment ──┐       │                           │
//! │     │  └──────────────────────────────┘     │                           │
//! │     │                                       │                           │
//! │     ├──── Sale ◄──── SaleItem ──────────────┤                           │
//! │     └──── Payment                           │                           │
//! │                                             │                           │
//! │   Supplier ◄──── RestockOrder ◄──── RestockItem                         │
//! │                                                                         │
//! │   Transaction (cash book, free-form reference)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity carries an opaque string `id` (UUID v4 text) generated on
//! the client. Line items (`SaleItem`, `RestockItem`) are identified by the
//! pair of ids they join. Identifiers never change, so a backup restored on
//! top of a live store overwrites rows instead of duplicating them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Enum Tokens
// =============================================================================

/// Implements `as_str`, `Display` and `FromStr` over a fixed token table.
///
/// The tokens are the lowercase strings stored in SQLite and written to
/// backup files, so they must never change for an existing variant.
macro_rules! token_enum {
    ($name:ident, $field:literal, { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the persisted token for this variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($token => Ok($name::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: vec![$($token.to_string()),+],
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Payment Method
// =============================================================================

/// How money changed hands.
///
/// `Credit` means "put it on the client's tab": nothing is collected at the
/// counter and the whole amount goes to the client's debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Credit,
}

token_enum!(PaymentMethod, "payment_method", {
    Cash => "cash",
    Card => "card",
    Transfer => "transfer",
    Credit => "credit",
});

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Appointment Status
// =============================================================================

/// Lifecycle of a calendar appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

token_enum!(AppointmentStatus, "status", {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// Direction of a cash-book entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

token_enum!(TransactionKind, "kind", {
    Income => "income",
    Expense => "expense",
});

// =============================================================================
// Client
// =============================================================================

/// A pet owner. Carries the running debt balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// What the client owes the clinic. Negative means credit in favour.
    pub debt_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Creates a client with a fresh id and no debt.
    pub fn new(name: impl Into<String>) -> Self {
        Client {
            id: crate::new_id(),
            name: name.into(),
            phone: None,
            email: None,
            address: None,
            debt_cents: 0,
            created_at: crate::now(),
        }
    }

    /// Returns the debt as Money.
    #[inline]
    pub fn debt(&self) -> Money {
        Money::from_cents(self.debt_cents)
    }

    /// True when the client owes anything.
    #[inline]
    pub fn has_debt(&self) -> bool {
        self.debt_cents > 0
    }
}

// =============================================================================
// Pet
// =============================================================================

/// A patient. Always belongs to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Pet {
    pub id: String,
    pub name: String,
    /// Free text: "dog", "cat", "rabbit"...
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub weight_grams: Option<i64>,
    pub owner_id: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Pet {
    /// Creates a pet owned by `owner_id`.
    pub fn new(name: impl Into<String>, species: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Pet {
            id: crate::new_id(),
            name: name.into(),
            species: species.into(),
            breed: None,
            birth_date: None,
            weight_grams: None,
            owner_id: owner_id.into(),
            notes: None,
            created_at: crate::now(),
        }
    }

    /// Age in whole years at `now`, when the birth date is known.
    pub fn age_years(&self, now: DateTime<Utc>) -> Option<i64> {
        let birth = self.birth_date?;
        if birth > now {
            return None;
        }
        Some((now - birth).num_days() / 365)
    }
}

// =============================================================================
// Product
// =============================================================================

/// Something the clinic sells: stock items (food, medicine) or services
/// (consultation, vaccination). Services never track stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock: i64,
    /// Reorder point. Stock at or below this shows up as low stock.
    pub min_stock: i64,
    pub is_service: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a stock product with zero stock.
    pub fn new(name: impl Into<String>, category: impl Into<String>, price_cents: i64) -> Self {
        Product {
            id: crate::new_id(),
            name: name.into(),
            category: category.into(),
            price_cents,
            cost_cents: 0,
            stock: 0,
            min_stock: 0,
            is_service: false,
            created_at: crate::now(),
        }
    }

    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_service || self.stock >= quantity
    }

    /// True when a stock product is at or below its reorder point.
    pub fn is_low_stock(&self) -> bool {
        !self.is_service && self.stock <= self.min_stock
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Walk-in sales have no client; they must be paid in full.
    pub client_id: Option<String>,
    pub date: DateTime<Utc>,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// The part of the total that went to the client's debt.
    pub fn unpaid(&self) -> Money {
        Money::from_cents(self.total_cents.saturating_sub(self.amount_paid_cents)).clamp_non_negative()
    }
}

/// A line item joining a sale and a product.
/// Quantity and unit price are frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleItem {
    /// Returns the line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).saturating_multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Money a client paid against their debt, outside a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub client_id: String,
    pub date: DateTime<Utc>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Treatment
// =============================================================================

/// An entry in a pet's clinical history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Treatment {
    pub id: String,
    pub pet_id: String,
    /// The service product rendered, if billed from the catalog.
    pub product_id: Option<String>,
    pub date: DateTime<Utc>,
    pub description: String,
    pub diagnosis: Option<String>,
    pub cost_cents: i64,
    /// Suggested follow-up date.
    pub next_visit: Option<DateTime<Utc>>,
}

// =============================================================================
// Appointment
// =============================================================================

/// A calendar slot for a pet and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    pub pet_id: String,
    pub date: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
}

// =============================================================================
// Supplier & Restocking
// =============================================================================

/// A vendor the clinic buys stock from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// What the clinic owes this supplier.
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    /// Creates a supplier with a fresh id and zero balance.
    pub fn new(name: impl Into<String>) -> Self {
        Supplier {
            id: crate::new_id(),
            name: name.into(),
            contact_name: None,
            phone: None,
            email: None,
            balance_cents: 0,
            created_at: crate::now(),
        }
    }
}

/// A purchase of stock from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RestockOrder {
    pub id: String,
    pub supplier_id: String,
    pub date: DateTime<Utc>,
    pub total_cents: i64,
    pub is_paid: bool,
    pub notes: Option<String>,
}

/// A line of a restock order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RestockItem {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl RestockItem {
    /// Returns the line cost (unit cost × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).saturating_multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Transaction (cash book)
// =============================================================================

/// A cash-book entry: money in or out of the till.
///
/// `reference_id` points at the sale, payment or restock order that caused
/// the movement. It is informational and not a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub description: String,
    pub reference_id: Option<String>,
}

impl Transaction {
    /// Creates an entry dated `date`.
    pub fn new(
        kind: TransactionKind,
        amount: Money,
        description: impl Into<String>,
        reference_id: Option<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Transaction {
            id: crate::new_id(),
            date,
            kind,
            amount_cents: amount.cents(),
            description: description.into(),
            reference_id,
        }
    }

    /// Signed amount: positive for income, negative for expense.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::Income => Money::from_cents(self.amount_cents),
            TransactionKind::Expense => Money::from_cents(-self.amount_cents),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
