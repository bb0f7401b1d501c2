//! # Validation Module
//!
//! Input validation for user actions, run before anything reaches the store.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Commands (vetpos-desktop)                                     │
//! │  └── THIS MODULE: field rules (required, length, ranges)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Store operations (vetpos-db)                                  │
//! │  └── Cross-row rules: stock available, client exists                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL constraints                                               │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backup import does NOT run these rules: a restored archive is trusted to
//! carry whatever the store held when it was exported.

use crate::error::ValidationError;
use crate::types::{Client, Pet, Product, Supplier};
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (client, pet, product, supplier).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use vetpos_core::validation::validate_name;
///
/// assert!(validate_name("name", "Firulais").is_ok());
/// assert!(validate_name("name", "  ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an optional email address.
///
/// Only the shape `local@domain.tld` is checked.
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional phone number: digits plus `+ - ( ) space`.
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<()> {
    let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(());
    };

    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();

    if !allowed || digits < 6 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain at least 6 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount in cents (prices, costs, amount paid).
///
/// Amounts above [`MAX_AMOUNT_CENTS`] are rejected.
///
/// ## Example
/// ```rust
/// use vetpos_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("price", 0).is_ok());
/// assert!(validate_amount_cents("price", -1).is_err());
/// assert!(validate_amount_cents("price", i64::MAX / 2).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents. Zero payments are rejected.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    validate_amount_cents("payment amount", cents)
}

/// Validates a stock level or reorder point.
pub fn validate_stock(field: &str, units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use vetpos_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a client before insert/update.
pub fn validate_client(client: &Client) -> ValidationResult<()> {
    validate_name("name", &client.name)?;
    validate_phone(client.phone.as_deref())?;
    validate_email(client.email.as_deref())?;
    Ok(())
}

/// Validates a pet before insert/update.
pub fn validate_pet(pet: &Pet) -> ValidationResult<()> {
    validate_name("name", &pet.name)?;
    validate_name("species", &pet.species)?;
    if pet.owner_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "owner".to_string(),
        });
    }
    if let Some(weight) = pet.weight_grams {
        validate_stock("weight", weight)?;
    }
    Ok(())
}

/// Validates a product before insert/update.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    validate_name("category", &product.category)?;
    validate_amount_cents("price", product.price_cents)?;
    validate_amount_cents("cost", product.cost_cents)?;
    if !product.is_service {
        validate_stock("stock", product.stock)?;
        validate_stock("min_stock", product.min_stock)?;
    }
    Ok(())
}

/// Validates a supplier before insert/update.
pub fn validate_supplier(supplier: &Supplier) -> ValidationResult<()> {
    validate_name("name", &supplier.name)?;
    validate_phone(supplier.phone.as_deref())?;
    validate_email(supplier.email.as_deref())?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
