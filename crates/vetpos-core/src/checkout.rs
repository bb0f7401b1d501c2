//! # Checkout
//!
//! Turns a cart into everything a sale writes, without touching the store.
//!
//! ## What One Checkout Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutRequest (cart lines, client?, method, amount paid)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutPlan::build()  ← THIS MODULE (pure)                            │
//! │       │                                                                 │
//! │       ├── Sale          total, amount actually kept, method             │
//! │       ├── SaleItem × N  one per product, price frozen                   │
//! │       ├── stock deltas  -qty for every non-service product              │
//! │       ├── debt delta    +unpaid remainder on the client                 │
//! │       └── Transaction   income for the amount kept (if any)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  vetpos-db applies the plan in ONE database transaction                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Rules
//! - `Credit` collects nothing: the whole total goes on the client's tab.
//! - Paying more than the total gives change; only the total is kept.
//! - Any unpaid remainder requires a client to charge it to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Product, Sale, SaleItem, Transaction, TransactionKind};
use crate::validation::{validate_amount_cents, validate_quantity};
use crate::{MAX_AMOUNT_CENTS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A cart line handed to checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
    /// Price frozen when the line was added to the cart.
    pub unit_price_cents: i64,
}

/// Everything the counter knows when the sale is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub client_id: Option<String>,
    pub lines: Vec<CheckoutLine>,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    pub notes: Option<String>,
}

/// The rows and adjustments a checkout produces.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// (product_id, delta) for every stock product sold. Deltas are negative.
    pub stock_deltas: Vec<(String, i64)>,
    /// Added to the client's debt. Zero for fully paid sales.
    pub debt_increase: Money,
    /// Change handed back at the counter.
    pub change: Money,
    /// Cash-book entry for the amount kept, if any.
    pub income: Option<Transaction>,
}

impl CheckoutPlan {
    /// Builds the plan against the current product rows.
    ///
    /// `products` must contain every product referenced by the request;
    /// missing ones fail with [`CoreError::ProductNotFound`].
    pub fn build(
        request: &CheckoutRequest,
        products: &HashMap<String, Product>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if request.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let lines = merge_lines(&request.lines)?;
        if lines.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        validate_amount_cents("amount paid", request.amount_paid_cents)?;

        let sale_id = crate::new_id();
        let mut items = Vec::with_capacity(lines.len());
        let mut stock_deltas = Vec::new();
        let mut total = Money::zero();

        for line in &lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if !product.can_sell(line.quantity) {
                return Err(CoreError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock,
                    requested: line.quantity,
                });
            }

            validate_amount_cents("unit price", line.unit_price_cents)?;

            let item = SaleItem {
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
            };
            total = total.saturating_add(item.line_total());
            items.push(item);

            if !product.is_service {
                stock_deltas.push((product.id.clone(), -line.quantity));
            }
        }

        let max = Money::from_cents(MAX_AMOUNT_CENTS);
        if total > max {
            return Err(CoreError::AmountTooLarge {
                max: max.to_decimal_string(),
            });
        }

        let tendered = match request.payment_method {
            PaymentMethod::Credit => Money::zero(),
            _ => Money::from_cents(request.amount_paid_cents),
        };
        let kept = if tendered > total { total } else { tendered };
        let change = (tendered - total).clamp_non_negative();
        let unpaid = total - kept;

        let client_id = request
            .client_id
            .as_ref()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        if unpaid.is_positive() && client_id.is_none() {
            return Err(CoreError::DebtWithoutClient {
                unpaid: unpaid.to_decimal_string(),
            });
        }

        let sale = Sale {
            id: sale_id.clone(),
            client_id,
            date: now,
            total_cents: total.cents(),
            amount_paid_cents: kept.cents(),
            payment_method: request.payment_method,
            notes: request.notes.clone(),
        };

        let income = kept.is_positive().then(|| {
            Transaction::new(
                TransactionKind::Income,
                kept,
                format!("Sale {}", short_id(&sale_id)),
                Some(sale_id.clone()),
                now,
            )
        });

        Ok(CheckoutPlan {
            sale,
            items,
            stock_deltas,
            debt_increase: unpaid,
            change,
            income,
        })
    }
}

/// Collapses repeated products into one line, keeping the first price seen.
fn merge_lines(lines: &[CheckoutLine]) -> CoreResult<Vec<CheckoutLine>> {
    let mut merged: Vec<CheckoutLine> = Vec::with_capacity(lines.len());

    for line in lines {
        if line.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: line.quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        validate_quantity(line.quantity)?;

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity += line.quantity;
                if existing.quantity > MAX_ITEM_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: existing.quantity,
                        max: MAX_ITEM_QUANTITY,
                    });
                }
            }
            None => merged.push(line.clone()),
        }
    }

    Ok(merged)
}

/// First 8 characters of an id, for human-readable descriptions.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn catalog() -> HashMap<String, Product> {
        let mut food = Product::new("Kibble", "food", 1500);
        food.id = "food".into();
        food.stock = 10;

        let mut consult = Product::new("Consultation", "services", 2500);
        consult.id = "consult".into();
        consult.is_service = true;

        [food, consult].into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    fn line(product_id: &str, quantity: i64, price: i64) -> CheckoutLine {
        CheckoutLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: price,
        }
    }

    fn request(lines: Vec<CheckoutLine>, method: PaymentMethod, paid: i64, client: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            client_id: client.map(String::from),
            lines,
            payment_method: method,
            amount_paid_cents: paid,
            notes: None,
        }
    }

    #[test]
    fn test_fully_paid_sale() {
        let req = request(
            vec![line("food", 2, 1500), line("consult", 1, 2500)],
            PaymentMethod::Cash,
            6000,
            None,
        );
        let plan = CheckoutPlan::build(&req, &catalog(), Utc::now()).unwrap();

        assert_eq!(plan.sale.total_cents, 5500);
        assert_eq!(plan.sale.amount_paid_cents, 5500);
        assert_eq!(plan.change.cents(), 500);
        assert!(plan.debt_increase.is_zero());
        assert_eq!(plan.stock_deltas, vec![("food".to_string(), -2)]);
        assert_eq!(plan.items.len(), 2);
        assert!(plan.items.iter().all(|i| i.sale_id == plan.sale.id));

        let income = plan.income.unwrap();
        assert_eq!(income.amount_cents, 5500);
        assert_eq!(income.reference_id.as_deref(), Some(plan.sale.id.as_str()));
    }

    #[test]
    fn test_partial_payment_goes_to_debt() {
        let req = request(vec![line("food", 2, 1500)], PaymentMethod::Card, 1000, Some("c1"));
        let plan = CheckoutPlan::build(&req, &catalog(), Utc::now()).unwrap();

        assert_eq!(plan.debt_increase.cents(), 2000);
        assert_eq!(plan.sale.amount_paid_cents, 1000);
        assert_eq!(plan.sale.client_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_credit_collects_nothing() {
        let req = request(vec![line("consult", 1, 2500)], PaymentMethod::Credit, 2500, Some("c1"));
        let plan = CheckoutPlan::build(&req, &catalog(), Utc::now()).unwrap();

        assert_eq!(plan.sale.amount_paid_cents, 0);
        assert_eq!(plan.debt_increase.cents(), 2500);
        assert!(plan.income.is_none());
    }

    #[test]
    fn test_unpaid_without_client_is_rejected() {
        let req = request(vec![line("consult", 1, 2500)], PaymentMethod::Cash, 0, Some("  "));
        let err = CheckoutPlan::build(&req, &catalog(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DebtWithoutClient { .. }));
    }

    #[test]
    fn test_insufficient_stock() {
        let req = request(vec![line("food", 11, 1500)], PaymentMethod::Cash, 99999, None);
        let err = CheckoutPlan::build(&req, &catalog(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            }
        ));
    }

    #[test]
    fn test_repeated_lines_are_merged() {
        let req = request(
            vec![line("food", 4, 1500), line("food", 3, 1400)],
            PaymentMethod::Cash,
            10500,
            None,
        );
        let plan = CheckoutPlan::build(&req, &catalog(), Utc::now()).unwrap();
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].quantity, 7);
        assert_eq!(plan.items[0].unit_price_cents, 1500);
        assert_eq!(plan.stock_deltas, vec![("food".to_string(), -7)]);
    }

    #[test]
    fn test_rejects_empty_unknown_and_bad_quantities() {
        let cat = catalog();
        let now = Utc::now();

        let empty = request(vec![], PaymentMethod::Cash, 0, None);
        assert!(matches!(CheckoutPlan::build(&empty, &cat, now), Err(CoreError::EmptyCart)));

        let unknown = request(vec![line("nope", 1, 100)], PaymentMethod::Cash, 100, None);
        assert!(matches!(
            CheckoutPlan::build(&unknown, &cat, now),
            Err(CoreError::ProductNotFound(_))
        ));

        let zero = request(vec![line("consult", 0, 100)], PaymentMethod::Cash, 0, None);
        assert!(matches!(CheckoutPlan::build(&zero, &cat, now), Err(CoreError::Validation(_))));

        let huge = request(vec![line("consult", 1000, 100)], PaymentMethod::Cash, 0, None);
        assert!(matches!(
            CheckoutPlan::build(&huge, &cat, now),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_amounts_above_the_ceiling_are_rejected() {
        let mut cat = catalog();
        let now = Utc::now();

        let mut gold = Product::new("Gold collar", "accessories", i64::MAX / 2);
        gold.id = "gold".into();
        gold.stock = 10;
        cat.insert(gold.id.clone(), gold);

        let overpriced = request(vec![line("gold", 3, i64::MAX / 2)], PaymentMethod::Cash, 0, Some("c1"));
        assert!(matches!(
            CheckoutPlan::build(&overpriced, &cat, now),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let too_big = request(vec![line("gold", 2, MAX_AMOUNT_CENTS)], PaymentMethod::Credit, 0, Some("c1"));
        assert!(matches!(
            CheckoutPlan::build(&too_big, &cat, now),
            Err(CoreError::AmountTooLarge { .. })
        ));

        let at_limit = request(vec![line("gold", 1, MAX_AMOUNT_CENTS)], PaymentMethod::Credit, 0, Some("c1"));
        let plan = CheckoutPlan::build(&at_limit, &cat, now).unwrap();
        assert_eq!(plan.sale.total_cents, MAX_AMOUNT_CENTS);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("550e8400-e29b"), "550e8400");
        assert_eq!(short_id("abc"), "abc");
    }
}
