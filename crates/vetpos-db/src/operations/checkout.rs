//! # Checkout
//!
//! Applies a [`CheckoutPlan`] to the store.
//!
//! ## Transaction Flow
//! ```text
//! BEGIN
//!   read every product on the cart        (inside the tx: fresh stock)
//!   check the client exists               (when one is given)
//!   CheckoutPlan::build                   (pure, vetpos-core)
//!   INSERT sale + items
//!   UPDATE products.stock  -qty           (guarded: never below zero)
//!   UPDATE clients.debt    +unpaid
//!   INSERT transactions    income
//! COMMIT ──► notify sales, sale_items, products, clients, transactions
//! ```
//! Any error drops the transaction, which rolls it back.

use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use vetpos_core::{CheckoutPlan, CheckoutRequest, CoreError, Money, Product, Sale, SaleItem};

use crate::changes::ChangeFeed;
use crate::error::{DbError, DbResult};
use crate::repository::{client, product, sale, transaction};
use crate::table::Table;

/// What the counter shows after a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub change: Money,
    pub debt_increase: Money,
}

/// Cart checkout and sale reversal.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        CheckoutService { pool, changes }
    }

    /// Records a sale with all of its effects, or nothing at all.
    ///
    /// ## Errors
    /// - `Core(EmptyCart | QuantityTooLarge | InsufficientStock | DebtWithoutClient ...)`
    /// - `Core(ProductNotFound | ClientNotFound)` for unknown ids
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<SaleReceipt> {
        debug!(lines = request.lines.len(), method = %request.payment_method, "Starting checkout");

        let mut tx = self.pool.begin().await?;

        let mut products: HashMap<String, Product> = HashMap::new();
        for line in &request.lines {
            if products.contains_key(&line.product_id) {
                continue;
            }
            if let Some(found) = product::get_in(&mut *tx, &line.product_id).await? {
                products.insert(found.id.clone(), found);
            }
        }

        let plan = CheckoutPlan::build(request, &products, vetpos_core::now())?;

        if let Some(client_id) = &plan.sale.client_id {
            if client::get_in(&mut *tx, client_id).await?.is_none() {
                return Err(CoreError::ClientNotFound(client_id.clone()).into());
            }
        }

        sale::insert_in(&mut *tx, &plan.sale).await?;
        for item in &plan.items {
            sale::insert_item_in(&mut *tx, item).await?;
        }

        for (product_id, delta) in &plan.stock_deltas {
            if !product::adjust_stock_in(&mut *tx, product_id, *delta).await? {
                // Stock moved between the read and the update.
                let current = product::get_in(&mut *tx, product_id).await?;
                warn!(product = %product_id, "Stock changed during checkout");
                return Err(match current {
                    Some(p) => CoreError::InsufficientStock {
                        product: p.name,
                        available: p.stock,
                        requested: -delta,
                    },
                    None => CoreError::ProductNotFound(product_id.clone()),
                }
                .into());
            }
        }

        if plan.debt_increase.is_positive() {
            if let Some(client_id) = &plan.sale.client_id {
                client::adjust_debt_in(&mut *tx, client_id, plan.debt_increase.cents()).await?;
            }
        }

        if let Some(income) = &plan.income {
            transaction::insert_in(&mut *tx, income).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut touched = vec![Table::Sales, Table::SaleItems];
        if !plan.stock_deltas.is_empty() {
            touched.push(Table::Products);
        }
        if plan.debt_increase.is_positive() {
            touched.push(Table::Clients);
        }
        if plan.income.is_some() {
            touched.push(Table::Transactions);
        }
        self.changes.notify_all(touched);

        info!(
            sale = %plan.sale.id,
            total = %plan.sale.total(),
            debt = %plan.debt_increase,
            "Sale completed"
        );

        Ok(SaleReceipt {
            sale: plan.sale,
            items: plan.items,
            change: plan.change,
            debt_increase: plan.debt_increase,
        })
    }

    /// Deletes a sale and reverses its stock and debt effects.
    ///
    /// Stock comes back for every stock product still in the catalog. The
    /// client's debt drops by what the sale left unpaid. Cash-book entries
    /// stay: they record money that actually moved.
    pub async fn delete_sale(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sale::get_in(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;
        let items = sale::items_in(&mut *tx, id).await?;

        let mut restored = 0;
        for item in &items {
            // Services and products deleted since are no-ops.
            if product::adjust_stock_in(&mut *tx, &item.product_id, item.quantity).await? {
                restored += 1;
            }
        }

        let unpaid = existing.unpaid();
        let mut debt_reduced = false;
        if let Some(client_id) = &existing.client_id {
            if unpaid.is_positive() {
                client::adjust_debt_in(&mut *tx, client_id, -unpaid.cents()).await?;
                debt_reduced = true;
            }
        }

        sale::delete_in(&mut *tx, id).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut touched = vec![Table::Sales, Table::SaleItems];
        if restored > 0 {
            touched.push(Table::Products);
        }
        if debt_reduced {
            touched.push(Table::Clients);
        }
        self.changes.notify_all(touched);

        info!(sale = %id, restored_lines = restored, "Sale deleted");
        Ok(())
    }
}
