//! # Accounts
//!
//! Money that moves outside a sale: clients paying off their debt, stock
//! arriving from suppliers, and the clinic paying those suppliers.
//!
//! | Operation         | Rows written                 | Balances moved            | Cash book |
//! |-------------------|------------------------------|---------------------------|-----------|
//! | `record_payment`  | payment                      | client debt −amount       | income    |
//! | `receive_restock` | restock order + items        | stock +qty, supplier +total (unpaid) | expense (paid) |
//! | `pay_supplier`    | none                         | supplier balance −amount  | expense   |

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use vetpos_core::checkout::short_id;
use vetpos_core::validation::{validate_amount_cents, validate_payment_amount, validate_quantity};
use vetpos_core::{
    CoreError, Money, Payment, PaymentMethod, RestockItem, RestockOrder, Transaction,
    TransactionKind, ValidationError,
};

use crate::changes::ChangeFeed;
use crate::error::{DbError, DbResult};
use crate::repository::{client, payment, product, restock, supplier, transaction};
use crate::table::Table;

/// One product line of an incoming delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// A delivery from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockRequest {
    pub supplier_id: String,
    pub lines: Vec<RestockLine>,
    /// Paid on delivery. Otherwise the total goes on the supplier's balance.
    pub is_paid: bool,
    pub notes: Option<String>,
}

/// Client payments and supplier purchasing.
#[derive(Debug, Clone)]
pub struct AccountsService {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl AccountsService {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        AccountsService { pool, changes }
    }

    /// Records a debt payment from a client.
    ///
    /// Paying more than is owed is allowed: the debt goes negative and acts
    /// as store credit.
    pub async fn record_payment(
        &self,
        client_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        notes: Option<String>,
    ) -> DbResult<Payment> {
        validate_payment_amount(amount_cents)?;
        if method == PaymentMethod::Credit {
            return Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: vec!["cash".into(), "card".into(), "transfer".into()],
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let owner = client::get_in(&mut *tx, client_id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(client_id.to_string()))?;

        let now = vetpos_core::now();
        let payment = Payment {
            id: vetpos_core::new_id(),
            client_id: owner.id.clone(),
            date: now,
            amount_cents,
            method,
            notes,
        };
        payment::insert_in(&mut *tx, &payment).await?;
        client::adjust_debt_in(&mut *tx, &owner.id, -amount_cents).await?;

        let income = Transaction::new(
            TransactionKind::Income,
            payment.amount(),
            format!("Payment from {}", owner.name),
            Some(payment.id.clone()),
            now,
        );
        transaction::insert_in(&mut *tx, &income).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.changes
            .notify_all([Table::Payments, Table::Clients, Table::Transactions]);

        info!(client = %owner.id, amount = %payment.amount(), "Payment recorded");
        Ok(payment)
    }

    /// Books a delivery: order and items, stock up, and either an expense
    /// (paid) or a larger supplier balance (unpaid).
    ///
    /// Repeated products are merged into one line. Services carry no stock
    /// and are rejected.
    pub async fn receive_restock(&self, request: &RestockRequest) -> DbResult<RestockOrder> {
        let lines = merge_restock_lines(&request.lines)?;

        let mut tx = self.pool.begin().await?;

        let vendor = supplier::get_in(&mut *tx, &request.supplier_id)
            .await?
            .ok_or_else(|| CoreError::SupplierNotFound(request.supplier_id.clone()))?;

        let order_id = vetpos_core::new_id();
        let mut items = Vec::with_capacity(lines.len());
        let mut total = Money::zero();
        for line in &lines {
            let stocked = product::get_in(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            if stocked.is_service {
                return Err(ValidationError::InvalidFormat {
                    field: "product".to_string(),
                    reason: format!("{} is a service and carries no stock", stocked.name),
                }
                .into());
            }

            let item = RestockItem {
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
            };
            total = total.saturating_add(item.line_total());
            items.push(item);
        }

        let max = Money::from_cents(vetpos_core::MAX_AMOUNT_CENTS);
        if total > max {
            return Err(CoreError::AmountTooLarge {
                max: max.to_decimal_string(),
            }
            .into());
        }

        let now = vetpos_core::now();
        let order = RestockOrder {
            id: order_id,
            supplier_id: vendor.id.clone(),
            date: now,
            total_cents: total.cents(),
            is_paid: request.is_paid,
            notes: request.notes.clone(),
        };

        restock::insert_in(&mut *tx, &order).await?;
        for item in &items {
            restock::insert_item_in(&mut *tx, item).await?;
            product::adjust_stock_in(&mut *tx, &item.product_id, item.quantity).await?;
        }

        let money_table = if order.is_paid {
            let expense = Transaction::new(
                TransactionKind::Expense,
                total,
                format!("Restock {} from {}", short_id(&order.id), vendor.name),
                Some(order.id.clone()),
                now,
            );
            transaction::insert_in(&mut *tx, &expense).await?;
            Table::Transactions
        } else {
            supplier::adjust_balance_in(&mut *tx, &vendor.id, total.cents()).await?;
            Table::Suppliers
        };

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.changes.notify_all([
            Table::RestockOrders,
            Table::RestockItems,
            Table::Products,
            money_table,
        ]);

        info!(
            order = %order.id,
            supplier = %vendor.id,
            total = %total,
            paid = order.is_paid,
            "Restock received"
        );
        Ok(order)
    }

    /// Pays down what the clinic owes a supplier.
    pub async fn pay_supplier(
        &self,
        supplier_id: &str,
        amount_cents: i64,
        notes: Option<String>,
    ) -> DbResult<Transaction> {
        validate_payment_amount(amount_cents)?;

        let mut tx = self.pool.begin().await?;

        let vendor = supplier::get_in(&mut *tx, supplier_id)
            .await?
            .ok_or_else(|| CoreError::SupplierNotFound(supplier_id.to_string()))?;

        supplier::adjust_balance_in(&mut *tx, &vendor.id, -amount_cents).await?;

        let description = match notes {
            Some(note) if !note.trim().is_empty() => format!("Payment to {} ({})", vendor.name, note.trim()),
            _ => format!("Payment to {}", vendor.name),
        };
        let expense = Transaction::new(
            TransactionKind::Expense,
            Money::from_cents(amount_cents),
            description,
            Some(vendor.id.clone()),
            vetpos_core::now(),
        );
        transaction::insert_in(&mut *tx, &expense).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.changes.notify_all([Table::Suppliers, Table::Transactions]);

        info!(supplier = %vendor.id, amount = amount_cents, "Supplier paid");
        Ok(expense)
    }
}

/// Validates delivery lines and folds repeated products into one line.
fn merge_restock_lines(lines: &[RestockLine]) -> DbResult<Vec<RestockLine>> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "restock lines".to_string(),
        }
        .into());
    }

    let mut merged: Vec<RestockLine> = Vec::with_capacity(lines.len());
    for line in lines {
        validate_quantity(line.quantity)?;
        validate_amount_cents("unit cost", line.unit_cost_cents)?;

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line.clone()),
        }
    }
    Ok(merged)
}
