//! # Sale Commands
//!
//! Turning the cart into a sale, browsing past sales and reversing one.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Snapshot cart ──► CheckoutRequest (cart mutex released)             │
//! │  2. db.checkout().checkout(&request)   one SQLite transaction:          │
//! │        sale + items, stock down, debt up, income entry                  │
//! │  3. Success ──► clear cart, return receipt                              │
//! │     Failure ──► cart untouched, ApiError                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CartState, DbState};
use vetpos_core::{PaymentMethod, Sale, SaleItem};
use vetpos_db::SaleReceipt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: String,
    pub client_id: Option<String>,
    pub date: DateTime<Utc>,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub unpaid_cents: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl From<Sale> for SaleDto {
    fn from(s: Sale) -> Self {
        let unpaid_cents = s.unpaid().cents();
        SaleDto {
            id: s.id,
            client_id: s.client_id,
            date: s.date,
            total_cents: s.total_cents,
            amount_paid_cents: s.amount_paid_cents,
            unpaid_cents,
            payment_method: s.payment_method,
            notes: s.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemDto {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<SaleItem> for SaleItemDto {
    fn from(i: SaleItem) -> Self {
        let line_total_cents = i.line_total().cents();
        SaleItemDto {
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price_cents: i.unit_price_cents,
            line_total_cents,
        }
    }
}

/// What the counter shows after charging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDto {
    pub sale: SaleDto,
    pub items: Vec<SaleItemDto>,
    pub change_cents: i64,
    pub debt_increase_cents: i64,
}

impl From<SaleReceipt> for ReceiptDto {
    fn from(r: SaleReceipt) -> Self {
        ReceiptDto {
            sale: SaleDto::from(r.sale),
            items: r.items.into_iter().map(SaleItemDto::from).collect(),
            change_cents: r.change.cents(),
            debt_increase_cents: r.debt_increase.cents(),
        }
    }
}

/// Charges the cart. The cart is cleared only when the sale is stored.
pub async fn checkout_cart(
    db: &DbState,
    cart: &CartState,
    notes: Option<String>,
) -> Result<ReceiptDto, ApiError> {
    let request = cart.with_cart(|c| c.to_checkout_request(notes));
    debug!(
        lines = request.lines.len(),
        method = %request.payment_method,
        "checkout_cart command"
    );

    let receipt = db.inner().checkout().checkout(&request).await?;
    cart.with_cart_mut(|c| c.clear());

    info!(
        sale = %receipt.sale.id,
        total = %receipt.sale.total(),
        "Sale completed"
    );
    Ok(ReceiptDto::from(receipt))
}

/// Sales dated within the given days, both inclusive.
pub async fn list_sales(db: &DbState, from: NaiveDate, to: NaiveDate) -> Result<Vec<SaleDto>, ApiError> {
    debug!(%from, %to, "list_sales command");
    let (from, to) = if to < from { (to, from) } else { (from, to) };
    let start = from.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = (to + chrono::Duration::days(1))
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();

    let sales = db.inner().sales().between(start, end).await?;
    Ok(sales.into_iter().map(SaleDto::from).collect())
}

pub async fn sale_items(db: &DbState, sale_id: &str) -> Result<Vec<SaleItemDto>, ApiError> {
    let items = db.inner().sales().items(sale_id).await?;
    Ok(items.into_iter().map(SaleItemDto::from).collect())
}

/// Reverses a sale: stock comes back and the unpaid part leaves the
/// client's debt.
pub async fn delete_sale(db: &DbState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_sale command");
    db.inner().checkout().delete_sale(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use vetpos_core::{Client, Product};
    use vetpos_db::{Database, DbConfig};

    async fn setup() -> (DbState, CartState, Product, Client) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut kibble = Product::new("Kibble", "Food", 2000);
        kibble.stock = 5;
        db.products().insert(&kibble).await.unwrap();
        let client = Client::new("Ana Torres");
        db.clients().insert(&client).await.unwrap();
        (DbState::new(db), CartState::new(), kibble, client)
    }

    #[tokio::test]
    async fn test_checkout_clears_cart() {
        let (db, cart, kibble, client) = setup().await;
        cart.with_cart_mut(|c| {
            c.add_item(&kibble, 2)?;
            c.set_client(Some(client.id.clone()));
            c.set_payment(PaymentMethod::Cash, Some(1500))
        })
        .unwrap();

        let receipt = checkout_cart(&db, &cart, None).await.unwrap();
        assert_eq!(receipt.sale.total_cents, 4000);
        assert_eq!(receipt.debt_increase_cents, 2500);
        assert_eq!(receipt.items[0].line_total_cents, 4000);
        assert!(cart.with_cart(|c| c.is_empty()));

        let today = Utc::now().date_naive();
        let sales = list_sales(&db, today, today).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].unpaid_cents, 2500);
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() {
        let (db, cart, kibble, _) = setup().await;
        cart.with_cart_mut(|c| c.add_item(&kibble, 6)).unwrap();

        let err = checkout_cart(&db, &cart, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(cart.with_cart(|c| c.total_quantity()), 6);

        let err = checkout_cart(&db, &CartState::new(), None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_delete_sale_restores_stock() {
        let (db, cart, kibble, _) = setup().await;
        cart.with_cart_mut(|c| c.add_item(&kibble, 3)).unwrap();
        let receipt = checkout_cart(&db, &cart, None).await.unwrap();

        delete_sale(&db, &receipt.sale.id).await.unwrap();
        let stock = db.inner().products().get_by_id(&kibble.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 5);
        assert!(sale_items(&db, &receipt.sale.id).await.unwrap().is_empty());
    }
}
