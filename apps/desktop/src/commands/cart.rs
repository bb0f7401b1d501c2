//! # Cart Commands
//!
//! Counter-side cart manipulation. Nothing here touches the store except
//! reading the product being added; the sale is written by
//! [`checkout_cart`](super::sale::checkout_cart).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::{Cart, CartItem, CartState, CartTotals, DbState};
use vetpos_core::PaymentMethod;

/// Cart response including items and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub client_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub totals: CartTotals,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        CartResponse {
            items: cart.items.clone(),
            client_id: cart.client_id.clone(),
            payment_method: cart.payment_method,
            totals: CartTotals::from(cart),
        }
    }
}

pub fn get_cart(cart: &CartState) -> CartResponse {
    debug!("get_cart command");
    cart.with_cart(|c| CartResponse::from(c))
}

/// Adds a product at its current price.
///
/// ## Behavior
/// - If product already in cart: quantity increases
/// - If product not in cart: added as new item
/// - Price is "frozen" at time of adding
pub async fn add_to_cart(
    db: &DbState,
    cart: &CartState,
    product_id: &str,
    quantity: Option<i64>,
) -> Result<CartResponse, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(product_id = %product_id, quantity = %quantity, "add_to_cart command");

    let product = db
        .inner()
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    // Stock is checked again at checkout; this only stops obvious mistakes.
    if !product.is_service {
        let in_cart = cart.with_cart(|c| {
            c.items
                .iter()
                .find(|i| i.product_id == product.id)
                .map_or(0, |i| i.quantity)
        });
        if !product.can_sell(in_cart + quantity) {
            return Err(ApiError::from(vetpos_core::CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: in_cart + quantity,
            }));
        }
    }

    cart.with_cart_mut(|c| {
        c.add_item(&product, quantity)?;
        Ok::<CartResponse, String>(CartResponse::from(&*c))
    })
    .map_err(ApiError::cart)
}

/// Sets a line's quantity; 0 removes it.
pub fn update_cart_item(
    cart: &CartState,
    product_id: &str,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(product_id = %product_id, quantity = %quantity, "update_cart_item command");

    cart.with_cart_mut(|c| {
        c.update_quantity(product_id, quantity)?;
        Ok::<CartResponse, String>(CartResponse::from(&*c))
    })
    .map_err(ApiError::cart)
}

pub fn remove_from_cart(cart: &CartState, product_id: &str) -> Result<CartResponse, ApiError> {
    debug!(product_id = %product_id, "remove_from_cart command");

    cart.with_cart_mut(|c| {
        c.remove_item(product_id)?;
        Ok::<CartResponse, String>(CartResponse::from(&*c))
    })
    .map_err(ApiError::cart)
}

/// Charges the sale to a client, or clears the client with `None`.
pub async fn set_cart_client(
    db: &DbState,
    cart: &CartState,
    client_id: Option<String>,
) -> Result<CartResponse, ApiError> {
    debug!(client_id = ?client_id, "set_cart_client command");

    if let Some(id) = client_id.as_deref() {
        if db.inner().clients().get_by_id(id).await?.is_none() {
            return Err(ApiError::not_found("Client", id));
        }
    }

    Ok(cart.with_cart_mut(|c| {
        c.set_client(client_id);
        CartResponse::from(&*c)
    }))
}

/// Sets how the customer pays. `amount_paid_cents: None` means the exact
/// total.
pub fn set_cart_payment(
    cart: &CartState,
    method: PaymentMethod,
    amount_paid_cents: Option<i64>,
) -> Result<CartResponse, ApiError> {
    debug!(%method, amount_paid_cents = ?amount_paid_cents, "set_cart_payment command");

    cart.with_cart_mut(|c| {
        c.set_payment(method, amount_paid_cents)?;
        Ok::<CartResponse, String>(CartResponse::from(&*c))
    })
    .map_err(|e| ApiError::new(crate::error::ErrorCode::PaymentError, e))
}

pub fn clear_cart(cart: &CartState) -> CartResponse {
    debug!("clear_cart command");

    cart.with_cart_mut(|c| {
        c.clear();
        CartResponse::from(&*c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use vetpos_core::Product;
    use vetpos_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_add_checks_stock_across_adds() {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let cart = CartState::new();
        let mut kibble = Product::new("Kibble", "Food", 2000);
        kibble.stock = 3;
        db.inner().products().insert(&kibble).await.unwrap();

        let response = add_to_cart(&db, &cart, &kibble.id, Some(2)).await.unwrap();
        assert_eq!(response.totals.total_cents, 4000);

        let err = add_to_cart(&db, &cart, &kibble.id, Some(2)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = add_to_cart(&db, &cart, "missing", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let response = update_cart_item(&cart, &kibble.id, 0).unwrap();
        assert!(response.items.is_empty());
        assert_eq!(remove_from_cart(&cart, &kibble.id).unwrap_err().code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_client_and_payment() {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let cart = CartState::new();

        let err = set_cart_client(&db, &cart, Some("ghost".to_string())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let response = set_cart_payment(&cart, PaymentMethod::Credit, None).unwrap();
        assert_eq!(response.payment_method, PaymentMethod::Credit);

        let err = set_cart_payment(&cart, PaymentMethod::Cash, Some(-10)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        assert_eq!(clear_cart(&cart).payment_method, PaymentMethod::Cash);
    }
}
