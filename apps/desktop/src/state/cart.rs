//! # Cart State
//!
//! The counter's current sale, held in memory until checkout.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  Counter Action           Command                 Cart State Change     │
//! │  ──────────────           ───────                 ─────────────────     │
//! │                                                                         │
//! │  Pick Product ───────────► add_to_cart() ───────► items.push(item)     │
//! │  Change Quantity ────────► update_cart_item() ──► items[i].qty = n     │
//! │  Click Remove ───────────► remove_from_cart() ──► items.remove(i)      │
//! │  Choose Client ──────────► set_cart_client() ───► client_id = Some(..) │
//! │  Enter Payment ──────────► set_cart_payment() ──► method, amount paid  │
//! │  Charge ─────────────────► checkout_cart() ─────► CheckoutRequest,     │
//! │                                                   then clear()         │
//! │                                                                         │
//! │  NOTE: All write operations acquire the Mutex lock exclusively.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vetpos_core::{
    validation::validate_quantity, CheckoutLine, CheckoutRequest, Money, PaymentMethod, Product,
    MAX_CART_ITEMS, MAX_ITEM_QUANTITY,
};

/// A line in the cart.
///
/// Name and price are frozen when the product is added, so a price edit
/// in inventory does not change a sale in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,

    /// Product name at time of adding (frozen)
    pub name: String,

    /// Price in cents at time of adding (frozen)
    pub unit_price_cents: i64,

    /// Services never touch stock
    pub is_service: bool,

    pub quantity: i64,

    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            is_service: product.is_service,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Calculates the line total (unit price × quantity).
    pub fn line_total_cents(&self) -> i64 {
        Money::from_cents(self.unit_price_cents)
            .multiply_quantity(self.quantity)
            .cents()
    }
}

/// The sale being assembled at the counter.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding same product increases quantity)
/// - Quantity is between 1 and `MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,

    /// Client the sale is charged to, required when anything is left unpaid
    pub client_id: Option<String>,

    pub payment_method: PaymentMethod,

    /// Cash handed over. `None` means the exact total.
    pub amount_paid_cents: Option<i64>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            client_id: None,
            payment_method: PaymentMethod::default(),
            amount_paid_cents: None,
            created_at: Utc::now(),
        }
    }

    /// Adds a product to the cart or increases quantity if already present.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> Result<(), String> {
        validate_quantity(quantity).map_err(|e| e.to_string())?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(format!(
                    "Quantity would exceed maximum of {}",
                    MAX_ITEM_QUANTITY
                ));
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(format!(
                "Cart cannot have more than {} items",
                MAX_CART_ITEMS
            ));
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> Result<(), String> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }

        validate_quantity(quantity).map_err(|e| e.to_string())?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(format!("Product {} not in cart", product_id)),
        }
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), String> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(format!("Product {} not in cart", product_id))
        } else {
            Ok(())
        }
    }

    pub fn set_client(&mut self, client_id: Option<String>) {
        self.client_id = client_id.filter(|id| !id.trim().is_empty());
    }

    pub fn set_payment(&mut self, method: PaymentMethod, amount_paid_cents: Option<i64>) -> Result<(), String> {
        if let Some(cents) = amount_paid_cents {
            if cents < 0 {
                return Err("Amount paid cannot be negative".to_string());
            }
        }
        self.payment_method = method;
        self.amount_paid_cents = amount_paid_cents;
        Ok(())
    }

    /// Empties the cart and resets client and payment.
    pub fn clear(&mut self) {
        *self = Cart::new();
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn total_cents(&self) -> i64 {
        self.items.iter().map(|i| i.line_total_cents()).sum()
    }

    /// What the customer hands over: nothing on credit, else the entered
    /// amount or the exact total.
    pub fn tendered_cents(&self) -> i64 {
        match self.payment_method {
            PaymentMethod::Credit => 0,
            _ => self.amount_paid_cents.unwrap_or_else(|| self.total_cents()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Builds the request the checkout operation consumes.
    pub fn to_checkout_request(&self, notes: Option<String>) -> CheckoutRequest {
        CheckoutRequest {
            client_id: self.client_id.clone(),
            lines: self
                .items
                .iter()
                .map(|i| CheckoutLine {
                    product_id: i.product_id.clone(),
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents,
                })
                .collect(),
            payment_method: self.payment_method,
            amount_paid_cents: self.tendered_cents(),
            notes,
        }
    }
}

/// Cart totals summary for responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_cents: i64,
    pub tendered_cents: i64,
    pub change_cents: i64,
    /// Goes on the client's debt at checkout
    pub unpaid_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        let total = cart.total_cents();
        let tendered = cart.tendered_cents();
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            total_cents: total,
            tendered_cents: tendered,
            change_cents: (tendered - total).max(0),
            unpaid_cents: (total - tendered).max(0),
        }
    }
}

/// Shared cart state.
///
/// ## Thread Safety
/// Uses `Arc<Mutex<Cart>>` because:
/// - `Arc`: Allows shared ownership across threads
/// - `Mutex`: Ensures only one thread modifies the cart at a time
#[derive(Debug, Clone)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::new())),
        }
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(|cart| CartTotals::from(cart));
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&mut cart)
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price_cents: i64) -> Product {
        let mut p = Product::new(format!("Product {}", id), "Food", price_cents);
        p.id = id.to_string();
        p.stock = 50;
        p
    }

    #[test]
    fn test_cart_add_item() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 999), 2).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.total_cents(), 1998);
    }

    #[test]
    fn test_cart_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let p = product("1", 999);

        cart.add_item(&p, 2).unwrap();
        cart.add_item(&p, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_price_is_frozen() {
        let mut cart = Cart::new();
        let mut p = product("1", 1000);
        cart.add_item(&p, 1).unwrap();

        p.price_cents = 5000;
        cart.add_item(&p, 1).unwrap();

        assert_eq!(cart.items[0].unit_price_cents, 1000);
        assert_eq!(cart.total_cents(), 2000);
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new();
        let p = product("1", 100);

        assert!(cart.add_item(&p, 0).is_err());
        assert!(cart.add_item(&p, MAX_ITEM_QUANTITY + 1).is_err());

        cart.add_item(&p, MAX_ITEM_QUANTITY).unwrap();
        assert!(cart.add_item(&p, 1).is_err());
        assert_eq!(cart.total_quantity(), MAX_ITEM_QUANTITY);

        cart.update_quantity("1", 0).unwrap();
        assert!(cart.is_empty());
        assert!(cart.update_quantity("1", 3).is_err());
    }

    #[test]
    fn test_line_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&product(&i.to_string(), 100), 1).unwrap();
        }
        let err = cart.add_item(&product("extra", 100), 1).unwrap_err();
        assert!(err.contains("100"));
    }

    #[test]
    fn test_totals_and_request() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 1250), 2).unwrap();

        let totals = CartTotals::from(&cart);
        assert_eq!(totals.total_cents, 2500);
        assert_eq!(totals.tendered_cents, 2500);
        assert_eq!(totals.unpaid_cents, 0);

        cart.set_payment(PaymentMethod::Cash, Some(3000)).unwrap();
        assert_eq!(CartTotals::from(&cart).change_cents, 500);

        cart.set_client(Some("c1".to_string()));
        cart.set_payment(PaymentMethod::Credit, Some(3000)).unwrap();
        let totals = CartTotals::from(&cart);
        assert_eq!(totals.tendered_cents, 0);
        assert_eq!(totals.unpaid_cents, 2500);

        let request = cart.to_checkout_request(Some("visit".to_string()));
        assert_eq!(request.client_id.as_deref(), Some("c1"));
        assert_eq!(request.amount_paid_cents, 0);
        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].unit_price_cents, 1250);

        assert!(cart.set_payment(PaymentMethod::Cash, Some(-1)).is_err());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 100), 1).unwrap();
        cart.set_client(Some("c1".to_string()));
        cart.set_payment(PaymentMethod::Card, None).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.client_id, None);
        assert_eq!(cart.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_cart_state_shares_one_cart() {
        let state = CartState::new();
        let other = state.clone();
        other
            .with_cart_mut(|c| c.add_item(&product("1", 100), 4))
            .unwrap();
        assert_eq!(state.with_cart(|c| c.total_quantity()), 4);
    }
}
