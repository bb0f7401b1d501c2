//! # Product Commands
//!
//! Inventory screen: search, create/edit/delete, categories and the
//! low-stock list.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{AppConfig, DbState};
use vetpos_core::Product;

/// Product DTO for screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock: i64,
    pub min_stock: i64,
    pub is_service: bool,
    /// Shown as a warning badge on the inventory grid
    pub is_low_stock: bool,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        let is_low_stock = p.is_low_stock();
        ProductDto {
            id: p.id,
            name: p.name,
            category: p.category,
            price_cents: p.price_cents,
            cost_cents: p.cost_cents,
            stock: p.stock,
            min_stock: p.min_stock,
            is_service: p.is_service,
            is_low_stock,
        }
    }
}

/// Fields of the product dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub stock: i64,
    /// `None` uses the configured low-stock threshold.
    #[serde(default)]
    pub min_stock: Option<i64>,
    #[serde(default)]
    pub is_service: bool,
}

impl ProductInput {
    fn apply(self, product: &mut Product, default_min_stock: i64) {
        product.name = self.name.trim().to_string();
        product.category = self.category.trim().to_string();
        product.price_cents = self.price_cents;
        product.cost_cents = self.cost_cents;
        product.is_service = self.is_service;
        if self.is_service {
            product.stock = 0;
            product.min_stock = 0;
        } else {
            product.stock = self.stock;
            product.min_stock = self.min_stock.unwrap_or(default_min_stock);
        }
    }
}

/// Searches name and category. An empty query returns the whole catalog.
pub async fn search_products(db: &DbState, query: &str) -> Result<Vec<ProductDto>, ApiError> {
    let start = Instant::now();
    debug!(query = %query, "search_products command");

    let products = db.inner().products().search(query).await?;
    let dtos: Vec<ProductDto> = products.into_iter().map(ProductDto::from).collect();

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        "search_products complete"
    );
    Ok(dtos)
}

pub async fn get_product(db: &DbState, id: &str) -> Result<ProductDto, ApiError> {
    debug!(id = %id, "get_product command");
    db.inner()
        .products()
        .get_by_id(id)
        .await?
        .map(ProductDto::from)
        .ok_or_else(|| ApiError::not_found("Product", id))
}

/// Creates a product. A missing reorder point takes the configured
/// threshold.
pub async fn create_product(
    db: &DbState,
    config: &AppConfig,
    input: ProductInput,
) -> Result<ProductDto, ApiError> {
    debug!(name = %input.name, "create_product command");

    let mut product = Product::new("", "", 0);
    input.apply(&mut product, config.low_stock_threshold);
    db.inner().products().insert(&product).await?;

    info!(id = %product.id, name = %product.name, "Product created");
    Ok(ProductDto::from(product))
}

pub async fn update_product(
    db: &DbState,
    config: &AppConfig,
    id: &str,
    input: ProductInput,
) -> Result<ProductDto, ApiError> {
    debug!(id = %id, "update_product command");

    let products = db.inner().products();
    let mut product = products
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    input.apply(&mut product, config.low_stock_threshold);
    products.update(&product).await?;

    Ok(ProductDto::from(product))
}

pub async fn delete_product(db: &DbState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_product command");
    db.inner().products().delete(id).await?;
    Ok(())
}

pub async fn list_categories(db: &DbState) -> Result<Vec<String>, ApiError> {
    Ok(db.inner().products().categories().await?)
}

pub async fn low_stock_products(db: &DbState) -> Result<Vec<ProductDto>, ApiError> {
    debug!("low_stock_products command");
    let products = db.inner().products().low_stock().await?;
    Ok(products.into_iter().map(ProductDto::from).collect())
}
