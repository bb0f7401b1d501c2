//! # Supplier Commands
//!
//! Vendors, incoming deliveries and paying what the clinic owes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use vetpos_core::{RestockItem, RestockOrder, Supplier};
use vetpos_db::RestockRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierDto {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Owed to the supplier
    pub balance_cents: i64,
}

impl From<Supplier> for SupplierDto {
    fn from(s: Supplier) -> Self {
        SupplierDto {
            id: s.id,
            name: s.name,
            contact_name: s.contact_name,
            phone: s.phone,
            email: s.email,
            balance_cents: s.balance_cents,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SupplierInput {
    fn apply(self, supplier: &mut Supplier) {
        let keep = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        supplier.name = self.name.trim().to_string();
        supplier.contact_name = keep(self.contact_name);
        supplier.phone = keep(self.phone);
        supplier.email = keep(self.email);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockDto {
    pub id: String,
    pub supplier_id: String,
    pub date: DateTime<Utc>,
    pub total_cents: i64,
    pub is_paid: bool,
    pub notes: Option<String>,
    pub items: Vec<RestockItemDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockItemDto {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl From<RestockItem> for RestockItemDto {
    fn from(i: RestockItem) -> Self {
        RestockItemDto {
            product_id: i.product_id,
            quantity: i.quantity,
            unit_cost_cents: i.unit_cost_cents,
        }
    }
}

impl RestockDto {
    fn new(order: RestockOrder, items: Vec<RestockItem>) -> Self {
        RestockDto {
            id: order.id,
            supplier_id: order.supplier_id,
            date: order.date,
            total_cents: order.total_cents,
            is_paid: order.is_paid,
            notes: order.notes,
            items: items.into_iter().map(RestockItemDto::from).collect(),
        }
    }
}

pub async fn list_suppliers(db: &DbState) -> Result<Vec<SupplierDto>, ApiError> {
    let suppliers = db.inner().suppliers().list_all().await?;
    Ok(suppliers.into_iter().map(SupplierDto::from).collect())
}

pub async fn create_supplier(db: &DbState, input: SupplierInput) -> Result<SupplierDto, ApiError> {
    debug!(name = %input.name, "create_supplier command");
    let mut supplier = Supplier::new("");
    input.apply(&mut supplier);
    db.inner().suppliers().insert(&supplier).await?;
    Ok(SupplierDto::from(supplier))
}

pub async fn update_supplier(db: &DbState, id: &str, input: SupplierInput) -> Result<SupplierDto, ApiError> {
    debug!(id = %id, "update_supplier command");
    let suppliers = db.inner().suppliers();
    let mut supplier = suppliers
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier", id))?;
    input.apply(&mut supplier);
    suppliers.update(&supplier).await?;
    Ok(SupplierDto::from(supplier))
}

pub async fn delete_supplier(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().suppliers().delete(id).await?;
    Ok(())
}

/// Books a delivery and returns the stored order with its lines.
pub async fn receive_restock(db: &DbState, request: RestockRequest) -> Result<RestockDto, ApiError> {
    debug!(
        supplier_id = %request.supplier_id,
        lines = request.lines.len(),
        paid = request.is_paid,
        "receive_restock command"
    );

    let order = db.inner().accounts().receive_restock(&request).await?;
    let items = db.inner().restocks().items(&order.id).await?;

    info!(order = %order.id, total_cents = order.total_cents, "Delivery booked");
    Ok(RestockDto::new(order, items))
}

pub async fn restocks_of_supplier(db: &DbState, supplier_id: &str) -> Result<Vec<RestockDto>, ApiError> {
    let restocks = db.inner().restocks();
    let mut out = Vec::new();
    for order in restocks.by_supplier(supplier_id).await? {
        let items = restocks.items(&order.id).await?;
        out.push(RestockDto::new(order, items));
    }
    Ok(out)
}

/// Pays a supplier and returns the new balance.
pub async fn pay_supplier(
    db: &DbState,
    supplier_id: &str,
    amount_cents: i64,
    notes: Option<String>,
) -> Result<SupplierDto, ApiError> {
    debug!(supplier_id = %supplier_id, amount_cents, "pay_supplier command");
    db.inner()
        .accounts()
        .pay_supplier(supplier_id, amount_cents, notes)
        .await?;

    db.inner()
        .suppliers()
        .get_by_id(supplier_id)
        .await?
        .map(SupplierDto::from)
        .ok_or_else(|| ApiError::not_found("Supplier", supplier_id))
}
