//! # Sale Repository
//!
//! Database operations for sales and their line items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart ──► CheckoutService::checkout() ──► sales + sale_items rows       │
//! │                                            (one transaction, with stock │
//! │                                             debt and cash-book effects) │
//! │                                                                         │
//! │  CheckoutService::delete_sale() ──► row removed, items cascade,         │
//! │                                     stock and debt restored             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plain `insert`/`update`/`delete` here write rows only, without those
//! side effects. The counter goes through `CheckoutService`.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::{Sale, SaleItem};

use super::{expect_row, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = r#"
    SELECT id, client_id, date, total_cents, amount_paid_cents, payment_method, notes
    FROM sales
"#;

const SELECT_ITEMS: &str = "SELECT sale_id, product_id, quantity, unit_price_cents FROM sale_items";

const INSERT: &str = r#"
    INSERT INTO sales (id, client_id, date, total_cents, amount_paid_cents, payment_method, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

const UPSERT: &str = r#"
    INSERT INTO sales (id, client_id, date, total_cents, amount_paid_cents, payment_method, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        client_id = excluded.client_id,
        date = excluded.date,
        total_cents = excluded.total_cents,
        amount_paid_cents = excluded.amount_paid_cents,
        payment_method = excluded.payment_method,
        notes = excluded.notes
"#;

const INSERT_ITEM: &str = r#"
    INSERT INTO sale_items (sale_id, product_id, quantity, unit_price_cents)
    VALUES (?1, ?2, ?3, ?4)
"#;

const UPSERT_ITEM: &str = r#"
    INSERT INTO sale_items (sale_id, product_id, quantity, unit_price_cents)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(sale_id, product_id) DO UPDATE SET
        quantity = excluded.quantity,
        unit_price_cents = excluded.unit_price_cents
"#;

fn bind<'q>(query: SqliteQuery<'q>, sale: &'q Sale) -> SqliteQuery<'q> {
    query
        .bind(&sale.id)
        .bind(opt_text(&sale.client_id))
        .bind(sale.date)
        .bind(sale.total_cents)
        .bind(sale.amount_paid_cents)
        .bind(sale.payment_method)
        .bind(opt_text(&sale.notes))
}

fn bind_item<'q>(query: SqliteQuery<'q>, item: &'q SaleItem) -> SqliteQuery<'q> {
    query
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        SaleRepository { pool, changes }
    }

    /// Every sale, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Sale>> {
        let sql = format!("{SELECT} ORDER BY date, id");
        Ok(sqlx::query_as::<_, Sale>(&sql).fetch_all(&self.pool).await?)
    }

    /// Gets a sale by ID (without items).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        get_in(&self.pool, id).await
    }

    /// Sales dated in `[start, end)`, oldest first.
    pub async fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        let sql = format!("{SELECT} WHERE date >= ?1 AND date < ?2 ORDER BY date, id");
        Ok(sqlx::query_as::<_, Sale>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Sales charged to a client, newest first.
    pub async fn by_client(&self, client_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!("{SELECT} WHERE client_id = ?1 ORDER BY date DESC, id");
        Ok(sqlx::query_as::<_, Sale>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Line items of one sale.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        items_in(&self.pool, sale_id).await
    }

    /// Every line item in the store.
    pub async fn list_all_items(&self) -> DbResult<Vec<SaleItem>> {
        let sql = format!("{SELECT_ITEMS} ORDER BY sale_id, product_id");
        Ok(sqlx::query_as::<_, SaleItem>(&sql).fetch_all(&self.pool).await?)
    }

    /// Line items of sales dated in `[start, end)`.
    pub async fn items_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<SaleItem>> {
        Ok(sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT i.sale_id, i.product_id, i.quantity, i.unit_price_cents
            FROM sale_items i
            INNER JOIN sales s ON s.id = i.sale_id
            WHERE s.date >= ?1 AND s.date < ?2
            ORDER BY i.sale_id, i.product_id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Inserts a sale row. No stock or debt effects.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        insert_in(&self.pool, sale).await?;
        self.changes.notify(Table::Sales);
        Ok(())
    }

    /// Adds a line item. No stock effects.
    pub async fn add_item(&self, item: &SaleItem) -> DbResult<()> {
        insert_item_in(&self.pool, item).await?;
        self.changes.notify(Table::SaleItems);
        Ok(())
    }

    /// Overwrites a sale row.
    pub async fn update(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, "Updating sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                client_id = ?2, date = ?3, total_cents = ?4,
                amount_paid_cents = ?5, payment_method = ?6, notes = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(opt_text(&sale.client_id))
        .bind(sale.date)
        .bind(sale.total_cents)
        .bind(sale.amount_paid_cents)
        .bind(sale.payment_method)
        .bind(opt_text(&sale.notes))
        .execute(&self.pool)
        .await?;

        expect_row(result, "Sale", &sale.id)?;
        self.changes.notify(Table::Sales);
        Ok(())
    }

    /// Deletes a sale row; items cascade. No stock or debt effects.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        delete_in(&self.pool, id).await?;
        self.changes.notify_all([Table::Sales, Table::SaleItems]);
        Ok(())
    }

    pub async fn upsert(&self, sale: &Sale) -> DbResult<()> {
        upsert_in(&self.pool, sale).await?;
        self.changes.notify(Table::Sales);
        Ok(())
    }

    pub async fn upsert_item(&self, item: &SaleItem) -> DbResult<()> {
        upsert_item_in(&self.pool, item).await?;
        self.changes.notify(Table::SaleItems);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn count_items(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sale_items")
            .fetch_one(&self.pool)
            .await?)
    }
}

// =============================================================================
// Executor-generic statements
// =============================================================================

pub(crate) async fn get_in<'e, E>(executor: E, id: &str) -> DbResult<Option<Sale>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT} WHERE id = ?1");
    Ok(sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?)
}

pub(crate) async fn items_in<'e, E>(executor: E, sale_id: &str) -> DbResult<Vec<SaleItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_ITEMS} WHERE sale_id = ?1 ORDER BY product_id");
    Ok(sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(executor)
        .await?)
}

pub(crate) async fn insert_in<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %sale.id, total = sale.total_cents, "Inserting sale");
    bind(sqlx::query(INSERT), sale).execute(executor).await?;
    Ok(())
}

pub(crate) async fn insert_item_in<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind_item(sqlx::query(INSERT_ITEM), item).execute(executor).await?;
    Ok(())
}

pub(crate) async fn upsert_in<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), sale).execute(executor).await?;
    Ok(())
}

pub(crate) async fn upsert_item_in<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind_item(sqlx::query(UPSERT_ITEM), item).execute(executor).await?;
    Ok(())
}

pub(crate) async fn delete_in<'e, E>(executor: E, id: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, "Deleting sale");
    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;
    expect_row(result, "Sale", id)
}
