//! # Restock Repository
//!
//! Restock orders and their line items. Receiving stock (with its stock,
//! balance and cash-book effects) goes through `AccountsService`.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::{RestockItem, RestockOrder};

use super::{expect_row, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = "SELECT id, supplier_id, date, total_cents, is_paid, notes FROM restock_orders";

const SELECT_ITEMS: &str = "SELECT order_id, product_id, quantity, unit_cost_cents FROM restock_items";

const INSERT: &str = r#"
    INSERT INTO restock_orders (id, supplier_id, date, total_cents, is_paid, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

const UPSERT: &str = r#"
    INSERT INTO restock_orders (id, supplier_id, date, total_cents, is_paid, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(id) DO UPDATE SET
        supplier_id = excluded.supplier_id,
        date = excluded.date,
        total_cents = excluded.total_cents,
        is_paid = excluded.is_paid,
        notes = excluded.notes
"#;

const INSERT_ITEM: &str = r#"
    INSERT INTO restock_items (order_id, product_id, quantity, unit_cost_cents)
    VALUES (?1, ?2, ?3, ?4)
"#;

const UPSERT_ITEM: &str = r#"
    INSERT INTO restock_items (order_id, product_id, quantity, unit_cost_cents)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(order_id, product_id) DO UPDATE SET
        quantity = excluded.quantity,
        unit_cost_cents = excluded.unit_cost_cents
"#;

fn bind<'q>(query: SqliteQuery<'q>, order: &'q RestockOrder) -> SqliteQuery<'q> {
    query
        .bind(&order.id)
        .bind(&order.supplier_id)
        .bind(order.date)
        .bind(order.total_cents)
        .bind(order.is_paid)
        .bind(opt_text(&order.notes))
}

fn bind_item<'q>(query: SqliteQuery<'q>, item: &'q RestockItem) -> SqliteQuery<'q> {
    query
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_cost_cents)
}

#[derive(Debug, Clone)]
pub struct RestockRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl RestockRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        RestockRepository { pool, changes }
    }

    pub async fn list_all(&self) -> DbResult<Vec<RestockOrder>> {
        let sql = format!("{SELECT} ORDER BY date, id");
        Ok(sqlx::query_as::<_, RestockOrder>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RestockOrder>> {
        let sql = format!("{SELECT} WHERE id = ?1");
        Ok(sqlx::query_as::<_, RestockOrder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// A supplier's orders, newest first.
    pub async fn by_supplier(&self, supplier_id: &str) -> DbResult<Vec<RestockOrder>> {
        let sql = format!("{SELECT} WHERE supplier_id = ?1 ORDER BY date DESC, id");
        Ok(sqlx::query_as::<_, RestockOrder>(&sql)
            .bind(supplier_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Line items of one order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<RestockItem>> {
        let sql = format!("{SELECT_ITEMS} WHERE order_id = ?1 ORDER BY product_id");
        Ok(sqlx::query_as::<_, RestockItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn list_all_items(&self) -> DbResult<Vec<RestockItem>> {
        let sql = format!("{SELECT_ITEMS} ORDER BY order_id, product_id");
        Ok(sqlx::query_as::<_, RestockItem>(&sql).fetch_all(&self.pool).await?)
    }

    /// Inserts an order row. No stock or balance effects.
    pub async fn insert(&self, order: &RestockOrder) -> DbResult<()> {
        insert_in(&self.pool, order).await?;
        self.changes.notify(Table::RestockOrders);
        Ok(())
    }

    pub async fn add_item(&self, item: &RestockItem) -> DbResult<()> {
        insert_item_in(&self.pool, item).await?;
        self.changes.notify(Table::RestockItems);
        Ok(())
    }

    pub async fn update(&self, order: &RestockOrder) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE restock_orders SET supplier_id = ?2, date = ?3, total_cents = ?4, is_paid = ?5, notes = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(&order.supplier_id)
        .bind(order.date)
        .bind(order.total_cents)
        .bind(order.is_paid)
        .bind(opt_text(&order.notes))
        .execute(&self.pool)
        .await?;

        expect_row(result, "RestockOrder", &order.id)?;
        self.changes.notify(Table::RestockOrders);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM restock_orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "RestockOrder", id)?;
        self.changes
            .notify_all([Table::RestockOrders, Table::RestockItems]);
        Ok(())
    }

    pub async fn upsert(&self, order: &RestockOrder) -> DbResult<()> {
        upsert_in(&self.pool, order).await?;
        self.changes.notify(Table::RestockOrders);
        Ok(())
    }

    pub async fn upsert_item(&self, item: &RestockItem) -> DbResult<()> {
        upsert_item_in(&self.pool, item).await?;
        self.changes.notify(Table::RestockItems);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM restock_orders")
            .fetch_one(&self.pool)
            .await?)
    }
}

pub(crate) async fn insert_in<'e, E>(executor: E, order: &RestockOrder) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %order.id, supplier = %order.supplier_id, "Inserting restock order");
    bind(sqlx::query(INSERT), order).execute(executor).await?;
    Ok(())
}

pub(crate) async fn insert_item_in<'e, E>(executor: E, item: &RestockItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind_item(sqlx::query(INSERT_ITEM), item).execute(executor).await?;
    Ok(())
}

pub(crate) async fn upsert_in<'e, E>(executor: E, order: &RestockOrder) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), order).execute(executor).await?;
    Ok(())
}

pub(crate) async fn upsert_item_in<'e, E>(executor: E, item: &RestockItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind_item(sqlx::query(UPSERT_ITEM), item).execute(executor).await?;
    Ok(())
}
