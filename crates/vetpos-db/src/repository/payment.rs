//! # Payment Repository
//!
//! Payments clients make against their debt. Recording one through
//! `AccountsService::record_payment` also lowers the debt and writes the
//! cash-book entry; the methods here only touch the `payments` table.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::Payment;

use super::{expect_row, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = "SELECT id, client_id, date, amount_cents, method, notes FROM payments";

const INSERT: &str = r#"
    INSERT INTO payments (id, client_id, date, amount_cents, method, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

const UPSERT: &str = r#"
    INSERT INTO payments (id, client_id, date, amount_cents, method, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(id) DO UPDATE SET
        client_id = excluded.client_id,
        date = excluded.date,
        amount_cents = excluded.amount_cents,
        method = excluded.method,
        notes = excluded.notes
"#;

fn bind<'q>(query: SqliteQuery<'q>, payment: &'q Payment) -> SqliteQuery<'q> {
    query
        .bind(&payment.id)
        .bind(&payment.client_id)
        .bind(payment.date)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(opt_text(&payment.notes))
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        PaymentRepository { pool, changes }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Payment>> {
        let sql = format!("{SELECT} ORDER BY date, id");
        Ok(sqlx::query_as::<_, Payment>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payment>> {
        let sql = format!("{SELECT} WHERE id = ?1");
        Ok(sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// A client's payments, newest first.
    pub async fn by_client(&self, client_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!("{SELECT} WHERE client_id = ?1 ORDER BY date DESC, id");
        Ok(sqlx::query_as::<_, Payment>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn insert(&self, payment: &Payment) -> DbResult<()> {
        insert_in(&self.pool, payment).await?;
        self.changes.notify(Table::Payments);
        Ok(())
    }

    pub async fn update(&self, payment: &Payment) -> DbResult<()> {
        debug!(id = %payment.id, "Updating payment");

        let result = sqlx::query(
            r#"
            UPDATE payments SET client_id = ?2, date = ?3, amount_cents = ?4, method = ?5, notes = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.client_id)
        .bind(payment.date)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(opt_text(&payment.notes))
        .execute(&self.pool)
        .await?;

        expect_row(result, "Payment", &payment.id)?;
        self.changes.notify(Table::Payments);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Payment", id)?;
        self.changes.notify(Table::Payments);
        Ok(())
    }

    pub async fn upsert(&self, payment: &Payment) -> DbResult<()> {
        upsert_in(&self.pool, payment).await?;
        self.changes.notify(Table::Payments);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?)
    }
}

pub(crate) async fn insert_in<'e, E>(executor: E, payment: &Payment) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %payment.id, client = %payment.client_id, "Inserting payment");
    bind(sqlx::query(INSERT), payment).execute(executor).await?;
    Ok(())
}

pub(crate) async fn upsert_in<'e, E>(executor: E, payment: &Payment) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), payment).execute(executor).await?;
    Ok(())
}
