//! # Cash Book Repository
//!
//! Income and expense entries. Store operations write one entry per money
//! movement; the reports read them back by period.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::validation::{validate_name, validate_payment_amount};
use vetpos_core::Transaction;

use super::{expect_row, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = "SELECT id, date, kind, amount_cents, description, reference_id FROM transactions";

const INSERT: &str = r#"
    INSERT INTO transactions (id, date, kind, amount_cents, description, reference_id)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

const UPSERT: &str = r#"
    INSERT INTO transactions (id, date, kind, amount_cents, description, reference_id)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(id) DO UPDATE SET
        date = excluded.date,
        kind = excluded.kind,
        amount_cents = excluded.amount_cents,
        description = excluded.description,
        reference_id = excluded.reference_id
"#;

fn bind<'q>(query: SqliteQuery<'q>, tx: &'q Transaction) -> SqliteQuery<'q> {
    query
        .bind(&tx.id)
        .bind(tx.date)
        .bind(tx.kind)
        .bind(tx.amount_cents)
        .bind(&tx.description)
        .bind(opt_text(&tx.reference_id))
}

/// Repository for the cash book.
///
/// Named after the table; not to be confused with `sqlx::Transaction`.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        TransactionRepository { pool, changes }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Transaction>> {
        let sql = format!("{SELECT} ORDER BY date, id");
        Ok(sqlx::query_as::<_, Transaction>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("{SELECT} WHERE id = ?1");
        Ok(sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Entries dated in `[start, end)`, oldest first.
    pub async fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<Transaction>> {
        let sql = format!("{SELECT} WHERE date >= ?1 AND date < ?2 ORDER BY date, id");
        Ok(sqlx::query_as::<_, Transaction>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Entries caused by one sale, payment or order.
    pub async fn by_reference(&self, reference_id: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!("{SELECT} WHERE reference_id = ?1 ORDER BY date, id");
        Ok(sqlx::query_as::<_, Transaction>(&sql)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Records a manual entry (petty cash, rent...).
    pub async fn insert(&self, tx: &Transaction) -> DbResult<()> {
        validate_name("description", &tx.description)?;
        validate_payment_amount(tx.amount_cents)?;

        insert_in(&self.pool, tx).await?;
        self.changes.notify(Table::Transactions);
        Ok(())
    }

    pub async fn update(&self, tx: &Transaction) -> DbResult<()> {
        validate_name("description", &tx.description)?;

        let result = sqlx::query(
            r#"
            UPDATE transactions SET date = ?2, kind = ?3, amount_cents = ?4, description = ?5, reference_id = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&tx.id)
        .bind(tx.date)
        .bind(tx.kind)
        .bind(tx.amount_cents)
        .bind(&tx.description)
        .bind(opt_text(&tx.reference_id))
        .execute(&self.pool)
        .await?;

        expect_row(result, "Transaction", &tx.id)?;
        self.changes.notify(Table::Transactions);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Transaction", id)?;
        self.changes.notify(Table::Transactions);
        Ok(())
    }

    pub async fn upsert(&self, tx: &Transaction) -> DbResult<()> {
        upsert_in(&self.pool, tx).await?;
        self.changes.notify(Table::Transactions);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?)
    }
}

pub(crate) async fn insert_in<'e, E>(executor: E, tx: &Transaction) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %tx.id, kind = %tx.kind, amount = tx.amount_cents, "Recording cash-book entry");
    bind(sqlx::query(INSERT), tx).execute(executor).await?;
    Ok(())
}

pub(crate) async fn upsert_in<'e, E>(executor: E, tx: &Transaction) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), tx).execute(executor).await?;
    Ok(())
}
