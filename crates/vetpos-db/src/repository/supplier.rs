//! # Supplier Repository
//!
//! Vendors and the balance the clinic owes each of them. The balance moves
//! only through `AccountsService` (unpaid restock, supplier payment).

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::validation::validate_supplier;
use vetpos_core::{CoreError, Supplier};

use super::{expect_row, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = "SELECT id, name, contact_name, phone, email, balance_cents, created_at FROM suppliers";

const INSERT: &str = r#"
    INSERT INTO suppliers (id, name, contact_name, phone, email, balance_cents, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

const UPSERT: &str = r#"
    INSERT INTO suppliers (id, name, contact_name, phone, email, balance_cents, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        contact_name = excluded.contact_name,
        phone = excluded.phone,
        email = excluded.email,
        balance_cents = excluded.balance_cents,
        created_at = excluded.created_at
"#;

fn bind<'q>(query: SqliteQuery<'q>, supplier: &'q Supplier) -> SqliteQuery<'q> {
    query
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(opt_text(&supplier.contact_name))
        .bind(opt_text(&supplier.phone))
        .bind(opt_text(&supplier.email))
        .bind(supplier.balance_cents)
        .bind(supplier.created_at)
}

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        SupplierRepository { pool, changes }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Supplier>> {
        let sql = format!("{SELECT} ORDER BY name COLLATE NOCASE, id");
        Ok(sqlx::query_as::<_, Supplier>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        get_in(&self.pool, id).await
    }

    pub async fn insert(&self, supplier: &Supplier) -> DbResult<()> {
        validate_supplier(supplier)?;
        debug!(id = %supplier.id, name = %supplier.name, "Inserting supplier");

        bind(sqlx::query(INSERT), supplier).execute(&self.pool).await?;

        self.changes.notify(Table::Suppliers);
        Ok(())
    }

    /// Updates contact details. The balance is not touched.
    pub async fn update(&self, supplier: &Supplier) -> DbResult<()> {
        validate_supplier(supplier)?;

        let result = sqlx::query(
            "UPDATE suppliers SET name = ?2, contact_name = ?3, phone = ?4, email = ?5 WHERE id = ?1",
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(opt_text(&supplier.contact_name))
        .bind(opt_text(&supplier.phone))
        .bind(opt_text(&supplier.email))
        .execute(&self.pool)
        .await?;

        expect_row(result, "Supplier", &supplier.id)?;
        self.changes.notify(Table::Suppliers);
        Ok(())
    }

    /// Deletes a supplier and, by cascade, its restock orders.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Supplier", id)?;
        self.changes
            .notify_all([Table::Suppliers, Table::RestockOrders, Table::RestockItems]);
        Ok(())
    }

    pub async fn upsert(&self, supplier: &Supplier) -> DbResult<()> {
        upsert_in(&self.pool, supplier).await?;
        self.changes.notify(Table::Suppliers);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&self.pool)
            .await?)
    }
}

pub(crate) async fn get_in<'e, E>(executor: E, id: &str) -> DbResult<Option<Supplier>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT} WHERE id = ?1");
    Ok(sqlx::query_as::<_, Supplier>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?)
}

pub(crate) async fn upsert_in<'e, E>(executor: E, supplier: &Supplier) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), supplier).execute(executor).await?;
    Ok(())
}

/// Adds `delta_cents` to what the clinic owes a supplier.
pub(crate) async fn adjust_balance_in<'e, E>(executor: E, id: &str, delta_cents: i64) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE suppliers SET balance_cents = balance_cents + ?2 WHERE id = ?1")
        .bind(id)
        .bind(delta_cents)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::SupplierNotFound(id.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::adjust_balance_in;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use vetpos_core::{CoreError, Supplier};

    #[tokio::test]
    async fn test_balance_moves_only_through_adjustments() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut vendor = Supplier::new("PetFood SA");
        db.suppliers().insert(&vendor).await.unwrap();

        adjust_balance_in(db.pool(), &vendor.id, 4200).await.unwrap();

        vendor.phone = Some("555-0000".into());
        vendor.balance_cents = 0;
        db.suppliers().update(&vendor).await.unwrap();

        let stored = db.suppliers().get_by_id(&vendor.id).await.unwrap().unwrap();
        assert_eq!(stored.balance_cents, 4200);
        assert_eq!(stored.phone.as_deref(), Some("555-0000"));

        let err = adjust_balance_in(db.pool(), "missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::SupplierNotFound(_))));
    }
}
