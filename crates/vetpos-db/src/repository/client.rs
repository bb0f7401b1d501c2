//! # Client Repository
//!
//! Database operations for clients (pet owners).
//!
//! ## Debt
//! `debt_cents` is only moved by store operations (checkout, payments, sale
//! deletion) through [`adjust_debt_in`]. [`ClientRepository::update`] edits
//! contact details and leaves the balance alone.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::validation::{validate_client, validate_search_query};
use vetpos_core::{Client, CoreError};

use super::{expect_row, like_pattern, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = "SELECT id, name, phone, email, address, debt_cents, created_at FROM clients";

const INSERT: &str = r#"
    INSERT INTO clients (id, name, phone, email, address, debt_cents, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

const UPSERT: &str = r#"
    INSERT INTO clients (id, name, phone, email, address, debt_cents, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        phone = excluded.phone,
        email = excluded.email,
        address = excluded.address,
        debt_cents = excluded.debt_cents,
        created_at = excluded.created_at
"#;

fn bind<'q>(query: SqliteQuery<'q>, client: &'q Client) -> SqliteQuery<'q> {
    query
        .bind(&client.id)
        .bind(&client.name)
        .bind(opt_text(&client.phone))
        .bind(opt_text(&client.email))
        .bind(opt_text(&client.address))
        .bind(client.debt_cents)
        .bind(client.created_at)
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ClientRepository { pool, changes }
    }

    /// Every client, alphabetically.
    pub async fn list_all(&self) -> DbResult<Vec<Client>> {
        let sql = format!("{SELECT} ORDER BY name COLLATE NOCASE, id");
        Ok(sqlx::query_as::<_, Client>(&sql).fetch_all(&self.pool).await?)
    }

    /// Gets a client by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        get_in(&self.pool, id).await
    }

    /// Matches name, phone or email. An empty query lists everyone.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Client>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return self.list_all().await;
        }

        debug!(query = %query, "Searching clients");

        let sql = format!(
            "{SELECT} WHERE name LIKE ?1 ESCAPE '\\' OR phone LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\' \
             ORDER BY name COLLATE NOCASE, id"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(like_pattern(&query))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = clients.len(), "Search returned clients");
        Ok(clients)
    }

    /// Clients who owe money, largest debt first.
    pub async fn with_debt(&self) -> DbResult<Vec<Client>> {
        let sql = format!("{SELECT} WHERE debt_cents > 0 ORDER BY debt_cents DESC, name COLLATE NOCASE");
        Ok(sqlx::query_as::<_, Client>(&sql).fetch_all(&self.pool).await?)
    }

    /// Inserts a new client.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - ID already exists
    pub async fn insert(&self, client: &Client) -> DbResult<()> {
        validate_client(client)?;
        debug!(id = %client.id, name = %client.name, "Inserting client");

        bind(sqlx::query(INSERT), client).execute(&self.pool).await?;

        self.changes.notify(Table::Clients);
        Ok(())
    }

    /// Updates contact details. The debt balance is not touched.
    pub async fn update(&self, client: &Client) -> DbResult<()> {
        validate_client(client)?;
        debug!(id = %client.id, "Updating client");

        let result = sqlx::query(
            r#"
            UPDATE clients SET name = ?2, phone = ?3, email = ?4, address = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(opt_text(&client.phone))
        .bind(opt_text(&client.email))
        .bind(opt_text(&client.address))
        .execute(&self.pool)
        .await?;

        expect_row(result, "Client", &client.id)?;
        self.changes.notify(Table::Clients);
        Ok(())
    }

    /// Deletes a client. Pets, payments and appointments cascade; sales keep
    /// their rows with the client cleared.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting client");

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Client", id)?;
        self.changes.notify_all([
            Table::Clients,
            Table::Pets,
            Table::Payments,
            Table::Appointments,
            Table::Treatments,
            Table::Sales,
        ]);
        Ok(())
    }

    /// Inserts the client or overwrites the row with the same id.
    pub async fn upsert(&self, client: &Client) -> DbResult<()> {
        upsert_in(&self.pool, client).await?;
        self.changes.notify(Table::Clients);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?)
    }
}

// =============================================================================
// Executor-generic statements
// =============================================================================

pub(crate) async fn get_in<'e, E>(executor: E, id: &str) -> DbResult<Option<Client>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT} WHERE id = ?1");
    Ok(sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?)
}

pub(crate) async fn upsert_in<'e, E>(executor: E, client: &Client) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), client).execute(executor).await?;
    Ok(())
}

/// Adds `delta_cents` to a client's debt (negative to reduce it).
pub(crate) async fn adjust_debt_in<'e, E>(executor: E, id: &str, delta_cents: i64) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE clients SET debt_cents = debt_cents + ?2 WHERE id = ?1")
        .bind(id)
        .bind(delta_cents)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ClientNotFound(id.to_string()).into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use vetpos_core::Client;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_search_and_update() {
        let db = db().await;
        let repo = db.clients();

        let mut ana = Client::new("Ana Gómez");
        ana.phone = Some("555-1234".into());
        repo.insert(&ana).await.unwrap();
        repo.insert(&Client::new("Bruno")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.search("gómez").await.unwrap().len(), 1);
        assert_eq!(repo.search("555").await.unwrap()[0].id, ana.id);
        assert_eq!(repo.search("").await.unwrap().len(), 2);

        ana.name = "Ana G.".into();
        ana.debt_cents = 99_999;
        repo.update(&ana).await.unwrap();

        let stored = repo.get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Ana G.");
        assert_eq!(stored.debt_cents, 0);
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let db = db().await;
        let repo = db.clients();

        assert!(matches!(repo.delete("nope").await, Err(DbError::NotFound { .. })));
        assert!(matches!(
            repo.update(&Client::new("Ghost")).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_insert_and_upsert() {
        let db = db().await;
        let repo = db.clients();

        let mut client = Client::new("Carla");
        repo.insert(&client).await.unwrap();
        assert!(matches!(
            repo.insert(&client).await,
            Err(DbError::UniqueViolation { .. })
        ));

        client.debt_cents = 1500;
        repo.upsert(&client).await.unwrap();
        repo.upsert(&client).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.with_debt().await.unwrap()[0].debt_cents, 1500);
    }

    #[tokio::test]
    async fn test_writes_emit_changes() {
        let db = db().await;
        let mut rx = db.subscribe();

        db.clients().insert(&Client::new("Dario")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().table, crate::Table::Clients);
    }

    #[tokio::test]
    async fn test_invalid_client_is_rejected() {
        let db = db().await;
        let err = db.clients().insert(&Client::new("  ")).await.unwrap_err();
        assert!(err.is_user_error());
    }
}
