//! # Pet Repository
//!
//! Database operations for pets. Every pet belongs to a client; deleting the
//! client deletes its pets, their treatments and appointments.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::validation::validate_pet;
use vetpos_core::Pet;

use super::{expect_row, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = r#"
    SELECT id, name, species, breed, birth_date, weight_grams, owner_id, notes, created_at
    FROM pets
"#;

const INSERT: &str = r#"
    INSERT INTO pets (id, name, species, breed, birth_date, weight_grams, owner_id, notes, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

const UPSERT: &str = r#"
    INSERT INTO pets (id, name, species, breed, birth_date, weight_grams, owner_id, notes, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        species = excluded.species,
        breed = excluded.breed,
        birth_date = excluded.birth_date,
        weight_grams = excluded.weight_grams,
        owner_id = excluded.owner_id,
        notes = excluded.notes,
        created_at = excluded.created_at
"#;

fn bind<'q>(query: SqliteQuery<'q>, pet: &'q Pet) -> SqliteQuery<'q> {
    query
        .bind(&pet.id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(opt_text(&pet.breed))
        .bind(pet.birth_date)
        .bind(pet.weight_grams)
        .bind(&pet.owner_id)
        .bind(opt_text(&pet.notes))
        .bind(pet.created_at)
}

/// Repository for pet database operations.
#[derive(Debug, Clone)]
pub struct PetRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl PetRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        PetRepository { pool, changes }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Pet>> {
        let sql = format!("{SELECT} ORDER BY name COLLATE NOCASE, id");
        Ok(sqlx::query_as::<_, Pet>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Pet>> {
        let sql = format!("{SELECT} WHERE id = ?1");
        Ok(sqlx::query_as::<_, Pet>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Pets owned by a client.
    pub async fn by_owner(&self, owner_id: &str) -> DbResult<Vec<Pet>> {
        let sql = format!("{SELECT} WHERE owner_id = ?1 ORDER BY name COLLATE NOCASE, id");
        Ok(sqlx::query_as::<_, Pet>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Inserts a new pet.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - owner doesn't exist
    pub async fn insert(&self, pet: &Pet) -> DbResult<()> {
        validate_pet(pet)?;
        debug!(id = %pet.id, owner = %pet.owner_id, "Inserting pet");

        bind(sqlx::query(INSERT), pet).execute(&self.pool).await?;

        self.changes.notify(Table::Pets);
        Ok(())
    }

    pub async fn update(&self, pet: &Pet) -> DbResult<()> {
        validate_pet(pet)?;
        debug!(id = %pet.id, "Updating pet");

        let result = sqlx::query(
            r#"
            UPDATE pets SET
                name = ?2, species = ?3, breed = ?4, birth_date = ?5,
                weight_grams = ?6, owner_id = ?7, notes = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&pet.id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(opt_text(&pet.breed))
        .bind(pet.birth_date)
        .bind(pet.weight_grams)
        .bind(&pet.owner_id)
        .bind(opt_text(&pet.notes))
        .execute(&self.pool)
        .await?;

        expect_row(result, "Pet", &pet.id)?;
        self.changes.notify(Table::Pets);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting pet");

        let result = sqlx::query("DELETE FROM pets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Pet", id)?;
        self.changes
            .notify_all([Table::Pets, Table::Treatments, Table::Appointments]);
        Ok(())
    }

    pub async fn upsert(&self, pet: &Pet) -> DbResult<()> {
        upsert_in(&self.pool, pet).await?;
        self.changes.notify(Table::Pets);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pets")
            .fetch_one(&self.pool)
            .await?)
    }
}

pub(crate) async fn upsert_in<'e, E>(executor: E, pet: &Pet) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), pet).execute(executor).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use vetpos_core::{Client, Pet};

    #[tokio::test]
    async fn test_pets_follow_their_owner() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = Client::new("Ana");
        db.clients().insert(&owner).await.unwrap();

        let mut luna = Pet::new("Luna", "cat", &owner.id);
        luna.weight_grams = Some(4200);
        db.pets().insert(&luna).await.unwrap();
        db.pets().insert(&Pet::new("Rex", "dog", &owner.id)).await.unwrap();

        let pets = db.pets().by_owner(&owner.id).await.unwrap();
        assert_eq!(pets.len(), 2);
        assert_eq!(pets[0].name, "Luna");
        assert_eq!(pets[0], luna);

        db.clients().delete(&owner.id).await.unwrap();
        assert_eq!(db.pets().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_orphan_pet_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.pets().insert(&Pet::new("Stray", "dog", "nobody")).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
