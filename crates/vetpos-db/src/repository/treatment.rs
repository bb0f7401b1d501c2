//! # Treatment Repository
//!
//! A pet's clinical history. Treatments go when their pet goes; a deleted
//! service product only clears `product_id`.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::validation::{validate_amount_cents, validate_name};
use vetpos_core::Treatment;

use super::{expect_row, opt_text, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = r#"
    SELECT id, pet_id, product_id, date, description, diagnosis, cost_cents, next_visit
    FROM treatments
"#;

const INSERT: &str = r#"
    INSERT INTO treatments (id, pet_id, product_id, date, description, diagnosis, cost_cents, next_visit)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

const UPSERT: &str = r#"
    INSERT INTO treatments (id, pet_id, product_id, date, description, diagnosis, cost_cents, next_visit)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(id) DO UPDATE SET
        pet_id = excluded.pet_id,
        product_id = excluded.product_id,
        date = excluded.date,
        description = excluded.description,
        diagnosis = excluded.diagnosis,
        cost_cents = excluded.cost_cents,
        next_visit = excluded.next_visit
"#;

fn bind<'q>(query: SqliteQuery<'q>, treatment: &'q Treatment) -> SqliteQuery<'q> {
    query
        .bind(&treatment.id)
        .bind(&treatment.pet_id)
        .bind(opt_text(&treatment.product_id))
        .bind(treatment.date)
        .bind(&treatment.description)
        .bind(opt_text(&treatment.diagnosis))
        .bind(treatment.cost_cents)
        .bind(treatment.next_visit)
}

fn validate(treatment: &Treatment) -> DbResult<()> {
    validate_name("description", &treatment.description)?;
    validate_amount_cents("cost", treatment.cost_cents)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TreatmentRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl TreatmentRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        TreatmentRepository { pool, changes }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Treatment>> {
        let sql = format!("{SELECT} ORDER BY date, id");
        Ok(sqlx::query_as::<_, Treatment>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Treatment>> {
        let sql = format!("{SELECT} WHERE id = ?1");
        Ok(sqlx::query_as::<_, Treatment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// A pet's history, newest first.
    pub async fn by_pet(&self, pet_id: &str) -> DbResult<Vec<Treatment>> {
        let sql = format!("{SELECT} WHERE pet_id = ?1 ORDER BY date DESC, id");
        Ok(sqlx::query_as::<_, Treatment>(&sql)
            .bind(pet_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn insert(&self, treatment: &Treatment) -> DbResult<()> {
        validate(treatment)?;
        debug!(id = %treatment.id, pet = %treatment.pet_id, "Inserting treatment");

        bind(sqlx::query(INSERT), treatment).execute(&self.pool).await?;

        self.changes.notify(Table::Treatments);
        Ok(())
    }

    pub async fn update(&self, treatment: &Treatment) -> DbResult<()> {
        validate(treatment)?;

        let result = sqlx::query(
            r#"
            UPDATE treatments SET
                pet_id = ?2, product_id = ?3, date = ?4, description = ?5,
                diagnosis = ?6, cost_cents = ?7, next_visit = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&treatment.id)
        .bind(&treatment.pet_id)
        .bind(opt_text(&treatment.product_id))
        .bind(treatment.date)
        .bind(&treatment.description)
        .bind(opt_text(&treatment.diagnosis))
        .bind(treatment.cost_cents)
        .bind(treatment.next_visit)
        .execute(&self.pool)
        .await?;

        expect_row(result, "Treatment", &treatment.id)?;
        self.changes.notify(Table::Treatments);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM treatments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Treatment", id)?;
        self.changes.notify(Table::Treatments);
        Ok(())
    }

    pub async fn upsert(&self, treatment: &Treatment) -> DbResult<()> {
        upsert_in(&self.pool, treatment).await?;
        self.changes.notify(Table::Treatments);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM treatments")
            .fetch_one(&self.pool)
            .await?)
    }
}

pub(crate) async fn upsert_in<'e, E>(executor: E, treatment: &Treatment) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), treatment).execute(executor).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use vetpos_core::{Client, Pet, Product, Treatment};

    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_history_survives_service_deletion() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = Client::new("Ana");
        let pet = Pet::new("Luna", "cat", &owner.id);
        let mut vaccine = Product::new("Rabies vaccine", "services", 1800);
        vaccine.is_service = true;
        db.clients().insert(&owner).await.unwrap();
        db.pets().insert(&pet).await.unwrap();
        db.products().insert(&vaccine).await.unwrap();

        let now = vetpos_core::now();
        let treatment = Treatment {
            id: vetpos_core::new_id(),
            pet_id: pet.id.clone(),
            product_id: Some(vaccine.id.clone()),
            date: now,
            description: "Annual vaccination".into(),
            diagnosis: None,
            cost_cents: 1800,
            next_visit: Some(now + Duration::days(365)),
        };
        db.treatments().insert(&treatment).await.unwrap();
        assert_eq!(db.treatments().by_pet(&pet.id).await.unwrap(), vec![treatment.clone()]);

        db.products().delete(&vaccine.id).await.unwrap();
        let stored = db.treatments().get_by_id(&treatment.id).await.unwrap().unwrap();
        assert_eq!(stored.product_id, None);

        db.pets().delete(&pet.id).await.unwrap();
        assert_eq!(db.treatments().count().await.unwrap(), 0);
    }
}
