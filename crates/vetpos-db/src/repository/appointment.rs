//! # Appointment Repository
//!
//! The clinic calendar.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::validation::validate_name;
use vetpos_core::{Appointment, AppointmentStatus};

use super::{expect_row, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = "SELECT id, client_id, pet_id, date, reason, status FROM appointments";

const INSERT: &str = r#"
    INSERT INTO appointments (id, client_id, pet_id, date, reason, status)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

const UPSERT: &str = r#"
    INSERT INTO appointments (id, client_id, pet_id, date, reason, status)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(id) DO UPDATE SET
        client_id = excluded.client_id,
        pet_id = excluded.pet_id,
        date = excluded.date,
        reason = excluded.reason,
        status = excluded.status
"#;

fn bind<'q>(query: SqliteQuery<'q>, appointment: &'q Appointment) -> SqliteQuery<'q> {
    query
        .bind(&appointment.id)
        .bind(&appointment.client_id)
        .bind(&appointment.pet_id)
        .bind(appointment.date)
        .bind(&appointment.reason)
        .bind(appointment.status)
}

#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl AppointmentRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        AppointmentRepository { pool, changes }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Appointment>> {
        let sql = format!("{SELECT} ORDER BY date, id");
        Ok(sqlx::query_as::<_, Appointment>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Appointment>> {
        let sql = format!("{SELECT} WHERE id = ?1");
        Ok(sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Appointments in `[start, end)`, in calendar order.
    pub async fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<Appointment>> {
        let sql = format!("{SELECT} WHERE date >= ?1 AND date < ?2 ORDER BY date, id");
        Ok(sqlx::query_as::<_, Appointment>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn by_pet(&self, pet_id: &str) -> DbResult<Vec<Appointment>> {
        let sql = format!("{SELECT} WHERE pet_id = ?1 ORDER BY date, id");
        Ok(sqlx::query_as::<_, Appointment>(&sql)
            .bind(pet_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn insert(&self, appointment: &Appointment) -> DbResult<()> {
        validate_name("reason", &appointment.reason)?;
        debug!(id = %appointment.id, date = %appointment.date, "Inserting appointment");

        bind(sqlx::query(INSERT), appointment).execute(&self.pool).await?;

        self.changes.notify(Table::Appointments);
        Ok(())
    }

    pub async fn update(&self, appointment: &Appointment) -> DbResult<()> {
        validate_name("reason", &appointment.reason)?;

        let result = sqlx::query(
            r#"
            UPDATE appointments SET client_id = ?2, pet_id = ?3, date = ?4, reason = ?5, status = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&appointment.id)
        .bind(&appointment.client_id)
        .bind(&appointment.pet_id)
        .bind(appointment.date)
        .bind(&appointment.reason)
        .bind(appointment.status)
        .execute(&self.pool)
        .await?;

        expect_row(result, "Appointment", &appointment.id)?;
        self.changes.notify(Table::Appointments);
        Ok(())
    }

    /// Moves an appointment to another status (completed, cancelled...).
    pub async fn set_status(&self, id: &str, status: AppointmentStatus) -> DbResult<()> {
        debug!(id = %id, %status, "Setting appointment status");

        let result = sqlx::query("UPDATE appointments SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Appointment", id)?;
        self.changes.notify(Table::Appointments);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Appointment", id)?;
        self.changes.notify(Table::Appointments);
        Ok(())
    }

    pub async fn upsert(&self, appointment: &Appointment) -> DbResult<()> {
        upsert_in(&self.pool, appointment).await?;
        self.changes.notify(Table::Appointments);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments")
            .fetch_one(&self.pool)
            .await?)
    }
}

pub(crate) async fn upsert_in<'e, E>(executor: E, appointment: &Appointment) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), appointment).execute(executor).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use vetpos_core::{Appointment, AppointmentStatus, Client, Pet};

    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_calendar_window_and_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = Client::new("Ana");
        let pet = Pet::new("Luna", "cat", &owner.id);
        db.clients().insert(&owner).await.unwrap();
        db.pets().insert(&pet).await.unwrap();

        let monday = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let appointment = |offset_days: i64| Appointment {
            id: vetpos_core::new_id(),
            client_id: owner.id.clone(),
            pet_id: pet.id.clone(),
            date: monday + Duration::days(offset_days),
            reason: "Checkup".into(),
            status: AppointmentStatus::Scheduled,
        };
        let first = appointment(0);
        db.appointments().insert(&first).await.unwrap();
        db.appointments().insert(&appointment(1)).await.unwrap();
        db.appointments().insert(&appointment(8)).await.unwrap();

        let week = db
            .appointments()
            .between(monday, monday + Duration::days(7))
            .await
            .unwrap();
        assert_eq!(week.len(), 2);
        assert_eq!(week[0].id, first.id);

        db.appointments()
            .set_status(&first.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();
        let stored = db.appointments().get_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
        assert_eq!(db.appointments().by_pet(&pet.id).await.unwrap().len(), 3);
    }
}
