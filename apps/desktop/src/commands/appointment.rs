//! # Appointment Commands
//!
//! The calendar screen: one day at a time.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use vetpos_core::{Appointment, AppointmentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDto {
    pub id: String,
    pub client_id: String,
    pub pet_id: String,
    pub date: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
}

impl From<Appointment> for AppointmentDto {
    fn from(a: Appointment) -> Self {
        AppointmentDto {
            id: a.id,
            client_id: a.client_id,
            pet_id: a.pet_id,
            date: a.date,
            reason: a.reason,
            status: a.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub pet_id: String,
    pub date: DateTime<Utc>,
    pub reason: String,
}

pub async fn appointments_on(db: &DbState, day: NaiveDate) -> Result<Vec<AppointmentDto>, ApiError> {
    debug!(%day, "appointments_on command");
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + chrono::Duration::days(1);
    let appointments = db.inner().appointments().between(start, end).await?;
    Ok(appointments.into_iter().map(AppointmentDto::from).collect())
}

/// Books a visit. The client is taken from the pet's owner.
pub async fn create_appointment(db: &DbState, input: AppointmentInput) -> Result<AppointmentDto, ApiError> {
    debug!(pet_id = %input.pet_id, date = %input.date, "create_appointment command");

    let pet = db
        .inner()
        .pets()
        .get_by_id(&input.pet_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet", &input.pet_id))?;

    let appointment = Appointment {
        id: vetpos_core::new_id(),
        client_id: pet.owner_id,
        pet_id: pet.id,
        date: input.date,
        reason: input.reason.trim().to_string(),
        status: AppointmentStatus::Scheduled,
    };
    db.inner().appointments().insert(&appointment).await?;
    Ok(AppointmentDto::from(appointment))
}

pub async fn set_appointment_status(
    db: &DbState,
    id: &str,
    status: AppointmentStatus,
) -> Result<(), ApiError> {
    debug!(id = %id, %status, "set_appointment_status command");
    db.inner().appointments().set_status(id, status).await?;
    Ok(())
}

pub async fn delete_appointment(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().appointments().delete(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetpos_core::{Client, Pet};
    use vetpos_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_day_view() {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let owner = Client::new("Ana Torres");
        db.inner().clients().insert(&owner).await.unwrap();
        let pet = Pet::new("Luna", "Dog", owner.id.clone());
        db.inner().pets().insert(&pet).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        let at = day.and_hms_opt(10, 30, 0).unwrap().and_utc();
        let booked = create_appointment(
            &db,
            AppointmentInput {
                pet_id: pet.id.clone(),
                date: at,
                reason: "Checkup".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(booked.client_id, owner.id);

        assert_eq!(appointments_on(&db, day).await.unwrap().len(), 1);
        assert!(appointments_on(&db, day.succ_opt().unwrap()).await.unwrap().is_empty());

        set_appointment_status(&db, &booked.id, AppointmentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(
            appointments_on(&db, day).await.unwrap()[0].status,
            AppointmentStatus::Completed
        );
    }
}
