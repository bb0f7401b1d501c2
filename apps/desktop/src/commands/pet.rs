//! # Pet Commands
//!
//! Patients and their clinical history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use vetpos_core::{Pet, Treatment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDto {
    pub id: String,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub age_years: Option<i64>,
    pub weight_grams: Option<i64>,
    pub owner_id: String,
    pub notes: Option<String>,
}

impl From<Pet> for PetDto {
    fn from(p: Pet) -> Self {
        let age_years = p.age_years(vetpos_core::now());
        PetDto {
            id: p.id,
            name: p.name,
            species: p.species,
            breed: p.breed,
            birth_date: p.birth_date,
            age_years,
            weight_grams: p.weight_grams,
            owner_id: p.owner_id,
            notes: p.notes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetInput {
    pub name: String,
    pub species: String,
    pub owner_id: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weight_grams: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PetInput {
    fn apply(self, pet: &mut Pet) {
        pet.name = self.name.trim().to_string();
        pet.species = self.species.trim().to_string();
        pet.owner_id = self.owner_id;
        pet.breed = self.breed.filter(|b| !b.trim().is_empty());
        pet.birth_date = self.birth_date;
        pet.weight_grams = self.weight_grams;
        pet.notes = self.notes.filter(|n| !n.trim().is_empty());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentDto {
    pub id: String,
    pub pet_id: String,
    pub product_id: Option<String>,
    pub date: DateTime<Utc>,
    pub description: String,
    pub diagnosis: Option<String>,
    pub cost_cents: i64,
    pub next_visit: Option<DateTime<Utc>>,
}

impl From<Treatment> for TreatmentDto {
    fn from(t: Treatment) -> Self {
        TreatmentDto {
            id: t.id,
            pet_id: t.pet_id,
            product_id: t.product_id,
            date: t.date,
            description: t.description,
            diagnosis: t.diagnosis,
            cost_cents: t.cost_cents,
            next_visit: t.next_visit,
        }
    }
}

/// Fields of the treatment dialog. The date defaults to now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentInput {
    pub pet_id: String,
    pub description: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub next_visit: Option<DateTime<Utc>>,
}

pub async fn pets_of_client(db: &DbState, owner_id: &str) -> Result<Vec<PetDto>, ApiError> {
    debug!(owner_id = %owner_id, "pets_of_client command");
    let pets = db.inner().pets().by_owner(owner_id).await?;
    Ok(pets.into_iter().map(PetDto::from).collect())
}

pub async fn create_pet(db: &DbState, input: PetInput) -> Result<PetDto, ApiError> {
    debug!(name = %input.name, owner_id = %input.owner_id, "create_pet command");

    if db.inner().clients().get_by_id(&input.owner_id).await?.is_none() {
        return Err(ApiError::not_found("Client", &input.owner_id));
    }

    let mut pet = Pet::new("", "", "");
    input.apply(&mut pet);
    db.inner().pets().insert(&pet).await?;

    info!(id = %pet.id, owner = %pet.owner_id, "Pet registered");
    Ok(PetDto::from(pet))
}

pub async fn update_pet(db: &DbState, id: &str, input: PetInput) -> Result<PetDto, ApiError> {
    debug!(id = %id, "update_pet command");
    let pets = db.inner().pets();
    let mut pet = pets
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet", id))?;
    input.apply(&mut pet);
    pets.update(&pet).await?;
    Ok(PetDto::from(pet))
}

pub async fn delete_pet(db: &DbState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_pet command");
    db.inner().pets().delete(id).await?;
    Ok(())
}

pub async fn treatments_of_pet(db: &DbState, pet_id: &str) -> Result<Vec<TreatmentDto>, ApiError> {
    let treatments = db.inner().treatments().by_pet(pet_id).await?;
    Ok(treatments.into_iter().map(TreatmentDto::from).collect())
}

pub async fn add_treatment(db: &DbState, input: TreatmentInput) -> Result<TreatmentDto, ApiError> {
    debug!(pet_id = %input.pet_id, "add_treatment command");

    let treatment = Treatment {
        id: vetpos_core::new_id(),
        pet_id: input.pet_id,
        product_id: input.product_id.filter(|p| !p.is_empty()),
        date: input.date.unwrap_or_else(vetpos_core::now),
        description: input.description.trim().to_string(),
        diagnosis: input.diagnosis.filter(|d| !d.trim().is_empty()),
        cost_cents: input.cost_cents,
        next_visit: input.next_visit,
    };
    db.inner().treatments().insert(&treatment).await?;
    Ok(TreatmentDto::from(treatment))
}

pub async fn delete_treatment(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().treatments().delete(id).await?;
    Ok(())
}
