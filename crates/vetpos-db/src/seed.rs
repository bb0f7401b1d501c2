//! # Demo Data
//!
//! Fills an empty store with a small, believable clinic: a catalog, owners
//! with pets, suppliers, deliveries, sales (some on credit), payments,
//! treatments and next week's appointments.
//!
//! Everything goes through the regular repositories and operations, so the
//! stock, debt and cash-book effects are the real ones. Values are derived
//! from the row index; two runs produce the same shape of data.

use chrono::{Duration, Timelike};
use serde::Serialize;
use tracing::info;

use vetpos_core::{
    Appointment, AppointmentStatus, CheckoutLine, CheckoutRequest, Client, PaymentMethod, Pet,
    Product, Supplier, Treatment,
};

use crate::error::DbResult;
use crate::operations::{RestockLine, RestockRequest};
use crate::pool::Database;

/// (category, [(name, price in cents, is_service)])
const CATALOG: &[(&str, &[(&str, i64, bool)])] = &[
    (
        "food",
        &[
            ("Kibble Adult 2kg", 1890, false),
            ("Kibble Puppy 2kg", 2150, false),
            ("Cat Food Salmon 1.5kg", 1720, false),
            ("Wet Food Can", 250, false),
            ("Bird Seed Mix", 640, false),
        ],
    ),
    (
        "medicine",
        &[
            ("Flea & Tick Drops", 1450, false),
            ("Dewormer Tablets", 890, false),
            ("Antibiotic Course", 2300, false),
            ("Ear Cleaner", 760, false),
        ],
    ),
    (
        "accessories",
        &[
            ("Collar Medium", 990, false),
            ("Leash", 1200, false),
            ("Chew Toy", 450, false),
            ("Cat Litter 10L", 1100, false),
        ],
    ),
    (
        "services",
        &[
            ("Consultation", 2500, true),
            ("Vaccination", 1800, true),
            ("Grooming", 3000, true),
            ("Dental Cleaning", 6500, true),
        ],
    ),
];

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Diego", "Elena", "Felipe", "Gabriela", "Hugo", "Irene", "Julián",
];

const LAST_NAMES: &[&str] = &["Gómez", "Pérez", "Rodríguez", "Fernández", "López", "Martínez"];

/// (species, breeds, pet names)
const SPECIES: &[(&str, &[&str], &[&str])] = &[
    ("dog", &["Labrador", "Beagle", "Mixed"], &["Rex", "Toby", "Lola", "Max"]),
    ("cat", &["Siamese", "Persian", "Mixed"], &["Luna", "Michi", "Simba"]),
    ("bird", &["Canary", "Parakeet"], &["Piolín", "Kiwi"]),
];

const SUPPLIERS: &[&str] = &["PetFood Distribuidora", "VetPharma", "Animal Supplies Co"];

/// What a seed run created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    pub products: usize,
    pub clients: usize,
    pub pets: usize,
    pub suppliers: usize,
    pub restocks: usize,
    pub sales: usize,
    pub payments: usize,
    pub treatments: usize,
    pub appointments: usize,
}

/// Seeds `client_count` owners and everything around them.
///
/// Returns `None` without writing when the catalog is not empty.
pub async fn seed_demo(db: &Database, client_count: usize) -> DbResult<Option<SeedSummary>> {
    let existing = db.products().count().await?;
    if existing > 0 {
        info!(existing, "Store already has products, skipping seed");
        return Ok(None);
    }

    let mut summary = SeedSummary::default();

    let mut stock_products = Vec::new();
    let mut services = Vec::new();
    for (category, items) in CATALOG {
        for (name, price, is_service) in items.iter() {
            let mut product = Product::new(*name, *category, *price);
            product.cost_cents = price * 60 / 100;
            product.is_service = *is_service;
            if !is_service {
                product.min_stock = vetpos_core::DEFAULT_LOW_STOCK_THRESHOLD;
                product.stock = (summary.products as i64 * 7) % 12;
            }
            db.products().insert(&product).await?;
            summary.products += 1;

            if product.is_service {
                services.push(product);
            } else {
                stock_products.push(product);
            }
        }
    }

    let mut suppliers = Vec::new();
    for (i, name) in SUPPLIERS.iter().enumerate() {
        let mut supplier = Supplier::new(*name);
        supplier.phone = Some(format!("555-{:04}", 9000 + i));
        db.suppliers().insert(&supplier).await?;
        suppliers.push(supplier);
        summary.suppliers += 1;
    }

    // Each supplier delivers a slice of the stock catalog.
    for (i, supplier) in suppliers.iter().enumerate() {
        let lines: Vec<RestockLine> = stock_products
            .iter()
            .skip(i)
            .step_by(suppliers.len())
            .map(|p| RestockLine {
                product_id: p.id.clone(),
                quantity: 20,
                unit_cost_cents: p.cost_cents,
            })
            .collect();
        if lines.is_empty() {
            continue;
        }
        db.accounts()
            .receive_restock(&RestockRequest {
                supplier_id: supplier.id.clone(),
                lines,
                is_paid: i % 2 == 0,
                notes: None,
            })
            .await?;
        summary.restocks += 1;
    }

    let now = vetpos_core::now();
    let tomorrow_9am = (now + Duration::days(1))
        .with_hour(9)
        .and_then(|d| d.with_minute(0))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(now);

    for i in 0..client_count {
        let first = FIRST_NAMES[i % FIRST_NAMES.len()];
        let last = LAST_NAMES[(i / FIRST_NAMES.len() + i) % LAST_NAMES.len()];
        let mut client = Client::new(format!("{first} {last}"));
        client.phone = Some(format!("555-{:04}", 1000 + i));
        if i % 3 == 0 {
            client.email = Some(format!(
                "{}.{}{}@example.com",
                first.to_lowercase(),
                last.to_lowercase(),
                i
            ));
        }
        db.clients().insert(&client).await?;
        summary.clients += 1;

        let (species, breeds, names) = SPECIES[i % SPECIES.len()];
        let mut pet = Pet::new(names[i % names.len()], species, &client.id);
        pet.breed = Some(breeds[i % breeds.len()].to_string());
        pet.birth_date = Some(now - Duration::days(200 + (i as i64 * 97) % 3000));
        db.pets().insert(&pet).await?;
        summary.pets += 1;

        let service = &services[i % services.len()];
        let treatment = Treatment {
            id: vetpos_core::new_id(),
            pet_id: pet.id.clone(),
            product_id: Some(service.id.clone()),
            date: now - Duration::days((i as i64 % 30) + 1),
            description: service.name.clone(),
            diagnosis: (i % 4 == 0).then(|| "Healthy".to_string()),
            cost_cents: service.price_cents,
            next_visit: Some(now + Duration::days(180)),
        };
        db.treatments().insert(&treatment).await?;
        summary.treatments += 1;

        let appointment = Appointment {
            id: vetpos_core::new_id(),
            client_id: client.id.clone(),
            pet_id: pet.id.clone(),
            date: tomorrow_9am + Duration::days(i as i64 % 7) + Duration::minutes(30 * (i as i64 % 16)),
            reason: "Checkup".to_string(),
            status: AppointmentStatus::Scheduled,
        };
        db.appointments().insert(&appointment).await?;
        summary.appointments += 1;

        // Every third owner buys on credit, the rest pay cash.
        let product = &stock_products[i % stock_products.len()];
        let on_credit = i % 3 == 1;
        let total = product.price_cents + service.price_cents;
        let request = CheckoutRequest {
            client_id: Some(client.id.clone()),
            lines: vec![
                CheckoutLine {
                    product_id: product.id.clone(),
                    quantity: 1,
                    unit_price_cents: product.price_cents,
                },
                CheckoutLine {
                    product_id: service.id.clone(),
                    quantity: 1,
                    unit_price_cents: service.price_cents,
                },
            ],
            payment_method: if on_credit {
                PaymentMethod::Credit
            } else {
                PaymentMethod::Cash
            },
            amount_paid_cents: if on_credit { 0 } else { total },
            notes: None,
        };
        db.checkout().checkout(&request).await?;
        summary.sales += 1;

        if on_credit && i % 2 == 1 {
            db.accounts()
                .record_payment(&client.id, total / 2, PaymentMethod::Cash, None)
                .await?;
            summary.payments += 1;
        }
    }

    info!(
        products = summary.products,
        clients = summary.clients,
        sales = summary.sales,
        "Demo data seeded"
    );
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;

    #[tokio::test]
    async fn test_seed_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let summary = seed_demo(&db, 8).await.unwrap().unwrap();
        assert_eq!(summary.clients, 8);
        assert_eq!(db.pets().count().await.unwrap(), 8);
        assert_eq!(db.sales().count().await.unwrap(), 8);
        assert!(!db.clients().with_debt().await.unwrap().is_empty());

        assert!(seed_demo(&db, 8).await.unwrap().is_none());
    }
}
