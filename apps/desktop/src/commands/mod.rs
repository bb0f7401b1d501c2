//! # Commands Module
//!
//! Every operation a screen can trigger.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs          ◄─── You are here (exports)
//! ├── product.rs      ◄─── Inventory: search, CRUD, categories, low stock
//! ├── client.rs       ◄─── Clients, debt payments, history
//! ├── pet.rs          ◄─── Pets and their treatments
//! ├── appointment.rs  ◄─── Calendar
//! ├── supplier.rs     ◄─── Suppliers, restock deliveries, supplier payments
//! ├── cart.rs         ◄─── Cart manipulation
//! ├── sale.rs         ◄─── Checkout, sale history, sale reversal
//! ├── report.rs       ◄─── Reports and cash book
//! ├── backup.rs       ◄─── Export / import of the whole store
//! └── config.rs       ◄─── Configuration retrieval
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Screen                                                                 │
//! │    │  search_products(&db, "kibble")                                   │
//! │    ▼                                                                    │
//! │  async fn search_products(                                              │
//! │      db: &DbState,            ◄── only the state it needs              │
//! │      query: &str,                                                       │
//! │  ) -> Result<Vec<ProductDto>, ApiError>                                 │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  DTOs serialize camelCase; every failure is an ApiError                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backup commands are the exception: they always return a
//! [`backup::BackupReport`] describing success or failure.

pub mod appointment;
pub mod backup;
pub mod cart;
pub mod client;
pub mod config;
pub mod pet;
pub mod product;
pub mod report;
pub mod sale;
pub mod supplier;
