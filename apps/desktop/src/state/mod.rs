//! # State Module
//!
//! Application state for the clinic shell.
//!
//! Each concern gets its own state type so commands declare exactly what
//! they touch:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐              │
//! │  │   DbState    │  │  CartState   │  │   AppConfig      │              │
//! │  │              │  │              │  │                  │              │
//! │  │  Database    │  │  Arc<Mutex<  │  │  clinic_name     │              │
//! │  │  (SQLite     │  │    Cart      │  │  currency        │              │
//! │  │   pool)      │  │  >>          │  │  thresholds      │              │
//! │  └──────┬───────┘  └──────────────┘  └──────────────────┘              │
//! │         │ StoreChange (broadcast)                                       │
//! │         ▼                                                               │
//! │  ┌──────────────┐        ┌──────────────────────────────────┐          │
//! │  │  LiveQuery   │──────► │  Screen state (pure reducers)    │          │
//! │  │  (watch)     │ rows   │  inventory, clients, calendar,   │          │
//! │  └──────────────┘        │  reports, backup                 │          │
//! │                          └──────────────────────────────────┘          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • CartState: Protected by Arc<Mutex<T>> for exclusive access          │
//! │  • AppConfig: Read-only after initialization                           │
//! │  • Screen state: plain values, replaced by reducers                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;
mod db;
pub mod live;
pub mod ui;

pub use cart::{Cart, CartItem, CartState, CartTotals};
pub use config::{default_config_file, AppConfig, ConfigError};
pub use db::DbState;
pub use live::LiveQuery;
