//! # VetPOS Desktop Library
//!
//! Application shell for the VetPOS clinic point of sale. Screens call the
//! functions in [`commands`]; the `vetpos` binary drives the same commands
//! from the command line.
//!
//! ## Module Organization
//! ```text
//! vetpos_desktop_lib/
//! ├── lib.rs          ◄─── You are here (logging, startup & run)
//! ├── cli.rs          ◄─── Argument parsing and command-line output
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cart.rs     ◄─── Cart state management
//! │   ├── config.rs   ◄─── Configuration loading
//! │   ├── live.rs     ◄─── Queries that re-run when their tables change
//! │   └── ui.rs       ◄─── Screen state reducers
//! ├── commands/
//! │   ├── product.rs  ◄─── Inventory
//! │   ├── client.rs   ◄─── Clients, debts and payments
//! │   ├── pet.rs      ◄─── Pets and treatments
//! │   ├── appointment.rs
//! │   ├── supplier.rs ◄─── Suppliers and restocks
//! │   ├── cart.rs     ◄─── Cart manipulation
//! │   ├── sale.rs     ◄─── Checkout and sale history
//! │   ├── report.rs   ◄─── Reports and cash book
//! │   ├── backup.rs   ◄─── ZIP export / import
//! │   └── config.rs
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management (Multiple State Types)
//! Instead of a single `AppState` struct, each command takes only the state
//! it needs:
//!
//! ```text
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐
//! │    DbState       │ │    CartState     │ │    AppConfig         │
//! │                  │ │                  │ │                      │
//! │  • Database pool │ │  • Current cart  │ │  • Clinic name       │
//! │  • Repositories  │ │  • Payment       │ │  • Currency symbol   │
//! │  • Change feed   │ │  • Totals        │ │  • Report defaults   │
//! └──────────────────┘ └──────────────────┘ └──────────────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod state;

use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Command, Invocation};
use error::ApiError;
use state::{AppConfig, DbState};
use vetpos_db::{Database, DbConfig};

/// Runs the `vetpos` binary.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging (stderr, RUST_LOG overrides the default filter)  │
/// │  2. Parse Arguments (bad arguments exit with status 2)                  │
/// │  3. Load Configuration (defaults → vetpos.toml → VETPOS_* env)          │
/// │  4. Open Store (SQLite, WAL mode, pending migrations applied)           │
/// │  5. Run Command                                                         │
/// │  6. Close Store                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn run() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match cli::parse(&args) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("error: {}\n\n{}", message, cli::USAGE);
            return ExitCode::from(2);
        }
    };

    if invocation.command == Command::Help {
        println!("{}", cli::USAGE);
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: could not start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(start(invocation)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(code = ?e.code, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn start(invocation: Invocation) -> Result<bool, ApiError> {
    info!("Starting VetPOS");

    let config = AppConfig::load(invocation.config.as_deref())?;
    let db_path = config.resolve_database_path()?;
    info!(?db_path, clinic = %config.clinic_name, "Configuration loaded");

    let db = Database::new(DbConfig::new(db_path)).await?;
    info!("Database connected and migrations applied");

    let state = DbState::new(db);
    let outcome = cli::execute(&invocation.command, &state, &config).await;
    state.inner().close().await;
    outcome
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so command output on stdout stays clean.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=vetpos_db=trace` - Show trace for the store only
/// - Default: INFO, DEBUG for vetpos crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vetpos_core=debug,vetpos_db=debug,vetpos_desktop_lib=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
