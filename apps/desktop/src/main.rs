//! # VetPOS Entry Point
//!
//! ```text
//! main.rs ────► lib.rs::run ────► cli::parse
//!                                    │
//!                                    ▼
//!                AppConfig::load ─► Database::new ─► cli::execute
//! ```
//!
//! The actual setup lives in lib.rs so it can be tested.

use std::process::ExitCode;

fn main() -> ExitCode {
    vetpos_desktop_lib::run()
}
