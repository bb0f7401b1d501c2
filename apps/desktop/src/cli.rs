//! # Command Line
//!
//! The `vetpos` binary runs clinic maintenance tasks against the configured
//! store without opening any screen.
//!
//! ```text
//! vetpos [--config <file>] export [file.zip]
//! vetpos [--config <file>] import <file.zip>
//! vetpos [--config <file>] report [days]
//! vetpos [--config <file>] seed [count]
//! vetpos help
//! ```

use std::path::PathBuf;
use tracing::info;

use crate::commands;
use crate::error::ApiError;
use crate::state::{AppConfig, DbState};

pub const USAGE: &str = "\
VetPOS clinic store

Usage: vetpos [--config <FILE>] <COMMAND>

Commands:
  export [FILE]   Write a backup archive (default: vetpos-backup-<date>.zip)
  import <FILE>   Merge a backup archive into the store
  report [DAYS]   Print the sales report for the last DAYS days
  seed [COUNT]    Fill an empty store with a demo clinic (default: 20 clients)
  help            Show this message

Options:
  -c, --config <FILE>   Config file (default: vetpos.toml in the config dir)

Environment:
  VETPOS_DB_PATH, VETPOS_CLINIC_NAME, VETPOS_CURRENCY_SYMBOL,
  VETPOS_LOW_STOCK_THRESHOLD, RUST_LOG";

const DEFAULT_SEED_CLIENTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Export { path: Option<PathBuf> },
    Import { path: PathBuf },
    Report { days: Option<i64> },
    Seed { count: usize },
    Help,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub command: Command,
}

/// Parses the arguments after the program name.
pub fn parse(args: &[String]) -> Result<Invocation, String> {
    let mut config = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| "--config needs a file path".to_string())?;
                config = Some(PathBuf::from(value));
                i += 1;
            }
            "--help" | "-h" => positional.insert(0, "help"),
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("Unknown option '{}'", flag));
            }
            other => positional.push(other),
        }
        i += 1;
    }

    let (name, rest) = match positional.split_first() {
        Some((name, rest)) => (*name, rest),
        None => ("help", &[][..]),
    };
    if rest.len() > 1 {
        return Err(format!("Too many arguments for '{}'", name));
    }
    let arg = rest.first().copied();

    let command = match name {
        "export" => Command::Export {
            path: arg.map(PathBuf::from),
        },
        "import" => Command::Import {
            path: arg
                .map(PathBuf::from)
                .ok_or_else(|| "import needs a backup file".to_string())?,
        },
        "report" => Command::Report {
            days: arg
                .map(|d| match d.parse::<i64>() {
                    Ok(days) if days > 0 => Ok(days),
                    _ => Err(format!("'{}' is not a number of days", d)),
                })
                .transpose()?,
        },
        "seed" => Command::Seed {
            count: arg
                .map(|c| c.parse::<usize>().map_err(|_| format!("'{}' is not a client count", c)))
                .transpose()?
                .unwrap_or(DEFAULT_SEED_CLIENTS),
        },
        "help" => Command::Help,
        other => return Err(format!("Unknown command '{}'", other)),
    };

    Ok(Invocation { config, command })
}

/// Runs a command and prints its outcome. `Ok(false)` means the command
/// ran but reported a failure.
pub async fn execute(command: &Command, db: &DbState, config: &AppConfig) -> Result<bool, ApiError> {
    info!(?command, "Running command");

    match command {
        Command::Export { path } => {
            let path = path
                .clone()
                .unwrap_or_else(|| config.backup_file_for(chrono::Local::now().date_naive()));
            let report = commands::backup::export_backup(db, &path).await;
            Ok(print_backup_report(&report))
        }
        Command::Import { path } => {
            let report = commands::backup::import_backup(db, path).await;
            Ok(print_backup_report(&report))
        }
        Command::Report { days } => {
            let report = commands::report::recent_report(db, config, *days).await?;
            print_report(&report, config);
            Ok(true)
        }
        Command::Seed { count } => {
            match vetpos_db::seed_demo(db.inner(), *count).await? {
                Some(summary) => {
                    println!("✓ Demo clinic created");
                    println!("  Products:     {}", summary.products);
                    println!("  Suppliers:    {} ({} deliveries)", summary.suppliers, summary.restocks);
                    println!("  Clients:      {}", summary.clients);
                    println!("  Pets:         {}", summary.pets);
                    println!("  Sales:        {}", summary.sales);
                    println!("  Payments:     {}", summary.payments);
                    println!("  Treatments:   {}", summary.treatments);
                    println!("  Appointments: {}", summary.appointments);
                }
                None => println!("⚠ Store already has products, nothing seeded"),
            }
            Ok(true)
        }
        Command::Help => {
            println!("{}", USAGE);
            Ok(true)
        }
    }
}

fn print_backup_report(report: &commands::backup::BackupReport) -> bool {
    if !report.success {
        eprintln!("✗ {}", report.message);
        return false;
    }

    println!("✓ {}", report.message);
    for (table, rows) in &report.tables {
        println!("  {:<16} {:>6}", table.file_name(), rows);
    }
    true
}

fn print_report(report: &commands::report::ReportDto, config: &AppConfig) {
    let money = |cents: i64| config.format_currency(cents);

    println!("{}", config.clinic_name);
    for line in &config.clinic_address {
        println!("{}", line);
    }
    println!(
        "Report {} to {}",
        report.start.date_naive(),
        report.end.date_naive().pred_opt().unwrap_or(report.end.date_naive())
    );
    println!();
    println!("  Sales:           {}", report.sale_count);
    println!("  Revenue:         {}", money(report.revenue_cents));
    println!("  Collected:       {}", money(report.collected_cents));
    println!("  Left on credit:  {}", money(report.outstanding_cents));
    println!("  Average ticket:  {}", money(report.average_ticket_cents));
    println!("  Income:          {}", money(report.income_cents));
    println!("  Expenses:        {}", money(report.expense_cents));
    println!("  Net:             {}", money(report.net_cents));
    println!("  Client debt:     {}", money(report.total_debt_cents));

    if !report.top_products.is_empty() {
        println!();
        println!("Best sellers:");
        for (rank, p) in report.top_products.iter().enumerate() {
            println!("  {:>2}. {:<28} x{:<5} {}", rank + 1, p.name, p.quantity, money(p.revenue_cents));
        }
    }

    if !report.low_stock.is_empty() {
        println!();
        println!("Low stock:");
        for p in &report.low_stock {
            println!("  {:<32} {:>4} (min {})", p.name, p.stock, p.min_stock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse(&args("import backup.zip")).unwrap().command,
            Command::Import {
                path: PathBuf::from("backup.zip")
            }
        );
        assert_eq!(parse(&args("export")).unwrap().command, Command::Export { path: None });
        assert_eq!(parse(&args("report 7")).unwrap().command, Command::Report { days: Some(7) });
        assert_eq!(parse(&args("seed")).unwrap().command, Command::Seed { count: 20 });
        assert_eq!(parse(&[]).unwrap().command, Command::Help);
        assert_eq!(parse(&args("report --help")).unwrap().command, Command::Help);
    }

    #[test]
    fn test_parse_config_anywhere() {
        let invocation = parse(&args("seed 5 --config clinic.toml")).unwrap();
        assert_eq!(invocation.config, Some(PathBuf::from("clinic.toml")));
        assert_eq!(invocation.command, Command::Seed { count: 5 });
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&args("import")).is_err());
        assert!(parse(&args("report zero")).is_err());
        assert!(parse(&args("report 0")).is_err());
        assert!(parse(&args("export a.zip b.zip")).is_err());
        assert!(parse(&args("--config")).is_err());
        assert!(parse(&args("--verbose export")).is_err());
        assert!(parse(&args("restore x.zip")).is_err());
    }

    #[tokio::test]
    async fn test_execute_export_and_report() {
        let db = DbState::new(
            vetpos_db::Database::new(vetpos_db::DbConfig::in_memory())
                .await
                .unwrap(),
        );
        let config = AppConfig::default();

        assert!(execute(&Command::Seed { count: 3 }, &db, &config).await.unwrap());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        let ok = execute(&Command::Export { path: Some(path.clone()) }, &db, &config)
            .await
            .unwrap();
        assert!(ok);
        assert!(path.exists());

        assert!(execute(&Command::Report { days: Some(30) }, &db, &config).await.unwrap());

        let missing = dir.path().join("missing.zip");
        assert!(!execute(&Command::Import { path: missing }, &db, &config).await.unwrap());
    }
}
