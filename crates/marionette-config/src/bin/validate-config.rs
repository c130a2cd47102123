//! Config validation CLI tool
//!
//! Validates a marionette schedule file and reports any errors.

use marionette_config::ConfigError;
use marionette_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a marionette schedule file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match marionette_config::load_config(&config_path) {
        Ok(book) => {
            let settings = book.settings();
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", marionette_config::CURRENT_CONFIG_VERSION);
            println!("  Schedules: {}", book.len());
            println!("  Built-in schedules: {}", settings.default_schedules);
            if settings.ignore_schedules {
                println!("  Note: ignore_schedules is set; every schedule is always due");
            }

            if !book.is_empty() {
                println!();
                println!("Schedules:");
                for schedule in book.iter() {
                    println!("  - {}", schedule);
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        marionette_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
