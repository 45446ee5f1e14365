//! Config validation CLI tool
//!
//! Validates a ledger configuration file and reports any errors.

use frigo_util::default_config_path;
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
            eprintln!("Validates a frigorifico configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match frigo_config::load_config(&config_path) {
        Ok(config) => {
            let settings = &config.settings;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", frigo_config::CURRENT_CONFIG_VERSION);
            println!("  Data dir: {}", settings.data_dir.display());
            println!("  Currency: {}", settings.currency);
            println!(
                "  Log caps: actions {}, payments {}, logins {}",
                settings.action_log_cap, settings.payment_log_cap, settings.login_history_cap
            );

            println!();
            println!("Admins ({}):", config.admins.len());
            for admin in &config.admins {
                println!(
                    "  - {} ({}): {}",
                    admin.username, admin.display_name, admin.permissions
                );
            }

            println!();
            println!("Delivery managers ({}):", config.managers.len());
            for manager in &config.managers {
                println!("  - {} ({})", manager.username, manager.display_name);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                frigo_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                frigo_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                frigo_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                frigo_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        frigo_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
