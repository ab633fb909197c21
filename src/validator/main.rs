//! Standalone validator for accounts configuration files.
//!
//! Checks the accounts file of the farming bot for structural problems,
//! invalid proxies and inconsistent pacing before the bot is started.

use std::process::ExitCode;

use clap::Parser;

use blum_farm_bot::action::ActionKind;
use blum_farm_bot::config::FarmConfig;

/// Accounts configuration validator.
#[derive(Parser, Debug)]
#[command(name = "validate_accounts")]
#[command(about = "Validates accounts configuration files for the Blum farming bot")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file to validate.
    #[arg(short, long, default_value = "accounts.json")]
    file: String,

    /// Generate an example configuration file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show detailed information for each account and the pacing table.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    validate_config(&args.file, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = FarmConfig::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example configuration written to: {output_path}");
            println!("\nThe file contains {} example accounts.", example.accounts.len());
            println!("Remove the proxy block of accounts that connect directly.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_config(path: &str, verbose: bool) -> ExitCode {
    println!("Validating: {path}\n");

    let config = match FarmConfig::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let results = config.validate_all();
    let mut errors = 0;
    let mut warnings = 0;

    for (i, result) in results.iter().enumerate() {
        let label = config
            .accounts
            .get(i)
            .map_or_else(|| "pacing".to_owned(), |a| format!("[{}] {}", i, a.name));

        if verbose && let Some(account) = config.accounts.get(i) {
            println!(
                "{label} (proxy: {}, session: {})",
                account.proxy.as_ref().map_or_else(|| "none".to_owned(), |p| p.url()),
                config.session_path(&account.name).display()
            );
        } else if verbose {
            println!("{label}");
        }

        match result {
            Ok(()) => {
                let missing_device = config
                    .accounts
                    .get(i)
                    .is_some_and(|a| a.user_agent.is_none() || a.device_model.is_none());
                if missing_device {
                    warnings += 1;
                    if verbose {
                        println!("  ⚠ Warning: device profile will be generated on first start");
                    }
                } else if verbose {
                    println!("  ✓ OK");
                }
            }
            Err(e) => {
                errors += 1;
                println!("  ✗ Error in {label}: {e}");
            }
        }
    }

    println!();

    if errors == 0 {
        println!("✓ All {} accounts are valid!", config.accounts.len());

        if warnings > 0 {
            println!("  ({warnings} warning(s) - accounts without a device profile)");
        }

        if verbose {
            print_pacing(&config);
        }

        ExitCode::SUCCESS
    } else {
        println!("✗ Validation failed: {errors} error(s)");
        ExitCode::FAILURE
    }
}

fn print_pacing(config: &FarmConfig) {
    let pacing = &config.pacing;
    println!("\nPacing:");
    for kind in ActionKind::ALL {
        let action = pacing.actions.get(kind);
        println!(
            "  {:<18} cooldown {:>6}s, jitter {}..{}s",
            kind.to_string(),
            action.cooldown_secs,
            action.jitter.min_secs,
            action.jitter.max_secs
        );
    }
    println!(
        "  startup jitter     {}..{}s",
        pacing.startup_jitter.min_secs, pacing.startup_jitter.max_secs
    );
    println!("  request timeout    {}s", pacing.request_timeout_secs);
    println!("  shutdown grace     {}s", pacing.shutdown_grace_secs);
}
