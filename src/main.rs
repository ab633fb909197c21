//! Blum Farm Bot - Main Entry Point
//!
//! Runs the mini-app farming actions for every configured account until
//! interrupted.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dialoguer::{Input, Password};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use blum_farm_bot::blum::BlumConnector;
use blum_farm_bot::config::{FarmConfig, TelegramConfig};
use blum_farm_bot::scheduler::{Orchestrator, SessionEvent, WorkerExit};
use blum_farm_bot::telegram::{TelegramError, TelegramSession, mask_phone};

/// Multi-account farming bot for the Blum mini-app.
#[derive(Parser, Debug)]
#[command(name = "blum_bot")]
#[command(about = "Automate the Blum mini-app for several Telegram accounts")]
#[command(version)]
struct Args {
    /// Path to the accounts JSON configuration file.
    #[arg(short, long, default_value = "accounts.json")]
    config: String,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Generate an example configuration file and exit.
    #[arg(long)]
    generate_config: bool,

    /// Sign the named account in to Telegram and exit.
    #[arg(long, value_name = "ACCOUNT")]
    login: Option<String>,

    /// Seed for reproducible schedules (account i uses SEED + i).
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if args.generate_config {
        return generate_example_config();
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut config = FarmConfig::load_from_file(&args.config)
        .context("Failed to load accounts configuration")?;
    config
        .validate()
        .context("Accounts configuration validation failed")?;

    let generated = config.fill_missing_devices(&mut rand::thread_rng());
    if generated > 0 {
        config
            .save_to_file(&args.config)
            .context("Failed to save generated device profiles")?;
        info!("Generated device profiles for {} account(s)", generated);
    }

    if let Some(name) = &args.login {
        return login(&config, &tg_config, name).await;
    }

    info!(
        "Loaded {} account(s), sessions in {}",
        config.accounts.len(),
        config.sessions_dir.display()
    );

    let pacing = Arc::new(config.pacing.clone());
    let connector = BlumConnector::new(tg_config, config.sessions_dir.clone(), Arc::clone(&pacing));

    let mut orchestrator = Orchestrator::new(connector, pacing).with_seed(args.seed);
    orchestrator.start(config.accounts.iter().cloned());

    let authenticated = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C during authentication, shutting down...");
            orchestrator.shutdown().await;
            return Ok(());
        }
        count = orchestrator.wait_for_authentication() => count,
    };
    if authenticated == 0 {
        orchestrator.shutdown().await;
        bail!("No session could authenticate");
    }
    info!(
        "{} of {} session(s) authenticated. Use Ctrl+C to stop.",
        authenticated,
        config.accounts.len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            event = orchestrator.next_event() => {
                let Some(event) = event else { break };
                log_event(&event);
                if orchestrator.active() == 0 {
                    warn!("No session is running any more");
                    break;
                }
            }
        }
    }

    let reports = orchestrator.shutdown().await;
    for report in &reports {
        info!(
            "{}: {:?} after {} action(s), balance {:.2}, {} ticket(s)",
            report.name, report.exit, report.actions_run, report.state.balance, report.state.tickets
        );
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Authenticated { name } => debug!("Session '{}' authenticated", name),
        SessionEvent::AuthFailed { name, error } => {
            error!("Session '{}' failed to authenticate: {}", name, error);
        }
        SessionEvent::Restarted { name, attempt } => {
            warn!("Session '{}' restarted (attempt {})", name, attempt);
        }
        SessionEvent::Terminated { name, exit } => match exit {
            WorkerExit::Fatal(e) => error!("Session '{}' stopped: {}", name, e),
            other => info!("Session '{}' stopped: {:?}", name, other),
        },
    }
}

/// Generates an example configuration file.
fn generate_example_config() -> Result<()> {
    let example = FarmConfig::example();
    example.save_to_file("accounts.example.json")?;

    println!("✓ Example configuration written to: accounts.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy accounts.example.json to accounts.json");
    println!("2. List your accounts and their proxies");
    println!("3. Create a .env file with TG_API_ID and TG_API_HASH");
    println!("4. Run: blum_bot --login <account> for each account");
    println!("5. Run: blum_bot");

    Ok(())
}

/// Signs `name` in to Telegram interactively.
async fn login(config: &FarmConfig, tg_config: &TelegramConfig, name: &str) -> Result<()> {
    let Some(account) = config.account(name) else {
        bail!("Account '{name}' is not in the configuration");
    };

    let session = TelegramSession::connect(
        tg_config,
        &config.session_path(name),
        account.device_model.as_deref(),
    )
    .await
        .context("Failed to connect to Telegram")?;

    let result = authenticate(&session, tg_config, account.phone_number.as_deref()).await;
    session.disconnect();
    result
}

/// Wrong two-step passwords accepted before giving up.
const PASSWORD_ATTEMPTS: u32 = 3;

/// Runs the phone-code login, then the two-step password if needed.
async fn authenticate(
    session: &TelegramSession,
    config: &TelegramConfig,
    phone: Option<&str>,
) -> Result<()> {
    if session.is_authorized().await.context("Failed to check authorization")? {
        info!("Session is already signed in");
        return Ok(());
    }

    let phone = match phone {
        Some(phone) => {
            info!("Signing in {}", mask_phone(phone));
            phone.to_owned()
        }
        None => Input::<String>::new()
            .with_prompt("Phone number (international format)")
            .interact_text()?,
    };

    let token = session
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    let code: String = Input::new()
        .with_prompt("Code from the Telegram app")
        .interact_text()?;

    let mut token = match session.sign_in(&token, &code).await {
        Ok(()) => return Ok(()),
        Err(TelegramError::PasswordRequired(token)) => token,
        Err(e) => return Err(e).context("Sign in failed"),
    };

    for attempt in 1..=PASSWORD_ATTEMPTS {
        let prompt = match token.hint() {
            Some(hint) => format!("Two-step password (hint: {hint})"),
            None => "Two-step password".to_owned(),
        };
        let password = Password::new().with_prompt(prompt).interact()?;

        match session.check_password(token, &password).await {
            Ok(()) => return Ok(()),
            Err(TelegramError::InvalidPassword(retry)) if attempt < PASSWORD_ATTEMPTS => {
                warn!("Wrong password, {} attempt(s) left", PASSWORD_ATTEMPTS - attempt);
                token = retry;
            }
            Err(e) => return Err(e).context("Two-step verification failed"),
        }
    }

    bail!("Two-step verification failed")
}
