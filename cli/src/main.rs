//! Recharge automation CLI
//!
//! Serves the REST API with the monthly schedule installed, or runs the
//! pipeline once for a given period and exits.
//!
//! ```sh
//! # Serve with the default config (~/.config/recharge/config.toml)
//! recharge
//!
//! # Custom config path and port
//! recharge --config /etc/recharge/config.toml --api-port 8080
//!
//! # Validate config without starting
//! recharge --check
//!
//! # Generate and send the March report now
//! recharge --period-start 2025-03-01 --period-end 2025-03-31
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info, warn};

use recharge::config::AppConfig;
use recharge::domain::Period;
use recharge::server::{init_tracing, run_once, ServerHandle, ServerOptions};

/// Monthly EV home-charging expense reports.
#[derive(Parser, Debug)]
#[command(
    name = "recharge",
    version,
    about = "Monthly EV charging expense report automation",
    long_about = "Fetches charging sessions, prices them with the quarterly regulated \
                  tariff, renders a PDF expense report and emails it.\n\n\
                  Default config: ~/.config/recharge/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "RECHARGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Run once for this period start (YYYY-MM-DD) instead of serving.
    #[arg(long, requires = "period_end")]
    period_start: Option<NaiveDate>,

    /// Inclusive period end (YYYY-MM-DD) of the one-shot run.
    #[arg(long, requires = "period_start")]
    period_end: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(recharge::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            eprintln!("Using default configuration.");
            AppConfig::default()
        }
    };
    config.apply_env_overrides();

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);
    info!("Configuration: {}", config_path.display());

    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        let defaults = config.automation_defaults();
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}:{}", config.server.api_host, config.server.api_port);
        println!("   Database    : {}", config.connection_url());
        println!("   Tariffs     : {}", config.storage.tariff_file().display());
        println!("   Reports     : {}", config.storage.output_dir().display());
        println!("   Schedule    : {} at {}", config.schedule.mode, config.schedule.time);
        println!("   Log level   : {}", config.logging.level);
        if defaults.client_id.is_empty() || defaults.smtp_server.is_empty() {
            println!("   ⚠️  Provider or SMTP defaults are empty; they must be stored via the API");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let options = ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    };

    // ── One-shot run ───────────────────────────────────────────
    if let (Some(start), Some(end)) = (cli.period_start, cli.period_end) {
        let period = Period::new(start, end)?;
        let outcome = run_once(options, period).await?;
        if outcome.success {
            info!(run_id = outcome.run_id, "✅ {}", outcome.message);
            println!("Run {} succeeded: {}", outcome.run_id, outcome.message);
            return Ok(ExitCode::SUCCESS);
        }
        warn!(run_id = outcome.run_id, "Run did not complete: {}", outcome.message);
        println!("Run {} did not complete: {}", outcome.run_id, outcome.message);
        return Ok(ExitCode::FAILURE);
    }

    // ── Serve ──────────────────────────────────────────────────
    let handle = ServerHandle::start(options).await?;
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(ExitCode::SUCCESS)
}
