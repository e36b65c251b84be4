//! # Cmdgate Configuration Validator
//!
//! Command-line tool for loading and validating the pipeline configuration of
//! an environment before deploying it.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cmdgate_core::config::{CmdgateConfig, ConfigManager};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate cmdgate configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment whose override file is applied (development, test, production)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory (default: CMDGATE_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, merge and validate the configuration
    Validate,

    /// Print the merged configuration
    Show,

    /// List environments that have an override file
    Environments,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::Validate) | None => validate(&cli),
        Some(Commands::Show) => show(&cli),
        Some(Commands::Environments) => list_environments(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration check completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration check failed: {e:#}");
            println!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<std::sync::Arc<ConfigManager>> {
    ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
        .with_context(|| format!("loading configuration for environment '{}'", cli.environment))
}

fn validate(cli: &Cli) -> Result<()> {
    let manager = load(cli)?;
    let config = manager.config();

    match cli.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "valid": true,
                "environment": manager.environment(),
                "config_directory": manager.config_directory().display().to_string(),
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("🔧 Validating cmdgate configuration");
            println!("Environment: {}", manager.environment());
            println!("Config Directory: {}", manager.config_directory().display());
            println!();
            print_summary(config);
            println!();
            println!("✅ Configuration is valid");
        }
    }
    Ok(())
}

fn show(cli: &Cli) -> Result<()> {
    let manager = load(cli)?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(manager.config())?),
        OutputFormat::Text => println!("{:#?}", manager.config()),
    }
    Ok(())
}

fn print_summary(config: &CmdgateConfig) {
    println!("📋 Retry");
    println!("   max_attempts: {}", config.retry.max_attempts);
    println!(
        "   backoff: {}ms -> {}ms (jitter {})",
        config.retry.base_delay_ms,
        config.retry.max_delay_ms,
        if config.retry.jitter_enabled { "on" } else { "off" }
    );
    println!("📋 Idempotency");
    println!("   ttl: {}s, sweep every {}s", config.idempotency.ttl_seconds, config.idempotency.sweep_interval_seconds);
    println!("📋 Execution");
    println!("   command timeout: {}ms", config.execution.command_timeout_ms);
    println!("📋 Connection");
    println!(
        "   probe every {}ms, timeout {}ms",
        config.connection.probe_interval_ms, config.connection.probe_timeout_ms
    );
    println!("📋 Business");
    println!("   max banners per rest point: {}", config.business.max_banners_per_rest_point);
    println!("   max image bytes: {}", config.business.max_image_bytes);
    println!("   allowed image types: {}", config.business.allowed_image_types.join(", "));
}

fn list_environments(cli: &Cli) -> Result<()> {
    let dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(std::env::var("CMDGATE_CONFIG_DIR").unwrap_or_else(|_| "config".to_string())));
    let environments = environments_in(&dir)?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&environments)?),
        OutputFormat::Text => {
            println!("📁 Environments in {}", dir.display());
            if environments.is_empty() {
                println!("   (none, only base configuration)");
            }
            for environment in environments {
                println!("   - {environment}");
            }
        }
    }
    Ok(())
}

fn environments_in(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        bail!("configuration directory not found: {}", dir.display());
    }

    let mut environments: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.strip_prefix("cmdgate.")
                .and_then(|rest| rest.strip_suffix(".toml"))
                .filter(|env| !env.is_empty())
                .map(str::to_string)
        })
        .collect();
    environments.sort();
    Ok(environments)
}
