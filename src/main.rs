mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// Use mimalloc so repeated browser sessions don't pin freed pages in RSS
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use autoreg_core::config::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    // One browser run at a time; a small worker pool is plenty
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Environment variable overrides for containerized deployments
    if let Ok(v) = std::env::var("TARGET_SITE_URL") {
        config.target.site_url = v;
    }
    if let Ok(v) = std::env::var("WEBDRIVER_URL") {
        config.webdriver.url = v;
    }
    if let Ok(v) = std::env::var("DUCKMAIL_BASE_URL") {
        config.mailbox.base_url = v;
    }
    if let Ok(v) = std::env::var("DUCKMAIL_DOMAIN") {
        config.mailbox.domain = v;
    }
    if let Ok(v) = std::env::var("DEFAULT_PASSWORD") {
        config.target.default_password = v;
    }
    if let Ok(v) = std::env::var("GLOBAL_TIMEOUT") {
        if let Ok(n) = v.parse::<u64>() {
            config.timeouts.global_secs = n;
        }
    }
    if let Ok(v) = std::env::var("EMAIL_POLL_INTERVAL") {
        if let Ok(n) = v.parse::<u64>() {
            config.mailbox.poll_interval_secs = n;
        }
    }
    if let Ok(v) = std::env::var("EMAIL_POLL_MAX_ATTEMPTS") {
        if let Ok(n) = v.parse::<u32>() {
            config.mailbox.poll_max_attempts = n;
        }
    }
    if let Ok(v) = std::env::var("HEADLESS") {
        config.webdriver.headless = v != "0" && v.to_lowercase() != "false";
    }

    match cli.command {
        Commands::Register {
            first_name,
            last_name,
            password,
            json,
        } => {
            commands::register::run(config, first_name, last_name, password, json).await?;
        }
        Commands::Login {
            email,
            password,
            json,
        } => {
            commands::login::run(config, email, password, json).await?;
        }
    }

    Ok(())
}
