//! Security audit assistant CLI
//!
//! Wires the client stack together for one command:
//! 1. Loads configuration (file, env overrides)
//! 2. Restores the session from the token file
//! 3. Runs the subcommand through the domain API
//! 4. Prints the result as JSON on stdout, or the normalized error on stderr

mod cli;
mod commands;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use audit_api::AuditApi;
use audit_auth::{Session, SessionStatus, TokenStore};
use audit_client::{ApiClient, HttpClient, normalize_dyn, normalize_panic};
use clap::Parser;
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json);

    // The command runs on its own task so a panic is reported like any
    // other failure.
    let normalized = match tokio::spawn(run(cli)).await {
        Ok(Ok(output)) => {
            println!("{}", pretty(&output));
            return ExitCode::SUCCESS;
        }
        Ok(Err(e)) => {
            let source: &(dyn std::error::Error + 'static) = e.as_ref();
            let normalized = normalize_dyn(source);
            warn!(code = normalized.code.as_str(), error = %format!("{e:#}"), "command failed");
            normalized
        }
        Err(join) if join.is_panic() => {
            error!("command panicked");
            normalize_panic(join.into_panic().as_ref())
        }
        Err(join) => {
            error!(error = %join, "command task was cancelled");
            normalize_panic(&join.to_string())
        }
    };

    match serde_json::to_value(&normalized) {
        Ok(value) => eprintln!("{}", pretty(&value)),
        Err(_) => eprintln!("{}", normalized.message),
    }
    ExitCode::FAILURE
}

/// Logs go to stderr so stdout stays machine readable.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<Value> {
    let config = Config::load_resolved(cli.config.as_deref())
        .context("failed to load configuration")?;
    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        "configuration loaded"
    );

    let token_file = config.token_file();
    let store = TokenStore::load(token_file.clone())
        .await
        .with_context(|| format!("failed to open token file {}", token_file.display()))?;
    let session = Arc::new(Session::restore(Arc::new(store)).await);

    let core = HttpClient::new(config.client_config(), session.clone())
        .context("failed to build HTTP client")?;
    let api = AuditApi::new(
        ApiClient::new(Arc::new(core), config.retry_policy()),
        &config.presets(),
    );

    let status_before = session.status();
    info!(command = cli.command.name(), "running command");
    let result = commands::execute(&api, cli.command).await;

    if session.status() == SessionStatus::Expired && status_before != SessionStatus::Expired {
        eprintln!("Session expired, please log in again");
    }

    Ok(result?)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
