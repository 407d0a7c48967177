//! pronounce-api - Pronunciation Assessment Microservice
//!
//! **Module Identity:**
//! - Name: pronounce-api
//! - Default port: 5730
//!
//! Accepts a spoken recording plus reference text, runs Word, Syllable and
//! Phoneme assessment passes against Azure Speech and returns one merged
//! report.

use anyhow::{Context, Result};
use clap::Parser;
use pronounce_common::config::{self, CliOverrides, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pronounce_api::services::{AudioStager, AzureSpeechClient};
use pronounce_api::AppState;

/// Command-line arguments for pronounce-api
#[derive(Parser, Debug)]
#[command(name = "pronounce-api")]
#[command(about = "Pronunciation assessment microservice")]
#[command(version)]
struct Args {
    /// Interface to bind
    #[arg(short, long, env = "PRONOUNCE_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PRONOUNCE_PORT")]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long, env = "PRONOUNCE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for staged uploads
    #[arg(long, env = "PRONOUNCE_STAGING_DIR")]
    staging_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(config::default_config_path);
    let toml_config = match &config_path {
        Some(path) => config::load_toml_config(path)?,
        None => config::TomlConfig::default(),
    };

    let service_config = ServiceConfig::resolve(
        CliOverrides {
            bind_address: args.bind,
            port: args.port,
            staging_dir: args.staging_dir,
        },
        toml_config,
        config::speech_credentials_from_env(),
    );

    // RUST_LOG wins over the TOML level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "pronounce_api={level},pronounce_common={level},tower_http={level}",
                    level = service_config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pronounce-api (Pronunciation Assessment) microservice");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_path {
        Some(path) if path.exists() => info!("Loaded configuration from {}", path.display()),
        Some(path) => warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        ),
        None => warn!("No config directory available, using built-in defaults"),
    }

    if service_config.speech.credentials.is_none() {
        warn!(
            "{} / {} not set: every assessment request will fail until they are configured",
            config::SPEECH_KEY_ENV,
            config::SPEECH_REGION_ENV
        );
    }

    service_config
        .ensure_staging_dir()
        .context("Failed to prepare staging directory")?;

    let client = AzureSpeechClient::new(&service_config.speech)
        .context("Failed to build speech service HTTP client")?;
    let stager = AudioStager::new(service_config.staging_dir.clone());
    let state = AppState::new(Arc::new(client), stager)
        .with_max_upload_bytes(service_config.max_upload_bytes);

    let app = pronounce_api::build_router(state);

    let addr = service_config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
