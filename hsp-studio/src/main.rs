//! hsp-studio - Hit song popularity scoring
//!
//! `serve` (default) runs the HTTP scoring service; `score` scores a CSV file
//! offline with the same model and encoder.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hsp_common::config::{resolve_model_path, TomlConfig};
use hsp_common::Predictor;
use hsp_studio::{build_router, score, AppState, DEFAULT_PORT};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither RUST_LOG nor the config file sets one
const DEFAULT_LOG_FILTER: &str = "hsp_studio=info,hsp_common=info,tower_http=info";

/// Command-line arguments for hsp-studio
#[derive(Parser, Debug)]
#[command(name = "hsp-studio")]
#[command(about = "Hit song popularity scoring service")]
#[command(version)]
struct Args {
    /// Model artifact (JSON)
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Configuration file (default: <config_dir>/hsp/config.toml)
    #[arg(short, long, global = true, env = "HSP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP scoring service
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "HSP_STUDIO_PORT")]
        port: Option<u16>,
    },
    /// Score a CSV file and write it sorted by predicted score
    Score {
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let (filter, filter_handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting HSP Studio (hsp-studio) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref());

    // RUST_LOG wins over the config file
    if std::env::var_os("RUST_LOG").is_none() {
        if let Some(level) = &config.log_level {
            filter_handle
                .reload(EnvFilter::new(level))
                .context("Failed to apply log level from config")?;
        }
    }

    let model_path = resolve_model_path(args.model.as_deref(), &config);
    info!("Model artifact: {}", model_path.display());

    let predictor = Predictor::load(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?
        .with_batch_columns(config.batch.clone());
    info!(
        "Model '{}' ready with {} features",
        predictor.model_name(),
        predictor.schema().len()
    );

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            let port = port.or(config.port).unwrap_or(DEFAULT_PORT);
            serve(Arc::new(predictor), port).await
        }
        Command::Score { input, output } => {
            let report = score::score_file(&predictor, &input, output.as_deref())
                .with_context(|| format!("Failed to score {}", input.display()))?;
            if report.degraded_cells > 0 {
                info!("{} malformed cells were scored as 0", report.degraded_cells);
            }
            Ok(())
        }
    }
}

async fn serve(predictor: Arc<Predictor>, port: u16) -> Result<()> {
    let app = build_router(AppState::new(predictor));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("hsp-studio listening on http://{}", addr);
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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
