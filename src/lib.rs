pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod security;
pub mod state;

use std::sync::Arc;

pub use config::Config;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "-s" | "--serve" => run_server(config).await,

        "generate-key" => {
            cmd_generate_key();
            Ok(())
        }

        "prune-logs" => {
            let days = args
                .get(2)
                .and_then(|s| s.parse().ok())
                .unwrap_or(config.security.access_log_retention_days);
            cmd_prune_logs(&config, days).await
        }

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Moustass Web - encrypted voice and financial notes API");
    println!();
    println!("USAGE:");
    println!("  moustass-web <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  serve             Run the HTTP API server");
    println!("  generate-key      Generate a base64 encryption key for .env");
    println!("  prune-logs [n]    Delete access-log entries older than n days");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml for ports and database path.");
    println!("  Secrets come from the environment (or a local .env file):");
    println!("    MOUSTASS_ENCRYPTION_KEY   base64, 32 bytes");
    println!("    MOUSTASS_JWT_SECRET       token signing secret");
}

fn cmd_generate_key() {
    let key = crate::security::EncryptionKey::generate_base64();
    println!("Generated encryption key:");
    println!("{key}");
    println!();
    println!("Add this line to your .env file:");
    println!("MOUSTASS_ENCRYPTION_KEY={key}");
}

async fn cmd_prune_logs(config: &Config, days: i64) -> anyhow::Result<()> {
    let store = db::Store::new(&config.general.database_path).await?;
    let removed = store.prune_access_logs(days).await?;
    println!("✓ Removed {removed} access-log entries older than {days} days");
    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!(
        "Moustass Web v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let port = config.server.port;

    let shared = Arc::new(SharedState::new(config).await?);
    let state = api::create_app_state(shared).await?;

    let app = api::router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {e}"),
    }
}
