mod challenge;
mod classify;
mod cli;
mod config;
mod dashboard;
mod error;
mod handlers;
mod models;
mod records;
mod service;
mod storage;
mod viewer;

use std::sync::Arc;
use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::challenge::ChallengeBook;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::service::FileHost;

pub struct AppState {
    pub host: FileHost,
    pub challenges: ChallengeBook,
    pub config: Config,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_upload_size = state.config.max_upload_size;

    Router::new()
        // Page shell and the sandboxed page viewer
        .merge(dashboard::routes())
        .merge(viewer::routes())
        // JSON API used by the page shell
        .nest("/api", handlers::api_routes(max_upload_size))
        // Public object URLs (wildcard, top level)
        .merge(handlers::storage_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedrop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let serve_args = match &cli.command {
        None => Some((None, None)),
        Some(Commands::Serve { host, port }) => Some((host.clone(), *port)),
        Some(_) => None,
    };
    let Some((host, port)) = serve_args else {
        cli::run_cli(cli);
        return;
    };

    let mut config = cli::load_config(&cli);
    if host.is_some() || port.is_some() {
        let host = host.unwrap_or_else(|| config.host.clone());
        let port = port.unwrap_or(config.port);
        config = config.with_listen_addr(host, port);
    }

    let file_host = match FileHost::new(&config) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to initialize storage in '{}': {}", config.data_dir, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Data directory: {}", config.data_dir);
    tracing::info!("Public objects served as {}/<key>", config.storage_url);
    tracing::info!("Starting FileDrop on http://{}:{}", config.host, config.port);

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        host: file_host,
        challenges: ChallengeBook::new(),
        config,
    });
    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    println!(r#"
    ╔═══════════════════════════════════════════════════════╗
    ║                                                       ║
    ║   FileDrop — file hosting                             ║
    ║                                                       ║
    ║   Dashboard:  http://{:<30}    ║
    ║   API:        http://{:<30}    ║
    ║                                                       ║
    ╚═══════════════════════════════════════════════════════╝
    "#, &addr, format!("{}/api", &addr));

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
