mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod importer;
mod models;
mod routes;
mod swapi;

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    catalog::{Catalog, HealthCheck, PlanetStore},
    config::Config,
    swapi::SwapiClient,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub planets: Arc<dyn PlanetStore>,
    pub health: Arc<dyn HealthCheck>,
}

#[derive(Debug, Parser)]
#[command(name = "starwars-catalog", version, about = "Star Wars planet catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Import planets and films from SWAPI, then exit
    Import,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,starwars_catalog=debug,sqlx=warn".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    let catalog = Arc::new(Catalog::new(db));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, catalog).await,
        Command::Import => import(&config, &catalog).await,
    }
}

async fn serve(config: Arc<Config>, catalog: Arc<Catalog>) -> anyhow::Result<()> {
    let state =
        Arc::new(AppState { config: config.clone(), planets: catalog.clone(), health: catalog });

    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any)),
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("shutdown");
    Ok(())
}

async fn import(config: &Config, catalog: &Catalog) -> anyhow::Result<()> {
    let http = reqwest::Client::builder()
        .user_agent("starwars-catalog/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;
    let swapi = SwapiClient::new(http, config.swapi_base_url.clone(), config.swapi_rps);

    importer::run(&swapi, catalog, catalog).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
