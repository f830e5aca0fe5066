//! Donation service — entry point.
//!
//! Loads the foundation catalog in the background and exposes the donation
//! workflow (pick a foundation, choose or recall an amount, submit) over a
//! small Axum REST API. Chosen amounts are remembered per foundation in
//! SQLite so they survive restarts.

mod api;
mod catalog;
mod config;
mod db;
mod errors;
mod notify;
mod payment;
mod provider;
mod selection;
mod store;
mod types;

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog::CatalogState;
use config::Config;
use notify::NotificationCenter;
use payment::PaymentSubmitter;
use provider::HttpProvider;
use selection::SelectionController;
use store::{PreferenceStore, SqliteKeyValue};
use types::MinLatency;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Durable medium for remembered amounts.
    let pool = db::init_pool(&config.database_url).await?;
    let preferences = Arc::new(PreferenceStore::new(
        SqliteKeyValue::new(pool),
        config.preference_namespace.clone(),
    ));

    let client = Client::builder().timeout(config.http_timeout).build()?;
    let provider = HttpProvider::new(client, &config.provider_url);

    // ─── Background catalog load ──────────────────────────
    let catalog = Arc::new(RwLock::new(CatalogState::Loading));
    tokio::spawn(catalog::run(
        provider.clone(),
        MinLatency(config.catalog_min_delay),
        catalog.clone(),
    ));

    // ─── REST API ─────────────────────────────────────────
    let notifications = Arc::new(NotificationCenter::default());
    let api_state = Arc::new(api::ApiState {
        catalog,
        selection: Mutex::new(SelectionController::new(
            preferences.clone(),
            config.presets.clone(),
        )),
        submitter: PaymentSubmitter::new(
            provider,
            MinLatency(config.payment_min_delay),
            notifications.clone(),
        ),
        preferences,
        notifications,
    });

    let app = api::router(api_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
