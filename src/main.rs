//! condo-loans server entry point.
//!
//! Starts the Axum HTTP server backed by PostgreSQL.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use condo_loans::api;
use condo_loans::app_state::AppState;
use condo_loans::auth::TokenVerifier;
use condo_loans::config::ServiceConfig;
use condo_loans::domain::EventBus;
use condo_loans::persistence::postgres::PostgresStore;
use condo_loans::service::LoanService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServiceConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting condo-loans");

    // Connect to PostgreSQL and run pending migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    let store = PostgresStore::new(pool);
    store.migrate().await?;

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let loan_service = Arc::new(LoanService::new(Arc::new(store), event_bus));
    let verifier = TokenVerifier::new(&config.jwt_secret);

    // Build application state
    let app_state = AppState {
        loan_service,
        verifier,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
