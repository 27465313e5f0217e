use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod database;
mod errors;
mod handlers;
mod models;
mod realtime;
mod routes;
mod services;
mod state;

use config::AppConfig;
use database::connection::get_db_client;
use realtime::broadcaster::MatchBroadcaster;
use services::football_api::FootballApiClient;
use services::sync::{self, SyncJob};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    let log_level = if config.is_production() {
        tracing::Level::INFO
    } else {
        tracing::Level::DEBUG
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    tracing::info!("Running in {} mode", config.environment);

    let db = get_db_client(&config).await?;
    let broadcaster = Arc::new(MatchBroadcaster::new());
    let app_state = AppState::new(db, broadcaster.clone());

    app_state.store.ensure_indexes().await?;

    let source = Arc::new(FootballApiClient::new(&config)?);

    // `livescore-api sync` runs a single reconciliation pass with no
    // clients attached, then exits.
    if std::env::args().nth(1).as_deref() == Some("sync") {
        run_offline_sync(&app_state, source.as_ref()).await;
        return Ok(());
    }

    let sync_job = SyncJob::start(app_state.store.clone(), source, broadcaster);

    let app = build_router(app_state);
    start_server(app, &config).await?;

    sync_job.stop().await;
    Ok(())
}

async fn run_offline_sync(state: &AppState, source: &FootballApiClient) {
    tracing::info!("Starting sync...");
    let total = sync::run_pass(&state.store, source, &state.broadcaster).await;
    tracing::info!("Done! Synced {} matches", total);
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/ws", get(realtime::handler::ws_handler))
        .nest("/api/v1/matches", routes::matches::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("🚀 Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down...");
}

async fn root_handler() -> &'static str {
    "⚽ Live Football Score API"
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    use bson::doc;

    let db_status = match state.db.run_command(doc! {"ping": 1}).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "connections": state.broadcaster.connection_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
