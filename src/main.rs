//! Service entrypoint: configuration, wiring, and the axum server.

use std::process;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lumina_realtime::adapters::http::notify_routes;
use lumina_realtime::adapters::postgres::PostgresNotificationStore;
use lumina_realtime::adapters::websocket::{realtime_router, RealtimeState, RoomRouter, SessionRegistry};
use lumina_realtime::application::{NotificationService, SignalingCoordinator, SignalingOptions};
use lumina_realtime::config::AppConfig;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    if let Err(e) = run(config).await {
        tracing::error!("fatal: {}", e);
        process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Wiring: one registry, one router over it, services on top.
    let registry = Arc::new(SessionRegistry::new());
    let router = Arc::new(RoomRouter::new(Arc::clone(&registry)));
    let signaling = SignalingCoordinator::with_options(
        Arc::clone(&router),
        SignalingOptions {
            ring_timeout: config.realtime.ring_timeout(),
            teardown_on_disconnect: config.realtime.end_call_on_disconnect,
        },
    );
    let notifications = Arc::new(NotificationService::new(
        Arc::new(PostgresNotificationStore::new(pool)),
        Arc::clone(&router),
    ));

    let realtime_state = RealtimeState::new(registry, router, signaling);

    let cors = cors_layer(&config.server.cors_origins_list())?;
    let app = Router::new()
        .merge(realtime_router().with_state(realtime_state))
        .nest("/internal", notify_routes(notifications))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, environment = ?config.server.environment, "starting lumina-realtime");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, http::header::InvalidHeaderValue> {
    if origins.is_empty() {
        // Development default; production should pin origins.
        return Ok(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }
    let parsed = origins
        .iter()
        .map(|o| o.parse())
        .collect::<Result<Vec<http::HeaderValue>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any))
}
