use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pantomime::{api, broadcast, config::ServerConfig, state::AppState, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantomime=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pantomime...");

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::new());

    // Spawn background task for reaping abandoned rooms
    broadcast::spawn_room_reaper(state.clone(), &config);

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/rooms", post(api::create_room))
        .route("/api/rooms/{code}", get(api::get_room))
        .route("/api/rooms/{code}/join", post(api::join_room))
        .route("/api/rooms/{code}/characters", post(api::submit_characters))
        .route("/api/rooms/{code}/pool", post(api::seed_pool))
        .route("/api/rooms/{code}/events", post(api::apply_event))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    tracing::info!("Listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
