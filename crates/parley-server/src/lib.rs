pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::Method,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use parley_api::{AppStateInner, health, messages};
use parley_db::Database;
use parley_gateway::connection;
use parley_gateway::dispatcher::Dispatcher;
use parley_gateway::relay::Relay;

pub use config::Config;

/// Assemble the full HTTP + WebSocket surface around an already-open store.
pub fn build_router(config: &Config, db: Arc<Database>, dispatcher: Dispatcher) -> Router {
    let relay = Relay::new(dispatcher, db.clone());
    let api_state = Arc::new(AppStateInner {
        db,
        history_limit: config.history_limit,
    });

    let api_routes = Router::new()
        .route("/", get(health::health))
        .route("/api/messages", get(messages::get_messages))
        .with_state(api_state);

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(GatewayState {
            relay,
            heartbeat_interval: config.heartbeat_interval,
        });

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true);

    Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(Clone)]
struct GatewayState {
    relay: Relay,
    heartbeat_interval: Duration,
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.relay, state.heartbeat_interval)
    })
}
