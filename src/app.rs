use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::hub::BrokerHandle;
use crate::{api, ws};

/// State shared by the HTTP and WebSocket handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub broker: BrokerHandle,
    pub outbound_buffer: usize,
}

impl AppState {
    pub fn new(broker: BrokerHandle, config: &Config) -> Self {
        Self {
            broker,
            outbound_buffer: config.outbound_buffer,
        }
    }
}

/// Assemble the HTTP router
pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/stats", get(api::get_stats));

    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origins) = &config.cors_origins else {
        return CorsLayer::permissive();
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
}
