use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use careline::{
    app::{self, AppState},
    config::Config,
    error::ServerError,
    hub,
    state::Broker,
};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "careline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting careline relay...");

    let config = Config::from_env()?;

    let (broker, broker_task) = hub::spawn_broker(
        Broker::with_options(config.broker_options()),
        config.event_buffer,
    );
    let state = Arc::new(AppState::new(broker, &config));
    let router = app::router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Listening on http://{}", config.addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // open sockets may still hold handles; don't wait on them forever
    match tokio::time::timeout(Duration::from_secs(5), broker_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Broker task ended abnormally: {}", e),
        Err(_) => tracing::warn!("Broker still busy at shutdown, exiting anyway"),
    }
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
