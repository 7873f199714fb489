use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edulearn::api;
use edulearn::config::Config;
use edulearn::db;
use edulearn::services::CounterReconciler;
use edulearn::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "edulearn=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;

    let reconciler = CounterReconciler::new(pool.clone(), config.reconcile_interval_secs);
    reconciler.run_once().await?;
    if config.reconcile_interval_secs > 0 {
        tokio::spawn(reconciler.start());
    }

    let state = AppState::from_config(pool, &config)?;
    info!("authentication mode: {:?}", config.auth_mode);

    let app = api::router(state).layer(api::cors(&config.cors_origins));

    let addr = config.socket_addr()?;
    info!("listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    warn!("received Ctrl+C, shutting down");
}
