use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use youknow::api;
use youknow::collector::CollectionScheduler;
use youknow::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");
    info!(
        "Metrics store: {} (table '{}')",
        config.store.backend.as_str(),
        config.store.table
    );

    // Connect the store and run the first collection before serving
    let scheduler = Arc::new(CollectionScheduler::from_config(&config));
    scheduler.start().await;

    let api_router = api::create_api_router(Arc::clone(&scheduler), config.frontend.clone());

    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("🎨 Serving frontend from directory: {}", static_dir);
    } else {
        info!("🎨 No frontend directory configured, serving the API only");
    }

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Dashboard data at http://{}/api/dashboard", api_addr);

    let served = axum::serve(api_listener, api_router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down data collection...");
    scheduler.stop().await;

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
