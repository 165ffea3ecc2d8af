use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::collector::CollectionScheduler;
use crate::config::FrontendConfig;

use super::handlers::{chrome_test, get_dashboard, get_status, health_check, refresh_data, AppState};

pub fn create_api_router(scheduler: Arc<CollectionScheduler>, frontend: FrontendConfig) -> Router {
    let state = Arc::new(AppState { scheduler });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/refresh", get(refresh_data))
        .route("/status", get(get_status))
        .route("/health", get(health_check))
        .route("/chrome-test", get(chrome_test))
        .with_state(state);

    let router = Router::new().nest("/api", api_routes);

    // Anything outside /api is the frontend, with index.html for client-side routes
    let router = match frontend.static_dir {
        Some(dir) => {
            let index = Path::new(&dir).join("index.html");
            router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)))
        }
        None => router,
    };

    router.layer(cors)
}
