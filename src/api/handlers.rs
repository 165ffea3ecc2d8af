use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::collector::{CollectionScheduler, DiagnosticsReport, StatusReport};
use crate::models::DashboardPayload;

pub const DEFAULT_DASHBOARD_DAYS: u32 = 7;
pub const MAX_DASHBOARD_DAYS: u32 = 365;

pub struct AppState {
    pub scheduler: Arc<CollectionScheduler>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    /// Kept as text so a bad value falls back to the default instead of
    /// rejecting the request
    pub days: Option<String>,
}

impl DashboardQuery {
    pub fn window_days(&self) -> u32 {
        self.days
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|days| days.clamp(1, i64::from(MAX_DASHBOARD_DAYS)) as u32)
            .unwrap_or(DEFAULT_DASHBOARD_DAYS)
    }
}

/// Dashboard for the requested window; always 200
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardPayload> {
    Json(state.scheduler.dashboard(query.window_days()).await)
}

/// Run one collection cycle now
pub async fn refresh_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>, (StatusCode, Json<RefreshResponse>)> {
    match state.scheduler.force_refresh().await {
        Ok(_) => Ok(Json(RefreshResponse {
            status: "success".to_string(),
            message: "Data refreshed successfully".to_string(),
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RefreshResponse {
                status: "error".to_string(),
                message: format!("Refresh failed: {}", e),
            }),
        )),
    }
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    Json(state.scheduler.status())
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "youknow-backend".to_string(),
    })
}

/// History access test plus metrics backend diagnostics
pub async fn chrome_test(State(state): State<Arc<AppState>>) -> Json<DiagnosticsReport> {
    Json(state.scheduler.chrome_test().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(raw: Option<&str>) -> u32 {
        DashboardQuery {
            days: raw.map(str::to_string),
        }
        .window_days()
    }

    #[test]
    fn test_window_days_parsing() {
        assert_eq!(days(None), 7);
        assert_eq!(days(Some("14")), 14);
        assert_eq!(days(Some("abc")), 7);
        assert_eq!(days(Some("")), 7);
        assert_eq!(days(Some("0")), 1);
        assert_eq!(days(Some("-3")), 1);
        assert_eq!(days(Some("9999")), 365);
    }
}
