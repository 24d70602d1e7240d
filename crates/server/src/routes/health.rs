//! Health check handlers.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Status report for `/api/health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub message: &'static str,
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn liveness() -> &'static str {
    "ok"
}

/// GET /api/health
///
/// Always 200; the database field says whether the store answered.
pub async fn status(State(state): State<AppState>) -> Json<HealthReport> {
    let database = if state.stores().health.ping().await {
        "CONNECTED"
    } else {
        "DISCONNECTED"
    };

    Json(HealthReport {
        message: "Backend is running",
        status: "BE UP",
        database,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_status_reports_database() {
        let app = TestApp::new();

        let up = app.get("/api/health").await;
        assert_eq!(up.status, StatusCode::OK);
        assert_eq!(up.json()["status"], "BE UP");
        assert_eq!(up.json()["database"], "CONNECTED");

        app.store.set_unavailable(true);
        let down = app.get("/api/health").await;
        assert_eq!(down.status, StatusCode::OK);
        assert_eq!(down.json()["database"], "DISCONNECTED");
    }
}
