//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse, PoolDto};
use crate::infrastructure::connection::Connector;
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: acquires a pinged connection through the connection manager
/// 2. **Access Queue**: checks the channel is open and reports free capacity
///
/// Pool occupancy is reported alongside.
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "access_queue": { "status": "ok", "message": "Capacity: 10000" },
///     "pool": { "idle": 1, "in_use": 0, "capacity": 15 }
///   }
/// }
/// ```
pub async fn health_handler<C: Connector>(
    State(state): State<AppState<C>>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let db_check = check_database(&state).await;
    let queue_check = check_access_queue(&state);

    let status = state.link_service.store().connections().status();
    let all_healthy = db_check.is_ok() && queue_check.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database: db_check,
            access_queue: queue_check,
            pool: PoolDto {
                idle: status.idle,
                in_use: status.in_use,
                capacity: status.capacity,
            },
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database<C: Connector>(state: &AppState<C>) -> CheckStatus {
    match state.link_service.store().connections().acquire().await {
        Ok(conn) => {
            conn.release();
            CheckStatus::ok("Connected")
        }
        Err(e) => CheckStatus::error(format!("Database error: {e}")),
    }
}

fn check_access_queue<C: Connector>(state: &AppState<C>) -> CheckStatus {
    if state.access_sender.is_closed() {
        CheckStatus::error("Access queue is closed")
    } else {
        CheckStatus::ok(format!("Capacity: {}", state.access_sender.capacity()))
    }
}
