use crate::app::AppState;
use crate::relay::RegistryMetrics;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Health check status
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// `GET /health` response body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub active_connections: usize,
    pub max_connections: usize,
    pub rooms: usize,
    pub total_connections: u64,
    pub total_broadcasts: u64,
    pub evictions: u64,
}

impl HealthResponse {
    /// Derive health from registry metrics and store health
    ///
    /// A full connection table or an unhealthy store degrades the relay but
    /// it keeps serving.
    pub fn from_metrics(metrics: RegistryMetrics, store_healthy: bool) -> Self {
        let at_capacity = metrics.max_connections > 0
            && metrics.active_connections >= metrics.max_connections;
        let status = if at_capacity || !store_healthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            active_connections: metrics.active_connections,
            max_connections: metrics.max_connections,
            rooms: metrics.room_count,
            total_connections: metrics.total_connections,
            total_broadcasts: metrics.total_broadcasts,
            evictions: metrics.total_evictions,
        }
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let status_code = match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status_code, Json(self)).into_response()
    }
}

/// Handler for the health endpoint
pub async fn health_handler(State(state): State<AppState>) -> HealthResponse {
    HealthResponse::from_metrics(state.registry().metrics(), state.session.store_healthy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(active: usize, max: usize) -> RegistryMetrics {
        RegistryMetrics {
            active_connections: active,
            max_connections: max,
            total_connections: 7,
            total_broadcasts: 3,
            total_evictions: 1,
            room_count: 2,
        }
    }

    #[test]
    fn test_healthy_under_limit() {
        let health = HealthResponse::from_metrics(metrics(2, 10), true);
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.rooms, 2);
        assert_eq!(health.evictions, 1);
    }

    #[test]
    fn test_degraded_at_capacity_or_bad_store() {
        assert_eq!(
            HealthResponse::from_metrics(metrics(10, 10), true).status,
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthResponse::from_metrics(metrics(0, 0), false).status,
            HealthStatus::Degraded
        );
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(HealthResponse::from_metrics(metrics(1, 0), true)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["active_connections"], 1);
        assert_eq!(json["total_connections"], 7);
    }
}
