use axum::{Json, extract::State, response::IntoResponse};

use crate::AppState;
use crate::metrics;

/// Health check endpoint - returns server status
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.switchboard.stats();

    Json(metrics::HealthStatus {
        status: "healthy".to_string(),
        peers: stats.peers as u64,
        waiting: stats.waiting as u64,
        queued_messages: stats.queued_messages as u64,
        uptime_secs: state.metrics.uptime_secs(),
    })
}

/// Metrics endpoint - returns detailed server metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Liveness probe - returns 200 if the server is running
pub async fn health_live_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::test_helpers::test_app_state;

    async fn get_json(app: axum::Router, uri: &str) -> serde_json::Value {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_peers() {
        let state = test_app_state();
        let alice = state.switchboard.sign_in("alice").id;
        let bob = state.switchboard.sign_in("bob").id;
        state.switchboard.send(alice, bob, "offer").unwrap();

        let json = get_json(crate::app(state), "/health").await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["peers"], 2);
        assert_eq!(json["waiting"], 0);
        assert_eq!(json["queued_messages"], 1);
    }

    #[tokio::test]
    async fn test_live() {
        let json = get_json(crate::app(test_app_state()), "/health/live").await;
        assert_eq!(json["status"], "alive");
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let state = test_app_state();
        state.metrics.peer_signed_in();
        let json = get_json(crate::app(state), "/metrics").await;
        assert_eq!(json["peers"]["sign_ins"], 1);
        assert_eq!(json["waits"]["started"], 0);
    }
}
