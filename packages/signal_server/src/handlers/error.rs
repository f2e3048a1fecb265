use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use signal_relay::RelayError;

/// A signaling failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RelayError::PeerNotFound(_) => StatusCode::NOT_FOUND,
            RelayError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::WaitSuperseded(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(serde_json::json!({
                "error": self.0.error_code(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_relay::PeerId;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError(RelayError::PeerNotFound(PeerId(1))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(RelayError::MalformedRequest("missing peer_id".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(RelayError::WaitSuperseded(PeerId(1))).status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn body_carries_error_code() {
        let resp = ApiError(RelayError::PeerNotFound(PeerId(4))).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "peer_not_found");
        assert_eq!(json["message"], "peer not found: 4");
    }
}
