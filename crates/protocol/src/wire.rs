/// JSON bodies exchanged between the router, the backends, and callers.
use serde::{Deserialize, Serialize};

use crate::slot::VersionSlot;

/// `POST /chat` request, accepted by both the router and each backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

/// Successful `POST /chat` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    /// Retrieved context texts in ascending-distance order. Carried even when
    /// answer generation fell back, so callers can see what was found.
    pub retrieved: Vec<String>,
}

/// Router-side failure: the active backend could not be reached at all.
/// Distinct from a backend answering "no result" with its own payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteErrorResponse {
    pub error: String,
    pub active_version: VersionSlot,
}

/// `POST /activate` request. The label is free-form on the wire and
/// validated into a [`VersionSlot`] before anything is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub version: String,
}

/// Successful `POST /activate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub activated: VersionSlot,
}

/// Generic structured error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /health` response from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub index_loaded: bool,
}

impl HealthResponse {
    pub fn ok(index_loaded: bool) -> Self {
        Self {
            status: "ok".into(),
            index_loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_round_trips() {
        let req: ChatRequest = serde_json::from_str(r#"{"query":"what is v2?"}"#).unwrap();
        assert_eq!(req.query, "what is v2?");
    }

    #[test]
    fn route_error_carries_active_version() {
        let body = RouteErrorResponse {
            error: "connection refused".into(),
            active_version: VersionSlot::V2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["active_version"], "v2");
        assert_eq!(json["error"], "connection refused");
    }

    #[test]
    fn health_response_shape() {
        let json = serde_json::to_value(HealthResponse::ok(false)).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["index_loaded"], false);
    }
}
