use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use contractdesk_client_core::envelope::FetchEnvelope;

/// Envelope for the write endpoints (`/submit`, `/api/templates`): a verdict,
/// a human-readable message, and optionally the affected record or the echoed
/// input.
#[derive(Debug, Serialize)]
pub struct ActionEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type ActionResponse = (StatusCode, Json<ActionEnvelope>);

pub fn action_ok(message: impl Into<String>, data: Option<Value>) -> ActionResponse {
    (
        StatusCode::OK,
        Json(ActionEnvelope {
            success: true,
            message: message.into(),
            data,
            error: None,
        }),
    )
}

/// Application-level failure: the datastore answered and said no. Reported
/// with a 200 like every other envelope verdict.
pub fn action_failed(message: impl Into<String>, data: Option<Value>) -> ActionResponse {
    (
        StatusCode::OK,
        Json(ActionEnvelope {
            success: false,
            message: message.into(),
            data,
            error: None,
        }),
    )
}

/// Handler-level failure: the write never completed.
pub fn action_server_error(message: impl Into<String>, detail: impl Into<String>) -> ActionResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ActionEnvelope {
            success: false,
            message: message.into(),
            data: None,
            error: Some(detail.into()),
        }),
    )
}

pub type ReadResponse<T> = (StatusCode, Json<FetchEnvelope<T>>);

pub fn read_response<T: Serialize>(envelope: FetchEnvelope<T>) -> ReadResponse<T> {
    (StatusCode::OK, Json(envelope))
}

pub fn read_server_error(message: impl Into<String>) -> ReadResponse<Value> {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(FetchEnvelope::failed(message)),
    )
}

pub fn message_response(status: StatusCode, message: impl Into<String>) -> ReadResponse<Value> {
    (status, Json(FetchEnvelope::failed(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_envelopes_serialize_the_original_wire_shape() {
        let (status, payload) = action_ok(
            "Contract saved to database successfully!",
            Some(json!({"id": 7})),
        );
        assert_eq!(status, StatusCode::OK);
        let body = serde_json::to_value(payload.0).expect("serialize envelope");
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 7);
        assert!(body.get("error").is_none());

        let (status, payload) = action_server_error("Server error processing form", "boom");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_value(payload.0).expect("serialize envelope");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "boom");
    }

    #[test]
    fn read_failures_keep_the_envelope_message_field() {
        let (status, payload) = read_server_error("Server error fetching users: x");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_value(payload.0).expect("serialize envelope");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Server error fetching users: x");
        assert!(body.get("data").is_none());
    }
}
