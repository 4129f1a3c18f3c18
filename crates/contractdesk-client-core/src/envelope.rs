use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Envelope returned by every backing-store proxy read.
///
/// `success=false` is an application-level failure: the proxy answered, the
/// answer is final, and nothing retries it. Transport-class failures never
/// reach this type; they surface as [`FetchError`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> FetchEnvelope<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Envelope returned by backing-store proxy writes (template creation).
/// Success is judged by the `success` flag, not by transport status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WriteEnvelope {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// How a proxy read can fail before an envelope is available.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request itself never completed (connection refused, DNS, timeout).
    /// The only retriable class.
    #[error("fetch_transport_failed:{message}")]
    Transport { message: String },
    /// The proxy answered with a non-success status instead of an envelope.
    #[error("fetch_http_{status}:{body}")]
    Http { status: u16, body: String },
    /// The proxy answered 2xx but the body was not a parseable envelope.
    #[error("fetch_decode_failed:{message}")]
    Decode { message: String },
}

impl FetchError {
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_envelope_serializes_without_absent_fields() {
        let ok = FetchEnvelope::ok(vec!["a".to_string()]);
        let value = serde_json::to_value(&ok).expect("serialize ok envelope");
        assert_eq!(value, serde_json::json!({"success": true, "data": ["a"]}));

        let failed = FetchEnvelope::<Vec<String>>::failed("Database not configured");
        let value = serde_json::to_value(&failed).expect("serialize failed envelope");
        assert_eq!(
            value,
            serde_json::json!({"success": false, "message": "Database not configured"})
        );
    }

    #[test]
    fn read_envelope_tolerates_missing_fields_on_decode() {
        let envelope: FetchEnvelope<Vec<String>> =
            serde_json::from_value(serde_json::json!({"success": true}))
                .expect("bare success decodes");
        assert!(envelope.success);
        assert!(envelope.data.is_none());
        assert!(envelope.message.is_none());
    }

    #[test]
    fn only_transport_errors_are_retriable() {
        assert!(
            FetchError::Transport {
                message: "connection refused".to_string()
            }
            .is_transport()
        );
        assert!(
            !FetchError::Http {
                status: 500,
                body: "oops".to_string()
            }
            .is_transport()
        );
        assert!(
            !FetchError::Decode {
                message: "expected value".to_string()
            }
            .is_transport()
        );
    }
}
