use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use contractdesk_client_core::payload::SubmissionPayload;
use contractdesk_client_core::submit::{DeliveryError, WebhookResponse, WebhookTransport};

use crate::config::Config;

/// One-shot JSON delivery to the fixed webhook endpoint. No retries: failed
/// submissions surface as a banner, never as a queue.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    endpoint_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint_url: config.webhook_url.clone(),
            timeout: Duration::from_millis(config.webhook_timeout_ms.max(500)),
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl WebhookTransport for WebhookClient {
    async fn deliver(&self, payload: &SubmissionPayload) -> Result<WebhookResponse, DeliveryError> {
        let response = self
            .http
            .post(&self.endpoint_url)
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|error| DeliveryError::Transport {
                message: error.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(WebhookResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn client_carries_the_configured_endpoint() {
        let client = WebhookClient::from_config(&Config::for_tests(PathBuf::from(".")));
        assert_eq!(
            client.endpoint_url(),
            "http://127.0.0.1:9/webhook-test/fixture"
        );
    }
}
