use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use contractdesk_client_core::envelope::{FetchEnvelope, FetchError, WriteEnvelope};
use contractdesk_client_core::records::{AgentRecord, PropertyRecord, TemplateRecord};
use contractdesk_client_core::submit::{DeliveryError, TemplateApi, TemplateDraft};
use contractdesk_client_core::sync::ProxyApi;
use contractdesk_datastore_client::{
    ContractTemplateRow, DatastoreClient, DatastoreClientConfig, DatastoreError, ListingRow,
    UserRow,
};

use crate::config::Config;

pub const NOT_CONFIGURED_MESSAGE: &str = "Database not configured";

/// How a datastore write ended, from the caller's point of view.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// No datastore credentials; callers decide whether that is a success
    /// (contract submission echoes) or a failure (template creation).
    NotConfigured,
    /// The stored row, as returned by the datastore.
    Created(Value),
    /// The datastore answered with an error.
    Failed(String),
    /// The datastore never answered.
    Unreachable(String),
}

/// The backing-store proxy: wraps the datastore client when credentials are
/// configured, and degrades to `{success:false, message}` envelopes when not,
/// exactly like the original proxy layer did.
#[derive(Clone)]
pub struct DatastoreProxy {
    client: Option<DatastoreClient>,
}

impl DatastoreProxy {
    pub fn from_config(config: &Config) -> Self {
        let client = match (&config.datastore_url, &config.datastore_key) {
            (Some(url), Some(key)) => {
                let mut client_config = DatastoreClientConfig::new(url, key);
                client_config.timeout_ms = config.datastore_timeout_ms;
                client_config.request_attempts = config.datastore_request_attempts;
                match DatastoreClient::new(client_config) {
                    Ok(client) => Some(client),
                    Err(error) => {
                        warn!(%error, "datastore client rejected its configuration");
                        None
                    }
                }
            }
            _ => None,
        };

        if client.is_none() {
            warn!("datastore credentials not set; proxy reads will answer '{NOT_CONFIGURED_MESSAGE}'");
        }

        Self { client }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn create_contract(&self, contract: &Value) -> WriteOutcome {
        let Some(client) = &self.client else {
            return WriteOutcome::NotConfigured;
        };
        match client.create_contract(contract).await {
            Ok(row) => WriteOutcome::Created(row_value(&row)),
            Err(error) if error.is_transport() => WriteOutcome::Unreachable(error.to_string()),
            Err(error) => WriteOutcome::Failed(error.to_string()),
        }
    }

    pub async fn create_template_value(&self, template: &Value) -> WriteOutcome {
        let Some(client) = &self.client else {
            return WriteOutcome::NotConfigured;
        };
        match client.create_template(template).await {
            Ok(row) => WriteOutcome::Created(row_value(&row)),
            Err(error) if error.is_transport() => WriteOutcome::Unreachable(error.to_string()),
            Err(error) => WriteOutcome::Failed(error.to_string()),
        }
    }
}

fn row_value<T: serde::Serialize>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}

fn agent_record(row: UserRow) -> AgentRecord {
    AgentRecord {
        user_id: row.user_id,
        user_name: row.user_name,
        user_email: row.user_email.unwrap_or_default(),
    }
}

fn template_record(row: ContractTemplateRow) -> TemplateRecord {
    TemplateRecord {
        id: row.id.to_string(),
        template_name: row.template_name,
        template_link: row.template_link.unwrap_or_default(),
    }
}

fn property_record(row: ListingRow) -> PropertyRecord {
    PropertyRecord {
        list_num: row.list_num,
        list_name: row.list_name,
    }
}

fn transport_error(error: &DatastoreError) -> FetchError {
    FetchError::Transport {
        message: error.to_string(),
    }
}

#[async_trait]
impl ProxyApi for DatastoreProxy {
    async fn list_agents(&self) -> Result<FetchEnvelope<Vec<AgentRecord>>, FetchError> {
        let Some(client) = &self.client else {
            return Ok(FetchEnvelope::failed(NOT_CONFIGURED_MESSAGE));
        };
        match client.list_users().await {
            Ok(rows) => Ok(FetchEnvelope::ok(
                rows.into_iter().map(agent_record).collect(),
            )),
            Err(error) if error.is_transport() => Err(transport_error(&error)),
            Err(error) => Ok(FetchEnvelope::failed(format!(
                "Error fetching users: {error}"
            ))),
        }
    }

    async fn list_templates(&self) -> Result<FetchEnvelope<Vec<TemplateRecord>>, FetchError> {
        let Some(client) = &self.client else {
            return Ok(FetchEnvelope::failed(NOT_CONFIGURED_MESSAGE));
        };
        match client.list_contract_templates().await {
            Ok(rows) => Ok(FetchEnvelope::ok(
                rows.into_iter().map(template_record).collect(),
            )),
            Err(error) if error.is_transport() => Err(transport_error(&error)),
            Err(error) => Ok(FetchEnvelope::failed(format!(
                "Error fetching contract templates: {error}"
            ))),
        }
    }

    async fn list_properties(&self) -> Result<FetchEnvelope<Vec<PropertyRecord>>, FetchError> {
        let Some(client) = &self.client else {
            return Ok(FetchEnvelope::failed(NOT_CONFIGURED_MESSAGE));
        };
        match client.list_listings().await {
            Ok(rows) => Ok(FetchEnvelope::ok(
                rows.into_iter().map(property_record).collect(),
            )),
            Err(error) if error.is_transport() => Err(transport_error(&error)),
            Err(error) => Ok(FetchEnvelope::failed(format!(
                "Error fetching listings: {error}"
            ))),
        }
    }
}

#[async_trait]
impl TemplateApi for DatastoreProxy {
    async fn create_template(&self, draft: &TemplateDraft) -> Result<WriteEnvelope, DeliveryError> {
        let draft_value = serde_json::to_value(draft).map_err(|error| DeliveryError::Transport {
            message: error.to_string(),
        })?;
        match self.create_template_value(&draft_value).await {
            WriteOutcome::Created(_) => Ok(WriteEnvelope::ok()),
            WriteOutcome::NotConfigured => Ok(WriteEnvelope::failed(NOT_CONFIGURED_MESSAGE)),
            WriteOutcome::Failed(message) => Ok(WriteEnvelope::failed(message)),
            WriteOutcome::Unreachable(message) => Err(DeliveryError::Transport { message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn unconfigured() -> DatastoreProxy {
        DatastoreProxy::from_config(&Config::for_tests(PathBuf::from(".")))
    }

    #[tokio::test]
    async fn unconfigured_proxy_answers_the_not_configured_envelope() {
        let proxy = unconfigured();
        assert!(!proxy.is_configured());

        let envelope = proxy.list_agents().await.expect("envelope, not transport");
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some(NOT_CONFIGURED_MESSAGE));
    }

    #[tokio::test]
    async fn unconfigured_writes_report_not_configured() {
        let proxy = unconfigured();
        let outcome = proxy.create_contract(&serde_json::json!({"agent": "u1"})).await;
        assert!(matches!(outcome, WriteOutcome::NotConfigured));
    }

    #[test]
    fn row_mapping_fills_absent_columns_with_empty_strings() {
        let agent = agent_record(UserRow {
            user_id: "u1".to_string(),
            user_name: "Ann".to_string(),
            user_email: None,
        });
        assert_eq!(agent.user_email, "");

        let template = template_record(ContractTemplateRow {
            id: 7,
            template_name: "Lease".to_string(),
            template_link: None,
        });
        assert_eq!(template.id, "7", "numeric row ids become control values");
        assert_eq!(template.template_link, "");
    }
}
