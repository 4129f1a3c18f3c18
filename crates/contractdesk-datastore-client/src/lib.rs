//! REST client for the backing datastore.
//!
//! The datastore exposes PostgREST-style endpoints under `/rest/v1`: reads
//! are `GET` with `select`/`order` query parameters, writes are `POST`/`PATCH`
//! with `Prefer: return=representation` so the affected rows come back in the
//! response body. The datastore is an opaque collaborator; this client adds
//! no semantics beyond authentication headers, a bounded connect-retry loop,
//! and JSON decoding.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// One attempt by default: population flows own their retry policy, and a
/// second layer of retries underneath them would double every delay.
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 1;

#[derive(Debug, Clone)]
pub struct DatastoreClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl DatastoreClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatastoreClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("datastore_base_url_missing")]
    BaseUrlMissing,
    #[error("datastore_invalid_path")]
    InvalidPath,
    #[error("datastore_request_failed:{message}")]
    Request { message: String },
    #[error("datastore_read_failed:{message}")]
    Read { message: String },
    #[error("datastore_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("datastore_json_decode_failed:{message}")]
    Decode { message: String },
    #[error("datastore_empty_representation")]
    EmptyRepresentation,
}

impl DatastoreError {
    /// Transport-class failures are the ones worth retrying upstream; an HTTP
    /// or decode failure means the datastore answered and will answer the
    /// same way again.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

/// `users` table, restricted to the agent-dropdown columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRow {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

/// `contract_templates` table, restricted to the dropdown columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractTemplateRow {
    pub id: i64,
    pub template_name: String,
    #[serde(default)]
    pub template_link: Option<String>,
}

/// `listings` table, restricted to the property-dropdown columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingRow {
    pub list_num: String,
    pub list_name: String,
}

/// A `contracts` row. Contracts are stored as the flat object the form
/// submitted, so everything beyond the row identity stays dynamic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractRow {
    pub id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: serde_json::Value,
}

/// A `templates` row, same dynamic shape as contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRow {
    pub id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: serde_json::Value,
}

impl DatastoreClient {
    pub fn new(config: DatastoreClientConfig) -> Result<Self, DatastoreError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            api_key: config.api_key,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            request_attempts: config.request_attempts.max(1),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn users_path() -> &'static str {
        "/rest/v1/users?select=user_id,user_name,user_email&order=user_name.asc"
    }

    #[must_use]
    pub fn contract_templates_path() -> &'static str {
        "/rest/v1/contract_templates?select=id,template_name,template_link&order=template_name.asc"
    }

    #[must_use]
    pub fn listings_path() -> &'static str {
        "/rest/v1/listings?select=list_num,list_name&order=list_name.asc"
    }

    #[must_use]
    pub fn contracts_path() -> &'static str {
        "/rest/v1/contracts?select=*&order=created_at.desc"
    }

    #[must_use]
    pub fn contracts_insert_path() -> &'static str {
        "/rest/v1/contracts?select=*"
    }

    #[must_use]
    pub fn contract_by_id_path(id: i64) -> String {
        format!("/rest/v1/contracts?id=eq.{id}&select=*")
    }

    #[must_use]
    pub fn contract_mutation_path(id: i64) -> String {
        format!("/rest/v1/contracts?id=eq.{id}")
    }

    #[must_use]
    pub fn templates_path() -> &'static str {
        "/rest/v1/templates?select=*&order=created_at.desc"
    }

    #[must_use]
    pub fn templates_insert_path() -> &'static str {
        "/rest/v1/templates?select=*"
    }

    /// Agents for the dropdown, ordered by name.
    pub async fn list_users(&self) -> Result<Vec<UserRow>, DatastoreError> {
        self.get_json(Self::users_path()).await
    }

    /// Contract templates for the dropdown, ordered by name.
    pub async fn list_contract_templates(
        &self,
    ) -> Result<Vec<ContractTemplateRow>, DatastoreError> {
        self.get_json(Self::contract_templates_path()).await
    }

    /// Property listings for the dropdown, ordered by name.
    pub async fn list_listings(&self) -> Result<Vec<ListingRow>, DatastoreError> {
        self.get_json(Self::listings_path()).await
    }

    /// Inserts the submitted form object and returns the stored row.
    pub async fn create_contract(
        &self,
        contract: &serde_json::Value,
    ) -> Result<ContractRow, DatastoreError> {
        let rows: Vec<ContractRow> = self
            .write_json(Method::POST, Self::contracts_insert_path(), contract)
            .await?;
        rows.into_iter()
            .next()
            .ok_or(DatastoreError::EmptyRepresentation)
    }

    /// All stored contracts, newest first.
    pub async fn list_contracts(&self) -> Result<Vec<ContractRow>, DatastoreError> {
        self.get_json(Self::contracts_path()).await
    }

    pub async fn contract_by_id(&self, id: i64) -> Result<Option<ContractRow>, DatastoreError> {
        let rows: Vec<ContractRow> = self.get_json(&Self::contract_by_id_path(id)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn update_contract(
        &self,
        id: i64,
        updates: &serde_json::Value,
    ) -> Result<Option<ContractRow>, DatastoreError> {
        let rows: Vec<ContractRow> = self
            .write_json(Method::PATCH, &Self::contract_mutation_path(id), updates)
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn delete_contract(&self, id: i64) -> Result<(), DatastoreError> {
        let response = self
            .send_request(Method::DELETE, &Self::contract_mutation_path(id), None, None)
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await.map_err(|error| DatastoreError::Read {
            message: error.to_string(),
        })?;
        Err(format_http_error(status, &bytes))
    }

    /// Inserts a template snapshot and returns the stored row.
    pub async fn create_template(
        &self,
        template: &serde_json::Value,
    ) -> Result<TemplateRow, DatastoreError> {
        let rows: Vec<TemplateRow> = self
            .write_json(Method::POST, Self::templates_insert_path(), template)
            .await?;
        rows.into_iter()
            .next()
            .ok_or(DatastoreError::EmptyRepresentation)
    }

    /// All stored templates, newest first.
    pub async fn list_templates(&self) -> Result<Vec<TemplateRow>, DatastoreError> {
        self.get_json(Self::templates_path()).await
    }

    pub async fn get_json<T>(&self, path: &str) -> Result<T, DatastoreError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let response = self.send_request(Method::GET, path, None, None).await?;
        decode_json_response(response).await
    }

    async fn write_json<T>(
        &self,
        method: Method,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<T, DatastoreError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let response = self
            .send_request(method, path, Some(payload), Some("return=representation"))
            .await?;
        decode_json_response(response).await
    }

    async fn send_request(
        &self,
        method: Method,
        path: &str,
        payload: Option<&serde_json::Value>,
        prefer: Option<&'static str>,
    ) -> Result<reqwest::Response, DatastoreError> {
        let url = self.endpoint(path).ok_or(DatastoreError::InvalidPath)?;
        let mut last_error: Option<String> = None;

        for attempt in 0..self.request_attempts {
            let mut request = self
                .http
                .request(method.clone(), url.as_str())
                .header("apikey", self.api_key.as_str())
                .bearer_auth(self.api_key.as_str())
                .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
                .timeout(self.timeout);
            if let Some(prefer) = prefer {
                request = request.header("Prefer", prefer);
            }
            if let Some(payload) = payload {
                request = request.json(payload);
            }

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt + 1 >= self.request_attempts {
                        break;
                    }
                }
            }
        }

        Err(DatastoreError::Request {
            message: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> DatastoreError {
    let body = String::from_utf8_lossy(body);
    let body = body.trim();
    DatastoreError::Http {
        status,
        body: if body.is_empty() {
            "<empty>".to_string()
        } else {
            body.to_string()
        },
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, DatastoreError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(DatastoreError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, DatastoreError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = response.status();
    let bytes = response.bytes().await.map_err(|error| DatastoreError::Read {
        message: error.to_string(),
    })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| DatastoreError::Decode {
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DatastoreClient {
        DatastoreClient::new(DatastoreClientConfig::new(
            "https://store.example.com/",
            "anon-key",
        ))
        .expect("datastore client")
    }

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = client();
        assert_eq!(
            client.endpoint("/rest/v1/users"),
            Some("https://store.example.com/rest/v1/users".to_string())
        );
        assert_eq!(
            client.endpoint("rest/v1/users"),
            Some("https://store.example.com/rest/v1/users".to_string())
        );
        assert_eq!(client.endpoint(""), None);
    }

    #[test]
    fn read_paths_carry_the_per_kind_ordering() {
        assert_eq!(
            DatastoreClient::users_path(),
            "/rest/v1/users?select=user_id,user_name,user_email&order=user_name.asc"
        );
        assert_eq!(
            DatastoreClient::contract_templates_path(),
            "/rest/v1/contract_templates?select=id,template_name,template_link&order=template_name.asc"
        );
        assert_eq!(
            DatastoreClient::listings_path(),
            "/rest/v1/listings?select=list_num,list_name&order=list_name.asc"
        );
        assert_eq!(
            DatastoreClient::contracts_path(),
            "/rest/v1/contracts?select=*&order=created_at.desc"
        );
    }

    #[test]
    fn mutation_paths_filter_by_row_id() {
        assert_eq!(
            DatastoreClient::contract_by_id_path(42),
            "/rest/v1/contracts?id=eq.42&select=*"
        );
        assert_eq!(
            DatastoreClient::contract_mutation_path(42),
            "/rest/v1/contracts?id=eq.42"
        );
    }

    #[test]
    fn http_error_mapping_preserves_shape() {
        let error = format_http_error(StatusCode::BAD_GATEWAY, b" gateway failed ");
        assert_eq!(
            error.to_string(),
            "datastore_http_502 Bad Gateway:gateway failed"
        );

        let empty_body = format_http_error(StatusCode::SERVICE_UNAVAILABLE, b" ");
        assert_eq!(
            empty_body.to_string(),
            "datastore_http_503 Service Unavailable:<empty>"
        );
    }

    #[test]
    fn base_url_missing_is_rejected() {
        let result = DatastoreClient::new(DatastoreClientConfig::new("   ", "anon-key"));
        assert!(matches!(result, Err(DatastoreError::BaseUrlMissing)));
    }

    #[test]
    fn only_request_failures_are_transport_class() {
        assert!(
            DatastoreError::Request {
                message: "connection refused".to_string()
            }
            .is_transport()
        );
        assert!(
            !DatastoreError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "oops".to_string()
            }
            .is_transport()
        );
        assert!(!DatastoreError::EmptyRepresentation.is_transport());
    }

    #[test]
    fn user_row_tolerates_null_email() {
        let row: UserRow = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "user_name": "Ann",
            "user_email": null
        }))
        .expect("user row with null email");
        assert_eq!(row.user_email, None);
    }

    #[test]
    fn contract_row_keeps_submitted_fields_dynamic() {
        let row: ContractRow = serde_json::from_value(serde_json::json!({
            "id": 7,
            "created_at": "2026-08-07T12:00:00Z",
            "agent": "u1",
            "sellerName": "Seller"
        }))
        .expect("contract row");
        assert_eq!(row.id, 7);
        assert_eq!(row.fields["sellerName"], "Seller");
    }
}
