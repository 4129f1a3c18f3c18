use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::LookupCache;
use crate::dropdown::Dropdown;
use crate::envelope::WriteEnvelope;
use crate::form::FormSelection;
use crate::payload::{SubmissionPayload, assemble};

/// How long success and error banners stay visible before auto-hiding.
pub const BANNER_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// One-shot feedback line shown above the form after a terminal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

impl Banner {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }
}

/// Where a flow is between requests: `Idle -> Submitting -> Idle`. Terminal
/// transitions always restore `Idle` so the control re-enables no matter how
/// the delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
}

/// What the webhook answered, when it answered at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivery failed before any response existed.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("delivery_transport_failed:{message}")]
    Transport { message: String },
}

/// Outbound delivery seam for the submission pipeline.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn deliver(&self, payload: &SubmissionPayload) -> Result<WebhookResponse, DeliveryError>;
}

/// Proxy write seam for the template-creation flow.
#[async_trait]
pub trait TemplateApi: Send + Sync {
    async fn create_template(&self, draft: &TemplateDraft) -> Result<WriteEnvelope, DeliveryError>;
}

/// Outcome handed to the rendering layer after a terminal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub banner: Banner,
    /// True only for a successful webhook delivery: the form resets and the
    /// derived email line hides. Failures preserve what the user typed.
    pub reset_form: bool,
}

/// The submission state machine: assemble, deliver, report, restore.
pub struct SubmissionPipeline<W> {
    transport: W,
    state: SubmitState,
}

impl<W: WebhookTransport> SubmissionPipeline<W> {
    pub fn new(transport: W) -> Self {
        Self {
            transport,
            state: SubmitState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SubmitState {
        self.state
    }

    /// Runs one submission. The selection is reset in place on success and
    /// left untouched otherwise; the state returns to `Idle` on every path.
    pub async fn submit(
        &mut self,
        selection: &mut FormSelection,
        cache: &LookupCache,
        templates: &Dropdown,
        submitted_at: DateTime<Utc>,
    ) -> SubmitReport {
        self.state = SubmitState::Submitting;
        let payload = assemble(selection, cache, templates, submitted_at);

        let report = match self.transport.deliver(&payload).await {
            Ok(response) if response.is_success() => {
                info!(status = response.status, "contract submission delivered");
                selection.reset();
                SubmitReport {
                    banner: Banner::success("Contract sent to webhook successfully!"),
                    reset_form: true,
                }
            }
            Ok(response) => {
                warn!(status = response.status, "contract submission rejected");
                SubmitReport {
                    banner: Banner::error(format!(
                        "Webhook error: {} - {}",
                        response.status, response.body
                    )),
                    reset_form: false,
                }
            }
            Err(error) => {
                warn!(%error, "contract submission transport failure");
                SubmitReport {
                    banner: Banner::error(
                        "Network error sending to webhook. Please check your connection.",
                    ),
                    reset_form: false,
                }
            }
        };

        self.state = SubmitState::Idle;
        report
    }
}

/// The template-creation wire shape: the form snapshot plus a generated name
/// and creation timestamp. Field names match the form control names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub agent: String,
    #[serde(rename = "contractType")]
    pub contract_type: String,
    pub property: String,
    #[serde(rename = "sellerName")]
    pub seller_name: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "signingPlace")]
    pub signing_place: String,
    pub name: String,
    pub created_at: String,
}

/// Snapshot of the current selection, named after the creation date.
#[must_use]
pub fn template_draft(selection: &FormSelection, created_at: DateTime<Utc>) -> TemplateDraft {
    TemplateDraft {
        agent: selection.agent_id.clone(),
        contract_type: selection.template_id.clone(),
        property: selection.property_id.clone(),
        seller_name: selection.seller_name.clone(),
        customer_name: selection.customer_name.clone(),
        signing_place: selection.signing_place.clone(),
        name: format!("Template - {}", created_at.format("%-m/%-d/%Y")),
        created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Independent flow behind the template button. Same busy/restore/banner
/// discipline as submission, but success is the proxy's `{success}` envelope,
/// not raw transport status, and the form never resets.
pub struct TemplateCreation<A> {
    api: A,
    state: SubmitState,
}

impl<A: TemplateApi> TemplateCreation<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: SubmitState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub async fn create(
        &mut self,
        selection: &FormSelection,
        created_at: DateTime<Utc>,
    ) -> SubmitReport {
        self.state = SubmitState::Submitting;
        let draft = template_draft(selection, created_at);

        let report = match self.api.create_template(&draft).await {
            Ok(envelope) if envelope.success => {
                info!(name = %draft.name, "template created");
                SubmitReport {
                    banner: Banner::success("Template created successfully!"),
                    reset_form: false,
                }
            }
            Ok(envelope) => {
                let message = envelope.message.unwrap_or_default();
                warn!(%message, "template creation rejected");
                SubmitReport {
                    banner: Banner::error(format!("Error creating template: {message}")),
                    reset_form: false,
                }
            }
            Err(error) => {
                warn!(%error, "template creation transport failure");
                SubmitReport {
                    banner: Banner::error("Network error creating template"),
                    reset_form: false,
                }
            }
        };

        self.state = SubmitState::Idle;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dropdown::EntityKind;
    use crate::records::{AgentRecord, TemplateRecord};
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct ScriptedTransport {
        result: Arc<Mutex<Option<Result<WebhookResponse, DeliveryError>>>>,
        delivered: Arc<Mutex<Vec<SubmissionPayload>>>,
    }

    impl ScriptedTransport {
        fn answering(result: Result<WebhookResponse, DeliveryError>) -> Self {
            Self {
                result: Arc::new(Mutex::new(Some(result))),
                delivered: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn deliver(
            &self,
            payload: &SubmissionPayload,
        ) -> Result<WebhookResponse, DeliveryError> {
            self.delivered
                .lock()
                .expect("delivered lock")
                .push(payload.clone());
            self.result
                .lock()
                .expect("result lock")
                .take()
                .unwrap_or(Ok(WebhookResponse {
                    status: 200,
                    body: String::new(),
                }))
        }
    }

    #[derive(Clone)]
    struct ScriptedTemplateApi {
        result: Arc<Mutex<Option<Result<WriteEnvelope, DeliveryError>>>>,
    }

    #[async_trait]
    impl TemplateApi for ScriptedTemplateApi {
        async fn create_template(
            &self,
            _draft: &TemplateDraft,
        ) -> Result<WriteEnvelope, DeliveryError> {
            self.result
                .lock()
                .expect("result lock")
                .take()
                .unwrap_or(Ok(WriteEnvelope::ok()))
        }
    }

    fn fixtures() -> (LookupCache, Dropdown, FormSelection) {
        let mut cache = LookupCache::default();
        cache.replace_agents(vec![AgentRecord {
            user_id: "u1".to_string(),
            user_name: "Ann".to_string(),
            user_email: "ann@x.com".to_string(),
        }]);

        let mut templates = Dropdown::empty(EntityKind::Templates);
        templates.rebuild_from_templates(&[TemplateRecord {
            id: "3".to_string(),
            template_name: "Lease".to_string(),
            template_link: "https://x/lease".to_string(),
        }]);

        let selection = FormSelection {
            agent_id: "u1".to_string(),
            template_id: "3".to_string(),
            property_id: "L1".to_string(),
            seller_name: "Seller".to_string(),
            customer_name: "Customer".to_string(),
            signing_place: "Lisbon".to_string(),
        };

        (cache, templates, selection)
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    #[tokio::test]
    async fn accepted_delivery_resets_the_form_and_reports_success() {
        let transport = ScriptedTransport::answering(Ok(WebhookResponse {
            status: 200,
            body: String::new(),
        }));
        let mut pipeline = SubmissionPipeline::new(transport.clone());
        let (cache, templates, mut selection) = fixtures();

        let report = pipeline
            .submit(&mut selection, &cache, &templates, at())
            .await;

        assert_eq!(report.banner.kind, BannerKind::Success);
        assert!(report.reset_form);
        assert!(selection.is_empty());
        assert_eq!(pipeline.state(), SubmitState::Idle);

        let delivered = transport.delivered.lock().expect("delivered");
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].agent_email, "ann@x.com");
        assert_eq!(delivered[0].contract_type, "https://x/lease");
    }

    #[tokio::test]
    async fn rejected_delivery_reports_status_and_body_without_reset() {
        let transport = ScriptedTransport::answering(Ok(WebhookResponse {
            status: 503,
            body: "unavailable".to_string(),
        }));
        let mut pipeline = SubmissionPipeline::new(transport.clone());
        let (cache, templates, mut selection) = fixtures();

        let report = pipeline
            .submit(&mut selection, &cache, &templates, at())
            .await;

        assert!(report.banner.is_error());
        assert!(report.banner.text.contains("503"));
        assert!(report.banner.text.contains("unavailable"));
        assert!(!report.reset_form);
        assert!(!selection.is_empty(), "failures preserve the form");
        assert_eq!(pipeline.state(), SubmitState::Idle, "control re-enables");
    }

    #[tokio::test]
    async fn transport_failure_reports_the_generic_network_banner() {
        let transport = ScriptedTransport::answering(Err(DeliveryError::Transport {
            message: "connection reset".to_string(),
        }));
        let mut pipeline = SubmissionPipeline::new(transport.clone());
        let (cache, templates, mut selection) = fixtures();

        let report = pipeline
            .submit(&mut selection, &cache, &templates, at())
            .await;

        assert!(report.banner.is_error());
        assert_eq!(
            report.banner.text,
            "Network error sending to webhook. Please check your connection."
        );
        assert!(!selection.is_empty());
        assert_eq!(pipeline.state(), SubmitState::Idle);
    }

    #[test]
    fn template_draft_appends_generated_name_and_timestamp() {
        let (_, _, selection) = fixtures();
        let draft = template_draft(&selection, at());

        assert_eq!(draft.name, "Template - 8/7/2026");
        assert_eq!(draft.created_at, "2026-08-07T12:00:00.000Z");
        assert_eq!(draft.contract_type, "3", "raw control value, not the link");

        let value = serde_json::to_value(&draft).expect("serialize draft");
        assert!(value.get("sellerName").is_some());
        assert!(value.get("created_at").is_some());
    }

    #[tokio::test]
    async fn template_creation_judges_the_envelope_not_the_transport() {
        let api = ScriptedTemplateApi {
            result: Arc::new(Mutex::new(Some(Ok(WriteEnvelope::failed("duplicate name"))))),
        };
        let mut flow = TemplateCreation::new(api);
        let (_, _, selection) = fixtures();

        let report = flow.create(&selection, at()).await;
        assert!(report.banner.is_error());
        assert_eq!(
            report.banner.text,
            "Error creating template: duplicate name"
        );
        assert!(!report.reset_form);
        assert_eq!(flow.state(), SubmitState::Idle);
    }

    #[tokio::test]
    async fn template_creation_success_and_network_failure_banners() {
        let ok_api = ScriptedTemplateApi {
            result: Arc::new(Mutex::new(Some(Ok(WriteEnvelope::ok())))),
        };
        let mut flow = TemplateCreation::new(ok_api);
        let (_, _, selection) = fixtures();
        let report = flow.create(&selection, at()).await;
        assert_eq!(report.banner.text, "Template created successfully!");
        assert_eq!(report.banner.kind, BannerKind::Success);

        let down_api = ScriptedTemplateApi {
            result: Arc::new(Mutex::new(Some(Err(DeliveryError::Transport {
                message: "refused".to_string(),
            })))),
        };
        let mut flow = TemplateCreation::new(down_api);
        let report = flow.create(&selection, at()).await;
        assert_eq!(report.banner.text, "Network error creating template");
        assert_eq!(flow.state(), SubmitState::Idle);
    }
}
