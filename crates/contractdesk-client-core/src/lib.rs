//! Rendering-free core of the contract creation form.
//!
//! The form surface (a server-rendered page) owns nothing but markup; every
//! behavior behind it lives here so it can be exercised without a rendering
//! surface or a live network: the per-kind lookup caches, the dropdown
//! population flows and their retry policy, the change handlers, the webhook
//! payload assembly, and the submission/template-creation state machines.

pub mod cache;
pub mod dropdown;
pub mod envelope;
pub mod form;
pub mod payload;
pub mod records;
pub mod submit;
pub mod sync;

pub use cache::LookupCache;
pub use dropdown::{Dropdown, DropdownOption, DropdownSet, EntityKind};
pub use envelope::{FetchEnvelope, FetchError, WriteEnvelope};
pub use form::{AgentEmailDisplay, FormSelection};
pub use payload::{PAYLOAD_SOURCE, SubmissionPayload, assemble};
pub use submit::{
    Banner, BannerKind, DeliveryError, SubmissionPipeline, SubmitReport, SubmitState, TemplateApi,
    TemplateCreation, TemplateDraft, WebhookResponse, WebhookTransport, template_draft,
};
pub use sync::{
    DropdownSynchronizer, FetchOutcome, FormEngine, KindRecords, PopulateOutcome, ProxyApi,
    RetryPolicy, Sleeper,
};
