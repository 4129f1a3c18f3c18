use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::LookupCache;
use crate::dropdown::Dropdown;
use crate::form::FormSelection;

/// Fixed tag identifying this application to the receiving workflow.
pub const PAYLOAD_SOURCE: &str = "contract-creator-form";

/// The webhook wire shape. Field names are fixed by the receiving workflow;
/// every field is always present, with absent selections as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub agent: String,
    pub agent_email: String,
    pub contract_type: String,
    pub contract_name_type: String,
    pub property_id: String,
    pub seller_name: String,
    pub customer_name: String,
    pub signing_place: String,
    pub timestamp: String,
    pub source: String,
}

/// Joins the submitted selection against the lookup cache and the template
/// dropdown's auxiliary attributes. Never fails: a selection whose identifier
/// is missing from the cache (stale page, mid-refresh submit) yields empty
/// strings for the derived fields.
#[must_use]
pub fn assemble(
    selection: &FormSelection,
    cache: &LookupCache,
    templates: &Dropdown,
    submitted_at: DateTime<Utc>,
) -> SubmissionPayload {
    let template_option = templates.selected(&selection.template_id);

    SubmissionPayload {
        agent: selection.agent_id.clone(),
        agent_email: cache.agent_email(&selection.agent_id),
        contract_type: template_option
            .and_then(|option| option.template_link.clone())
            .unwrap_or_default(),
        contract_name_type: template_option
            .and_then(|option| option.contract_type.clone())
            .unwrap_or_default(),
        property_id: selection.property_id.clone(),
        seller_name: selection.seller_name.clone(),
        customer_name: selection.customer_name.clone(),
        signing_place: selection.signing_place.clone(),
        timestamp: submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        source: PAYLOAD_SOURCE.to_string(),
    }
}
