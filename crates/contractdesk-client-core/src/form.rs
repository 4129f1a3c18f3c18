use crate::cache::LookupCache;
use crate::dropdown::Dropdown;

/// The current value of every form control, snapshotted at request time.
/// Lives for one submission; `reset` returns it to the initial empty state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSelection {
    pub agent_id: String,
    pub template_id: String,
    pub property_id: String,
    pub seller_name: String,
    pub customer_name: String,
    pub signing_place: String,
}

impl FormSelection {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What the email line under the agent dropdown shows after a change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEmailDisplay {
    /// No agent selected; the element is hidden entirely.
    Hidden,
    /// Agent selected but no usable email (missing from cache counts too).
    NotAvailable,
    SendTo(String),
}

impl AgentEmailDisplay {
    /// The visible text, or `None` when the element is hidden.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Hidden => None,
            Self::NotAvailable => Some("Agent Email: Not available".to_string()),
            Self::SendTo(email) => Some(format!("Contract will be sent to: {email}")),
        }
    }
}

/// Agent change handler: resolves the selected identifier against the cache.
/// An identifier missing from the cache is "not available", never an error.
#[must_use]
pub fn on_agent_change(agent_id: &str, cache: &LookupCache) -> AgentEmailDisplay {
    if agent_id.is_empty() {
        return AgentEmailDisplay::Hidden;
    }
    match cache.agent(agent_id) {
        Some(record) if !record.user_email.is_empty() => {
            AgentEmailDisplay::SendTo(record.user_email.clone())
        }
        _ => AgentEmailDisplay::NotAvailable,
    }
}

/// Summary of a contract-type selection, for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTypeSelection {
    pub template_id: String,
    pub template_name: Option<String>,
}

/// Contract-type change handler. Observational: mutates nothing shared.
#[must_use]
pub fn on_contract_type_change(
    template_id: &str,
    templates: &Dropdown,
) -> Option<ContractTypeSelection> {
    if template_id.is_empty() {
        return None;
    }
    Some(ContractTypeSelection {
        template_id: template_id.to_string(),
        template_name: templates
            .selected(template_id)
            .map(|option| option.label.clone()),
    })
}

/// Summary of a property selection, for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySelection {
    pub list_num: String,
    pub list_name: Option<String>,
}

/// Property change handler. Observational: mutates nothing shared.
#[must_use]
pub fn on_property_change(property_id: &str, cache: &LookupCache) -> Option<PropertySelection> {
    if property_id.is_empty() {
        return None;
    }
    Some(PropertySelection {
        list_num: property_id.to_string(),
        list_name: cache
            .property(property_id)
            .map(|record| record.list_name.clone()),
    })
}
