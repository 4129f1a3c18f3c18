use serde::{Deserialize, Serialize};

/// An agent the contract can be assigned to (the datastore `users` table,
/// restricted to the columns the form consumes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub user_id: String,
    pub user_name: String,
    /// May be empty; the form then shows the email as not available.
    #[serde(default)]
    pub user_email: String,
}

/// A contract template (the datastore `contract_templates` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    pub template_name: String,
    #[serde(default)]
    pub template_link: String,
}

/// A property listing (the datastore `listings` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub list_num: String,
    pub list_name: String,
}

impl AgentRecord {
    /// Label shown in the agent dropdown.
    #[must_use]
    pub fn option_label(&self) -> String {
        format!("[{} {}]", self.user_id, self.user_name)
    }
}

impl TemplateRecord {
    /// Templates render their display name only; the name and target link
    /// ride along as auxiliary option attributes.
    #[must_use]
    pub fn option_label(&self) -> String {
        self.template_name.clone()
    }
}

impl PropertyRecord {
    #[must_use]
    pub fn option_label(&self) -> String {
        format!("[{} {}]", self.list_num, self.list_name)
    }
}
