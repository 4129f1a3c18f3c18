use crate::records::{AgentRecord, PropertyRecord, TemplateRecord};

/// The three entity kinds the form synchronizes from the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Agents,
    Templates,
    Properties,
}

impl EntityKind {
    pub const ALL: [Self; 3] = [Self::Agents, Self::Templates, Self::Properties];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Templates => "contract_templates",
            Self::Properties => "listings",
        }
    }

    #[must_use]
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Agents => "Select agent",
            Self::Templates => "Select contract type",
            Self::Properties => "Select a property",
        }
    }
}

/// One option in a selection control. The template dropdown stashes the
/// display name and target link on its options; payload assembly reads them
/// back from whichever option is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
    pub contract_type: Option<String>,
    pub template_link: Option<String>,
}

impl DropdownOption {
    fn placeholder(kind: EntityKind) -> Self {
        Self {
            value: String::new(),
            label: kind.placeholder().to_string(),
            contract_type: None,
            template_link: None,
        }
    }
}

/// A selection control's full option list. The first option is always the
/// kind's placeholder with an empty value; rebuilding from records replaces
/// everything after it, so repopulating is idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropdown {
    kind: EntityKind,
    options: Vec<DropdownOption>,
}

impl Dropdown {
    #[must_use]
    pub fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            options: vec![DropdownOption::placeholder(kind)],
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Placeholder first, then one option per record in the order the proxy
    /// returned them (the per-kind ordering contract lives upstream).
    #[must_use]
    pub fn options(&self) -> &[DropdownOption] {
        &self.options
    }

    #[must_use]
    pub fn is_placeholder_only(&self) -> bool {
        self.options.len() == 1
    }

    /// The option matching a selected value. The placeholder's empty value
    /// never matches, so "no selection" resolves to `None`.
    #[must_use]
    pub fn selected(&self, value: &str) -> Option<&DropdownOption> {
        if value.is_empty() {
            return None;
        }
        self.options.iter().find(|option| option.value == value)
    }

    pub fn rebuild_from_agents(&mut self, records: &[AgentRecord]) {
        self.rebuild(records.iter().map(|record| DropdownOption {
            value: record.user_id.clone(),
            label: record.option_label(),
            contract_type: None,
            template_link: None,
        }));
    }

    pub fn rebuild_from_templates(&mut self, records: &[TemplateRecord]) {
        self.rebuild(records.iter().map(|record| DropdownOption {
            value: record.id.clone(),
            label: record.option_label(),
            contract_type: Some(record.template_name.clone()),
            template_link: Some(record.template_link.clone()),
        }));
    }

    pub fn rebuild_from_properties(&mut self, records: &[PropertyRecord]) {
        self.rebuild(records.iter().map(|record| DropdownOption {
            value: record.list_num.clone(),
            label: record.option_label(),
            contract_type: None,
            template_link: None,
        }));
    }

    fn rebuild(&mut self, options: impl Iterator<Item = DropdownOption>) {
        let mut rebuilt = vec![DropdownOption::placeholder(self.kind)];
        rebuilt.extend(options);
        self.options = rebuilt;
    }
}

/// The three controls of the form, one per entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownSet {
    pub agents: Dropdown,
    pub templates: Dropdown,
    pub properties: Dropdown,
}

impl Default for DropdownSet {
    fn default() -> Self {
        Self {
            agents: Dropdown::empty(EntityKind::Agents),
            templates: Dropdown::empty(EntityKind::Templates),
            properties: Dropdown::empty(EntityKind::Properties),
        }
    }
}

impl DropdownSet {
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> &Dropdown {
        match kind {
            EntityKind::Agents => &self.agents,
            EntityKind::Templates => &self.templates,
            EntityKind::Properties => &self.properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str, name: &str, link: &str) -> TemplateRecord {
        TemplateRecord {
            id: id.to_string(),
            template_name: name.to_string(),
            template_link: link.to_string(),
        }
    }

    #[test]
    fn empty_dropdown_is_placeholder_only() {
        let dropdown = Dropdown::empty(EntityKind::Agents);
        assert!(dropdown.is_placeholder_only());
        assert_eq!(dropdown.options()[0].value, "");
        assert_eq!(dropdown.options()[0].label, "Select agent");
    }

    #[test]
    fn rebuild_keeps_placeholder_first_and_record_order() {
        let mut dropdown = Dropdown::empty(EntityKind::Properties);
        dropdown.rebuild_from_properties(&[
            PropertyRecord {
                list_num: "L2".to_string(),
                list_name: "Cedar House".to_string(),
            },
            PropertyRecord {
                list_num: "L1".to_string(),
                list_name: "Apple Flat".to_string(),
            },
        ]);

        let options = dropdown.options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].label, "Select a property");
        assert_eq!(options[1].label, "[L2 Cedar House]");
        assert_eq!(options[2].label, "[L1 Apple Flat]");
    }

    #[test]
    fn rebuild_twice_with_same_records_is_idempotent() {
        let records = [template("1", "Exclusive Sale", "https://x/1")];
        let mut dropdown = Dropdown::empty(EntityKind::Templates);
        dropdown.rebuild_from_templates(&records);
        let first = dropdown.clone();
        dropdown.rebuild_from_templates(&records);
        assert_eq!(dropdown, first);
        assert_eq!(dropdown.options().len(), 2);
    }

    #[test]
    fn template_options_carry_name_and_link_attributes() {
        let mut dropdown = Dropdown::empty(EntityKind::Templates);
        dropdown.rebuild_from_templates(&[template("7", "Lease", "https://x/lease")]);

        let option = dropdown.selected("7").expect("template option");
        assert_eq!(option.label, "Lease");
        assert_eq!(option.contract_type.as_deref(), Some("Lease"));
        assert_eq!(option.template_link.as_deref(), Some("https://x/lease"));
    }

    #[test]
    fn empty_value_never_selects_the_placeholder() {
        let dropdown = Dropdown::empty(EntityKind::Agents);
        assert!(dropdown.selected("").is_none());
        assert!(dropdown.selected("u1").is_none());
    }
}
