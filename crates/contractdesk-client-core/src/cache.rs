use std::collections::HashMap;

use crate::records::{AgentRecord, PropertyRecord, TemplateRecord};

/// The in-memory lookups behind the three dropdowns, keyed by record
/// identifier.
///
/// A slot is `None` until its population flow has succeeded at least once;
/// every successful population replaces the whole map in one assignment.
/// Entries are never mutated individually.
#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    agents: Option<HashMap<String, AgentRecord>>,
    templates: Option<HashMap<String, TemplateRecord>>,
    properties: Option<HashMap<String, PropertyRecord>>,
}

impl LookupCache {
    pub fn replace_agents(&mut self, records: Vec<AgentRecord>) {
        self.agents = Some(
            records
                .into_iter()
                .map(|record| (record.user_id.clone(), record))
                .collect(),
        );
    }

    pub fn replace_templates(&mut self, records: Vec<TemplateRecord>) {
        self.templates = Some(
            records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        );
    }

    pub fn replace_properties(&mut self, records: Vec<PropertyRecord>) {
        self.properties = Some(
            records
                .into_iter()
                .map(|record| (record.list_num.clone(), record))
                .collect(),
        );
    }

    #[must_use]
    pub fn agent(&self, user_id: &str) -> Option<&AgentRecord> {
        self.agents.as_ref().and_then(|map| map.get(user_id))
    }

    #[must_use]
    pub fn template(&self, id: &str) -> Option<&TemplateRecord> {
        self.templates.as_ref().and_then(|map| map.get(id))
    }

    #[must_use]
    pub fn property(&self, list_num: &str) -> Option<&PropertyRecord> {
        self.properties.as_ref().and_then(|map| map.get(list_num))
    }

    /// Email join for payload assembly. Absent agents and absent emails both
    /// degrade to an empty string; selection is never an error.
    #[must_use]
    pub fn agent_email(&self, user_id: &str) -> String {
        self.agent(user_id)
            .map(|record| record.user_email.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn agents_populated(&self) -> bool {
        self.agents.is_some()
    }

    #[must_use]
    pub fn templates_populated(&self) -> bool {
        self.templates.is_some()
    }

    #[must_use]
    pub fn properties_populated(&self) -> bool {
        self.properties.is_some()
    }

    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.as_ref().map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.as_ref().map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.as_ref().map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, name: &str, email: &str) -> AgentRecord {
        AgentRecord {
            user_id: id.to_string(),
            user_name: name.to_string(),
            user_email: email.to_string(),
        }
    }

    #[test]
    fn slots_are_unpopulated_until_first_replace() {
        let cache = LookupCache::default();
        assert!(!cache.agents_populated());
        assert!(!cache.templates_populated());
        assert!(!cache.properties_populated());
        assert!(cache.agent("u1").is_none());
    }

    #[test]
    fn replace_is_wholesale_not_a_merge() {
        let mut cache = LookupCache::default();
        cache.replace_agents(vec![agent("u1", "Ann", "ann@x.com")]);
        assert_eq!(cache.agent_count(), 1);

        cache.replace_agents(vec![agent("u2", "Bo", "")]);
        assert_eq!(cache.agent_count(), 1);
        assert!(cache.agent("u1").is_none(), "old entries must not survive");
        assert!(cache.agent("u2").is_some());
    }

    #[test]
    fn replace_keys_records_by_identifier() {
        let mut cache = LookupCache::default();
        cache.replace_agents(vec![
            agent("u1", "Ann", "ann@x.com"),
            agent("u2", "Bo", "bo@x.com"),
        ]);
        assert_eq!(
            cache.agent("u1").map(|record| record.user_name.as_str()),
            Some("Ann")
        );
        assert_eq!(cache.agent_email("u2"), "bo@x.com");
    }

    #[test]
    fn email_join_degrades_to_empty_string() {
        let mut cache = LookupCache::default();
        assert_eq!(cache.agent_email("u9"), "");

        cache.replace_agents(vec![agent("u1", "Ann", "")]);
        assert_eq!(cache.agent_email("u1"), "");
        assert_eq!(cache.agent_email("missing"), "");
    }

    #[test]
    fn replacing_with_empty_still_counts_as_populated() {
        let mut cache = LookupCache::default();
        cache.replace_properties(Vec::new());
        assert!(cache.properties_populated());
        assert_eq!(cache.property_count(), 0);
    }
}
