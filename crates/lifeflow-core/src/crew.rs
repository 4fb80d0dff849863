//! Crew members: the subjects rules are evaluated for.

use crate::id::RuleId;
use crate::rule::RuleData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One crew member and their per-rule state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    /// Disabled members are skipped by every rule.
    pub disabled: bool,
    rules: BTreeMap<RuleId, RuleData>,
}

impl CrewMember {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            disabled: false,
            rules: BTreeMap::new(),
        }
    }

    pub fn rule(&self, id: RuleId) -> Option<&RuleData> {
        self.rules.get(&id)
    }

    /// Rule state, created on first reference.
    pub fn rule_mut(&mut self, id: RuleId, lifetime: bool) -> &mut RuleData {
        self.rules
            .entry(id)
            .or_insert_with(|| RuleData::new(lifetime))
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &RuleData)> {
        self.rules.iter().map(|(&id, data)| (id, data))
    }

    /// Reset every rule, keeping lifetime-flagged problems.
    pub fn recover(&mut self) {
        for data in self.rules.values_mut() {
            data.reset();
        }
    }
}
