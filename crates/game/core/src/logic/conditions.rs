use std::collections::BTreeMap;

use super::Logic;
use crate::env::ConditionOracle;

/// Named, reusable conditions referenced through `condition_ref`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionRegistry {
    conditions: BTreeMap<String, Logic>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a condition, returning the one it replaced.
    pub fn insert(&mut self, id: impl Into<String>, logic: Logic) -> Option<Logic> {
        self.conditions.insert(id.into(), logic)
    }

    pub fn get(&self, id: &str) -> Option<&Logic> {
        self.conditions.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl ConditionOracle for ConditionRegistry {
    fn condition(&self, id: &str) -> Option<&Logic> {
        self.get(id)
    }
}
