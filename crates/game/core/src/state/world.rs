use std::collections::BTreeMap;

use serde_json::Value;

/// World-level values predicates may read through `world.*` paths.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorldContext {
    /// Current turn number.
    pub turn: u64,
    /// Additional named singletons (weather, time of day, ...).
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,
}

impl WorldContext {
    pub fn new(turn: u64) -> Self {
        Self {
            turn,
            globals: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_global(mut self, key: impl Into<String>, value: Value) -> Self {
        self.globals.insert(key.into(), value);
        self
    }

    /// Resolves the first segment of a `world.*` path.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "turn" => Some(Value::from(self.turn)),
            other => self.globals.get(other).cloned(),
        }
    }
}
