//! Traits describing the read-only collaborators of the pipeline.
//!
//! Oracles expose entity data, scope queries and named conditions. The [`Env`]
//! aggregate bundles them so every stage can reach what it needs without hard
//! coupling to concrete implementations.
mod conditions;
mod entities;
mod scopes;

use std::collections::BTreeMap;

pub use conditions::ConditionOracle;
pub use entities::EntityOracle;
pub use scopes::ScopeOracle;

use crate::logic::OperatorRegistry;
use crate::state::WorldContext;

static EMPTY_WORLD: WorldContext = WorldContext {
    turn: 0,
    globals: BTreeMap::new(),
};

/// Aggregates the read-only oracles required by the discovery pipeline.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    entities: &'a dyn EntityOracle,
    scopes: &'a dyn ScopeOracle,
    conditions: Option<&'a dyn ConditionOracle>,
    operators: Option<&'a OperatorRegistry>,
    world: Option<&'a WorldContext>,
}

impl<'a> Env<'a> {
    pub fn new(entities: &'a dyn EntityOracle, scopes: &'a dyn ScopeOracle) -> Self {
        Self {
            entities,
            scopes,
            conditions: None,
            operators: None,
            world: None,
        }
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: &'a dyn ConditionOracle) -> Self {
        self.conditions = Some(conditions);
        self
    }

    #[must_use]
    pub fn with_operators(mut self, operators: &'a OperatorRegistry) -> Self {
        self.operators = Some(operators);
        self
    }

    #[must_use]
    pub fn with_world(mut self, world: &'a WorldContext) -> Self {
        self.world = Some(world);
        self
    }

    pub fn entities(&self) -> &'a dyn EntityOracle {
        self.entities
    }

    pub fn scopes(&self) -> &'a dyn ScopeOracle {
        self.scopes
    }

    pub fn conditions(&self) -> Option<&'a dyn ConditionOracle> {
        self.conditions
    }

    pub fn operators(&self) -> Option<&'a OperatorRegistry> {
        self.operators
    }

    /// World singletons; an empty turn-0 world when none was supplied.
    pub fn world(&self) -> &'a WorldContext {
        self.world.unwrap_or(&EMPTY_WORLD)
    }
}

impl core::fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Env")
            .field("conditions", &self.conditions.is_some())
            .field("operators", &self.operators.is_some())
            .field("world", self.world())
            .finish_non_exhaustive()
    }
}
