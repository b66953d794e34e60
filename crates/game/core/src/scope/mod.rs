//! Scope definitions and the built-in scope query engine.
//!
//! A scope selects candidate entities for a target slot. Definitions are
//! data: a source producing an ordered id list, an anchor the source is
//! relative to, and an optional filter expression applied per candidate.
//!
//! ```json
//! {
//!   "id": "core:matching_keys",
//!   "source": "inventory",
//!   "filter": { "==": [
//!     { "var": "entity.components.core:key.keyType" },
//!     { "var": "target.components.core:lock.lockType" }
//!   ] }
//! }
//! ```
//!
//! Two scope ids are reserved: `none` resolves to nothing and `self` to the
//! actor.
mod error;

pub use error::ScopeError;

use std::collections::BTreeMap;

use crate::env::{EntityOracle, ScopeOracle};
use crate::logic::{EvaluationContext, Evaluator, Logic};
use crate::state::{EntityId, EntitySnapshot};

pub const SCOPE_NONE: &str = "none";
pub const SCOPE_SELF: &str = "self";

/// Where a scope's candidate ids come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[derive(strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScopeSource {
    /// The acting entity.
    Actor,
    /// Entities placed at the anchor's location.
    Location,
    /// Items listed in the anchor's inventory.
    Inventory,
    /// Every entity in the store.
    All,
}

/// The entity a scope source is evaluated relative to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeAnchor {
    #[default]
    Actor,
    /// The entity bound to the slot the resolving slot depends on.
    Context,
}

/// Inputs available while resolving one scope.
#[derive(Clone, Debug)]
pub struct ScopeContext<'a> {
    evaluator: Evaluator<'a>,
    base: EvaluationContext<'a>,
}

impl<'a> ScopeContext<'a> {
    /// `base` carries the actor, the context entity as `target` and any
    /// slots bound so far.
    pub fn new(evaluator: Evaluator<'a>, base: EvaluationContext<'a>) -> Self {
        Self { evaluator, base }
    }

    pub fn actor(&self) -> &'a EntitySnapshot {
        self.base.actor()
    }

    /// The dependency entity for dependent slots.
    pub fn context_entity(&self) -> Option<&'a EntitySnapshot> {
        self.base.entity_at("target")
    }

    pub fn entities(&self) -> &'a dyn EntityOracle {
        self.evaluator.env().entities()
    }

    pub fn evaluator(&self) -> &Evaluator<'a> {
        &self.evaluator
    }

    pub fn base(&self) -> &EvaluationContext<'a> {
        &self.base
    }
}

/// A named scope.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScopeDefinition {
    pub id: String,
    pub source: ScopeSource,
    #[serde(default)]
    pub anchor: ScopeAnchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Logic>,
}

impl ScopeDefinition {
    pub fn new(id: impl Into<String>, source: ScopeSource) -> Self {
        Self {
            id: id.into(),
            source,
            anchor: ScopeAnchor::Actor,
            filter: None,
        }
    }

    #[must_use]
    pub fn anchored_to(mut self, anchor: ScopeAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    #[must_use]
    pub fn filtered(mut self, filter: Logic) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Produces candidate ids in source order, then applies the filter.
    pub fn resolve(&self, ctx: &ScopeContext<'_>) -> Result<Vec<EntityId>, ScopeError> {
        let anchor = match self.anchor {
            ScopeAnchor::Actor => ctx.actor(),
            ScopeAnchor::Context => ctx.context_entity().ok_or_else(|| ScopeError::MissingContext {
                scope: self.id.clone(),
            })?,
        };
        let entities = ctx.entities();

        let ids = match self.source {
            ScopeSource::Actor => vec![ctx.actor().id.clone()],
            ScopeSource::Location => match anchor.location() {
                Some(location) => entities.entities_at(location)?,
                None => Vec::new(),
            },
            ScopeSource::Inventory => anchor.inventory(),
            ScopeSource::All => entities.entity_ids()?,
        };

        let Some(filter) = &self.filter else {
            return Ok(ids);
        };

        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(candidate) = entities.entity(&id)? else {
                continue;
            };
            let candidate_ctx = ctx.base().clone().with_entity(candidate);
            let passed = ctx
                .evaluator()
                .test(filter, &candidate_ctx)
                .map_err(|source| ScopeError::Filter {
                    scope: self.id.clone(),
                    source,
                })?;
            if passed {
                kept.push(id);
            }
        }
        Ok(kept)
    }
}

/// Scope definitions keyed by id; the default [`ScopeOracle`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeRegistry {
    scopes: BTreeMap<String, ScopeDefinition>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a definition, returning the one it replaced.
    pub fn insert(&mut self, scope: ScopeDefinition) -> Option<ScopeDefinition> {
        self.scopes.insert(scope.id.clone(), scope)
    }

    /// Looks a scope up by id.
    pub fn get(&self, id: &str) -> Option<&ScopeDefinition> {
        self.scopes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        id == SCOPE_NONE || id == SCOPE_SELF || self.scopes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl FromIterator<ScopeDefinition> for ScopeRegistry {
    fn from_iter<T: IntoIterator<Item = ScopeDefinition>>(iter: T) -> Self {
        let mut registry = Self::new();
        for scope in iter {
            registry.insert(scope);
        }
        registry
    }
}

impl ScopeOracle for ScopeRegistry {
    fn resolve_scope(&self, scope: &str, ctx: &ScopeContext<'_>) -> Result<Vec<EntityId>, ScopeError> {
        match scope {
            SCOPE_NONE => Ok(Vec::new()),
            SCOPE_SELF => Ok(vec![ctx.actor().id.clone()]),
            id => self
                .get(id)
                .ok_or_else(|| ScopeError::UnknownScope(id.to_owned()))?
                .resolve(ctx),
        }
    }
}
