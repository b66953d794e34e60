//! Scope query oracle.

use crate::scope::{ScopeContext, ScopeError};
use crate::state::EntityId;

/// Resolves a scope expression into an ordered list of candidate ids.
///
/// The pipeline treats implementations as a black box: the returned order is
/// preserved through truncation, so implementations must be deterministic for
/// a fixed entity snapshot.
pub trait ScopeOracle: Send + Sync {
    fn resolve_scope(
        &self,
        scope: &str,
        ctx: &ScopeContext<'_>,
    ) -> Result<Vec<EntityId>, ScopeError>;
}
