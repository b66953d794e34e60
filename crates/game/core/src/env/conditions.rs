//! Named condition oracle.

use crate::logic::Logic;

/// Lookup for reusable logic expressions referenced via `condition_ref`.
pub trait ConditionOracle: Send + Sync {
    fn condition(&self, id: &str) -> Option<&Logic>;
}
