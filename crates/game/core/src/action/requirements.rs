//! Component requirement sets.
use std::collections::BTreeSet;
use std::fmt;

/// A deduplicated, ordered set of component ids.
///
/// Iteration is sorted so every derived list (missing components, trace
/// payloads) is deterministic.
///
/// ```
/// use game_core::RequirementSet;
///
/// let required: RequirementSet = ["core:position", "core:inventory"].into_iter().collect();
/// let actor: RequirementSet = ["core:position", "core:name"].into_iter().collect();
///
/// assert!(!required.is_subset(&actor));
/// assert_eq!(required.missing_from(&actor), ["core:inventory"]);
/// assert_eq!(required.intersection(&actor).to_vec(), ["core:position"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RequirementSet(BTreeSet<String>);

impl RequirementSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `component`; returns `false` if it was already present.
    pub fn insert(&mut self, component: impl Into<String>) -> bool {
        self.0.insert(component.into())
    }

    /// Whether `component` is in the set.
    pub fn contains(&self, component: &str) -> bool {
        self.0.contains(component)
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Component ids in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Components in either set.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Components in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Components in `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    /// Whether every component of `self` is in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Whether the sets share no component.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.0.is_disjoint(&other.0)
    }

    /// Required components absent from `present`, in sorted order.
    pub fn missing_from(&self, present: &Self) -> Vec<String> {
        self.0.difference(&present.0).cloned().collect()
    }

    /// Owned copy of the component ids, sorted.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for RequirementSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for RequirementSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a RequirementSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for RequirementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, component) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(component)?;
        }
        f.write_str("]")
    }
}
