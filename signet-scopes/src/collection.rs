//! Unordered scope sets with a space-separated wire form.

use crate::algebra::{combine, combine_collections};
use crate::error::ScopeError;
use crate::pattern::Scope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A set of scopes representing anything permitted by any member.
///
/// Backed by an ordered set so that iteration, serialization and every
/// operation built on top are deterministic regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeCollection(BTreeSet<Scope>);

impl ScopeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scope: Scope) -> bool {
        self.0.insert(scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    /// Set union, without dominance reduction.
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Drop every member dominated by another member. The result is an
    /// antichain under subsumption and simplifying it again is a no-op.
    pub fn simplified(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|candidate| {
                    !self
                        .0
                        .iter()
                        .any(|other| other != *candidate && other.allows(candidate))
                })
                .cloned()
                .collect(),
        )
    }

    /// The pairwise meet of this collection with another.
    pub fn combine_with(&self, other: &Self) -> Self {
        combine_collections(self, other)
    }

    /// Strict check: is the (wildcard-free) `subject` matched by any member?
    pub fn allows(&self, subject: &Scope) -> bool {
        self.0.iter().any(|rule| rule.allows(subject))
    }

    /// Non-strict check: could `subject`, which may itself carry wildcards,
    /// ever intersect a permission granted by this collection?
    pub fn admits(&self, subject: &Scope) -> bool {
        self.0.iter().any(|rule| combine(rule, subject).is_some())
    }
}

impl fmt::Display for ScopeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(scope.as_str())?;
        }
        Ok(())
    }
}

/// Parses the wire form: a space-separated list of scope strings.
impl FromStr for ScopeCollection {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace().map(Scope::parse).collect()
    }
}

impl FromIterator<Scope> for ScopeCollection {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ScopeCollection {
    type Item = Scope;
    type IntoIter = std::collections::btree_set::IntoIter<Scope>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
