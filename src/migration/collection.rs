//! Ordered, uniquely keyed set of version steps.

use super::step::VersionStep;
use super::types::MigrationError;
use crate::version::normalize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Registered versions, always sorted by semver precedence.
///
/// Steps are keyed by their normalized label. The collection also carries
/// the in-memory active marker, which can only point at a member.
pub struct VersionCollection<C> {
    steps: Vec<VersionStep<C>>,
    index: HashMap<String, usize>,
    active: Option<String>,
}

impl<C> VersionCollection<C> {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            index: HashMap::new(),
            active: None,
        }
    }

    /// Insert a step at its sorted position.
    pub fn add(&mut self, step: VersionStep<C>) -> Result<&VersionStep<C>, MigrationError> {
        if self.index.contains_key(step.normalized()) {
            return Err(MigrationError::DuplicateVersion(step.normalized().to_string()));
        }

        let position = self
            .steps
            .partition_point(|existing| sort_order(existing, &step) == Ordering::Less);
        self.steps.insert(position, step);
        self.reindex_from(position);

        Ok(&self.steps[position])
    }

    /// Position of `key` (normalized first) in sort order.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        let normalized = normalize(key, true).ok()?;
        self.index.get(&normalized).copied()
    }

    pub fn get(&self, key: &str) -> Option<&VersionStep<C>> {
        self.index_of(key).map(|i| &self.steps[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    /// Positional access. Negative indices count from the end (`-1` is the
    /// last step).
    pub fn at(&self, index: isize) -> Option<&VersionStep<C>> {
        let resolved = if index < 0 {
            self.steps.len().checked_sub(index.unsigned_abs())?
        } else {
            index.unsigned_abs()
        };
        self.steps.get(resolved)
    }

    pub fn first(&self) -> Option<&VersionStep<C>> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&VersionStep<C>> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Read-only ordered view.
    pub fn items(&self) -> &[VersionStep<C>] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VersionStep<C>> {
        self.steps.iter()
    }

    /// Normalized labels in sort order.
    pub fn labels(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| s.normalized().to_string())
            .collect()
    }

    pub fn active(&self) -> Option<&VersionStep<C>> {
        self.active.as_deref().and_then(|key| self.get(key))
    }

    /// Point the active marker at an existing member.
    pub fn set_active(&mut self, key: &str) -> Result<&VersionStep<C>, MigrationError> {
        let position = self
            .index_of(key)
            .ok_or_else(|| MigrationError::VersionNotFound(key.to_string()))?;
        let step = &self.steps[position];
        self.active = Some(step.normalized().to_string());
        Ok(step)
    }

    pub fn unset_active(&mut self) {
        self.active = None;
    }

    fn reindex_from(&mut self, position: usize) {
        for (i, step) in self.steps.iter().enumerate().skip(position) {
            self.index.insert(step.normalized().to_string(), i);
        }
    }
}

impl<C> Default for VersionCollection<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, C> IntoIterator for &'a VersionCollection<C> {
    type Item = &'a VersionStep<C>;
    type IntoIter = std::slice::Iter<'a, VersionStep<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Semver precedence, then the registered labels as a stable tie-break.
fn sort_order<C>(a: &VersionStep<C>, b: &VersionStep<C>) -> Ordering {
    a.semver()
        .precedence(b.semver())
        .then_with(|| a.original().cmp(b.original()))
}
