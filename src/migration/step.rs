//! A single registered version with its pair of actions.

use super::types::{Action, MigrationError};
use crate::version::{normalize, parse, SemVer};
use std::fmt;

/// A version label bound to an `up` action and its inverse `down` action.
///
/// Immutable once constructed. The normalized label is the step's identity
/// inside a [`VersionCollection`](super::VersionCollection).
pub struct VersionStep<C> {
    original: String,
    normalized: String,
    semver: SemVer,
    comment: Option<String>,
    up: Box<dyn Action<C>>,
    down: Box<dyn Action<C>>,
}

impl<C> VersionStep<C> {
    pub fn new(
        label: &str,
        up: Box<dyn Action<C>>,
        down: Box<dyn Action<C>>,
        comment: Option<String>,
    ) -> Result<Self, MigrationError> {
        let normalized = normalize(label, true)?;
        let semver = parse(&normalized)?;
        Ok(Self {
            original: label.to_string(),
            normalized,
            semver,
            comment,
            up,
            down,
        })
    }

    /// The label as it was registered, before normalization.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn semver(&self) -> &SemVer {
        &self.semver
    }

    pub fn major(&self) -> u64 {
        self.semver.major
    }

    pub fn minor(&self) -> u64 {
        self.semver.minor
    }

    pub fn patch(&self) -> u64 {
        self.semver.patch
    }

    pub fn prerelease(&self) -> &str {
        &self.semver.prerelease
    }

    pub fn build(&self) -> &str {
        &self.semver.build
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub(crate) fn up_action(&self) -> &dyn Action<C> {
        self.up.as_ref()
    }

    pub(crate) fn down_action(&self) -> &dyn Action<C> {
        self.down.as_ref()
    }
}

impl<C> fmt::Debug for VersionStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionStep")
            .field("version", &self.normalized)
            .field("original", &self.original)
            .field("comment", &self.comment)
            .finish_non_exhaustive()
    }
}

impl<C> fmt::Display for VersionStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "{}: {}", self.normalized, comment),
            None => write!(f, "{}", self.normalized),
        }
    }
}
