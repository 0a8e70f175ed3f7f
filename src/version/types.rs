//! Version types for semantic versioning support.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Error types for version operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid semver after normalization: {0}")]
    InvalidSemVer(String),
}

/// A parsed semantic version (`MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`).
///
/// `prerelease` and `build` are empty when absent. Ordering follows semver
/// precedence; build metadata only breaks ties so that `Ord` stays
/// consistent with `Eq`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prerelease: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub build: String,
}

impl SemVer {
    /// Create a new release version with no prerelease or build metadata.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: String::new(),
            build: String::new(),
        }
    }

    /// Parse any version-like string (normalizing it first).
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        super::parse(s)
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Semver precedence. Build metadata is ignored.
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence(other)
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two prerelease strings. An empty prerelease (a release) ranks
/// above any non-empty one.
pub(super) fn compare_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_identifier(x, y) {
                Ordering::Equal => continue,
                decided => return decided,
            },
        }
    }
}

fn is_numeric(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit())
}

/// Numeric identifiers compare by value and rank below alphanumeric ones.
fn compare_identifier(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => compare_digits(a, b),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

// Digit strings of any length, without going through an integer type.
pub(super) fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre(major: u64, minor: u64, patch: u64, prerelease: &str) -> SemVer {
        SemVer {
            prerelease: prerelease.to_string(),
            ..SemVer::new(major, minor, patch)
        }
    }

    #[test]
    fn test_semver_display() {
        let v = SemVer::new(1, 2, 3);
        assert_eq!(v.to_string(), "1.2.3");

        let v = SemVer {
            prerelease: "rc.1".to_string(),
            build: "sha.5114f85".to_string(),
            ..SemVer::new(1, 0, 0)
        };
        assert_eq!(v.to_string(), "1.0.0-rc.1+sha.5114f85");
    }

    #[test]
    fn test_semver_comparison() {
        let v1 = SemVer::new(1, 0, 0);
        let v2 = SemVer::new(2, 0, 0);
        let v3 = SemVer::new(1, 1, 0);
        let v4 = SemVer::new(1, 0, 1);
        let v5 = SemVer::new(1, 0, 0);

        assert!(v1 < v2);
        assert!(v1 < v3);
        assert!(v1 < v4);
        assert!(v1 == v5);
        assert!(v3 < v2);
        assert!(v4 < v3);
    }

    #[test]
    fn test_release_outranks_prerelease() {
        assert!(pre(1, 0, 0, "rc.1") < SemVer::new(1, 0, 0));
        assert!(pre(1, 0, 0, "rc.1") > SemVer::new(0, 9, 9));
        assert!(pre(1, 0, 0, "rc.1").is_prerelease());
        assert!(!SemVer::new(1, 0, 0).is_prerelease());
    }

    #[test]
    fn test_prerelease_identifiers() {
        assert!(pre(1, 0, 0, "alpha") < pre(1, 0, 0, "alpha.1"));
        assert!(pre(1, 0, 0, "alpha.1") < pre(1, 0, 0, "alpha.beta"));
        assert!(pre(1, 0, 0, "beta.2") < pre(1, 0, 0, "beta.11"));
        assert!(pre(1, 0, 0, "beta.11") < pre(1, 0, 0, "rc.1"));
        assert!(pre(1, 0, 0, "1") < pre(1, 0, 0, "a"));
    }

    #[test]
    fn test_numeric_identifiers_beyond_u64() {
        let big = "123456789012345678901234567890";
        assert!(pre(1, 0, 0, "9") < pre(1, 0, 0, big));
        assert_eq!(compare_digits("007", "7"), Ordering::Equal);
    }

    #[test]
    fn test_build_ignored_for_precedence() {
        let a = SemVer::new(1, 1, 0);
        let b = SemVer {
            build: "build.123".to_string(),
            ..SemVer::new(1, 1, 0)
        };
        assert_eq!(a.precedence(&b), Ordering::Equal);
        assert_ne!(a, b);
        assert!(a < b);
    }
}
