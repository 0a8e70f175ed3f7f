//! Types for the migration system.

use crate::version::{normalize, VersionError};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type produced by actions and active-version stores.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    #[error("Version {0} is already registered")]
    DuplicateVersion(String),

    #[error("Version {0} is not registered")]
    VersionNotFound(String),

    #[error("Cannot resolve migration target {0}")]
    TargetNotFound(String),

    #[error("No active version")]
    NoActiveVersion,

    #[error("Upgrade to {version} failed: {source}")]
    UpgradeFailed {
        version: String,
        #[source]
        source: BoxError,
    },

    #[error("Downgrade from {version} failed: {source}")]
    DowngradeFailed {
        version: String,
        #[source]
        source: BoxError,
    },

    #[error("Uninstall of {version} failed: {source}")]
    UninstallFailed {
        version: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to persist active version {}: {source}", .version.as_deref().unwrap_or("(unset)"))]
    PersistenceFailed {
        version: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("Failed to read active version: {0}")]
    StoreUnavailable(#[source] BoxError),
}

/// One direction of a version step.
///
/// Implementations receive the engine's shared context by reference and
/// must not assume anything about which other steps have run.
#[async_trait]
pub trait Action<C>: Send + Sync {
    async fn run(&self, ctx: &C) -> Result<(), BoxError>;
}

/// Adapts a synchronous closure into an [`Action`].
pub struct FnAction<F>(F);

/// Wrap a closure as an [`Action`].
pub fn from_fn<C, F>(f: F) -> FnAction<F>
where
    C: Sync,
    F: Fn(&C) -> Result<(), BoxError> + Send + Sync,
{
    FnAction(f)
}

#[async_trait]
impl<C, F> Action<C> for FnAction<F>
where
    C: Sync,
    F: Fn(&C) -> Result<(), BoxError> + Send + Sync,
{
    async fn run(&self, ctx: &C) -> Result<(), BoxError> {
        (self.0)(ctx)
    }
}

/// Where an `up` or `down` request should end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Highest registered version.
    Latest,
    /// Lowest registered version.
    Initial,
    /// Next major group (up) or previous major group (down).
    Major,
    /// Next minor within the same major (up) or previous one (down).
    Minor,
    /// Next patch within the same major.minor (up) or previous one (down).
    Patch,
    /// An explicit version label, matched after normalization.
    Version(String),
}

impl FromStr for Target {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "latest" => Ok(Self::Latest),
            "initial" => Ok(Self::Initial),
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            label => Ok(Self::Version(normalize(label, true)?)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Initial => write!(f, "initial"),
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Version(label) => write!(f, "{label}"),
        }
    }
}

/// Value accepted by `set_active_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveTarget {
    Unset,
    Latest,
    Initial,
    Version(String),
}

impl FromStr for ActiveTarget {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "unset" => Ok(Self::Unset),
            "latest" => Ok(Self::Latest),
            "initial" => Ok(Self::Initial),
            label => Ok(Self::Version(normalize(label, true)?)),
        }
    }
}

impl fmt::Display for ActiveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Latest => write!(f, "latest"),
            Self::Initial => write!(f, "initial"),
            Self::Version(label) => write!(f, "{label}"),
        }
    }
}

/// A resolved migration path over the sorted collection.
///
/// An index is `None` when its label is not registered: an explicit target
/// that was never added, or an active version the store reports but the
/// collection does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub from: String,
    pub from_index: Option<usize>,
    pub to: String,
    pub to_index: Option<usize>,
    /// Nothing was active yet; `from` fell back to the lowest version.
    pub is_initial: bool,
}

/// Snapshot reported by `MigrationExecutor::status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub active: Option<String>,
    pub latest: Option<String>,
    /// Registered versions above the active one.
    pub pending: usize,
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Upgrading to a newer version.
    Up,
    /// Downgrading to an older version.
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}
