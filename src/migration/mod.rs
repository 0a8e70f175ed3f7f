//! Version-step migration engine.
//!
//! This module drives an ordered sequence of reversible version steps.
//! Each step pairs a semantic version with an `up` action and its inverse
//! `down` action; the executor works out which steps lie between the
//! active version and a requested target and runs them one at a time.
//!
//! # Overview
//!
//! - Steps are registered on a `MigrationExecutor` and kept sorted in a
//!   `VersionCollection`
//! - Targets are `latest`, `initial`, `major`, `minor`, `patch` or an
//!   explicit version
//! - The active version is persisted after every successful step, either
//!   in memory or through an `ActiveVersionStore`
//! - A failed step halts the run; earlier steps stay applied and recorded
//!
//! # Usage
//!
//! ```ignore
//! let mut executor = MigrationExecutor::new(pool);
//! executor.add_version("1.0.0", CreateUsers, DropUsers, Some("users table"))?;
//! executor.add_version("1.1.0", AddEmail, DropEmail, None)?;
//! let steps = executor.up(&Target::Latest).await?;
//! ```

mod collection;
mod executor;
mod step;
mod store;
mod types;

pub use collection::VersionCollection;
pub use executor::MigrationExecutor;
pub use step::VersionStep;
pub use store::{ActiveVersionSource, ActiveVersionStore};
pub use types::{
    from_fn, Action, ActiveTarget, BoxError, FnAction, MigrationDirection, MigrationError,
    MigrationStatus, Plan, Target,
};
