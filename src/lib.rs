pub mod manifest;
pub mod migration;
pub mod state;
pub mod utils;
pub mod version;

// Re-export commonly used types
pub use manifest::{
    load_executor, read_manifest, ManifestError, ManifestVersion, ShellAction, ShellContext,
    StepManifest,
};
pub use migration::{
    from_fn, Action, ActiveTarget, ActiveVersionSource, ActiveVersionStore, BoxError,
    MigrationDirection, MigrationError, MigrationExecutor, MigrationStatus, Plan, Target,
    VersionCollection, VersionStep,
};
pub use state::{read_state, write_state, FileStore, StateError, StateFile};
pub use version::{compare, normalize, parse, SemVer, VersionError};
