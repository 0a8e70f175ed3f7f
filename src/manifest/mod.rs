//! Manifest-driven version steps whose actions are shell commands.

mod types;

pub use types::{ManifestVersion, StepManifest};

use crate::migration::{
    Action, ActiveVersionStore, BoxError, MigrationDirection, MigrationError, MigrationExecutor,
};
use crate::version::normalize;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

/// Shell used when the manifest does not name one.
pub const DEFAULT_SHELL: &str = "sh";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Manifest not found at {0}")]
    NotFound(String),

    #[error("Invalid manifest: {0}")]
    Migration(#[from] MigrationError),
}

/// A shell command that did not succeed.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Context shared by every shell action.
#[derive(Debug, Clone)]
pub struct ShellContext {
    pub working_dir: PathBuf,
    pub shell: String,
}

/// One side of a manifest step.
///
/// Runs `<shell> -c <command>` in the context's working directory with
/// `UPDOWN_VERSION` and `UPDOWN_DIRECTION` set.
#[derive(Debug, Clone)]
pub struct ShellAction {
    command: String,
    version: String,
    direction: MigrationDirection,
}

impl ShellAction {
    pub fn new(command: &str, version: &str, direction: MigrationDirection) -> Self {
        Self {
            command: command.to_string(),
            version: version.to_string(),
            direction,
        }
    }
}

#[async_trait]
impl Action<ShellContext> for ShellAction {
    async fn run(&self, ctx: &ShellContext) -> Result<(), BoxError> {
        debug!(command = %self.command, cwd = %ctx.working_dir.display(), "Running shell action");

        let output = Command::new(&ctx.shell)
            .arg("-c")
            .arg(&self.command)
            .current_dir(&ctx.working_dir)
            .env("UPDOWN_VERSION", &self.version)
            .env("UPDOWN_DIRECTION", self.direction.to_string())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ShellError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!(version = %self.version, "{}", line);
        }

        if !output.status.success() {
            return Err(Box::new(ShellError::Exit {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }));
        }
        Ok(())
    }
}

/// Read and parse a manifest file.
pub async fn read_manifest(path: &Path) -> Result<StepManifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path).await?;
    let manifest: StepManifest = serde_json::from_str(&content)?;
    Ok(manifest)
}

/// Build the shell context for a manifest located in `base_dir`.
pub fn shell_context(manifest: &StepManifest, base_dir: &Path) -> ShellContext {
    let working_dir = match &manifest.working_dir {
        Some(dir) => base_dir.join(dir),
        None => base_dir.to_path_buf(),
    };
    ShellContext {
        working_dir,
        shell: manifest
            .shell
            .clone()
            .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
    }
}

/// Register every manifest version on `executor`.
pub fn register_versions(
    executor: &mut MigrationExecutor<ShellContext>,
    manifest: &StepManifest,
) -> Result<(), ManifestError> {
    for entry in &manifest.versions {
        let version = normalize(&entry.version, true).map_err(MigrationError::from)?;
        executor.add_version(
            &entry.version,
            ShellAction::new(&entry.up, &version, MigrationDirection::Up),
            ShellAction::new(&entry.down, &version, MigrationDirection::Down),
            entry.comment.as_deref(),
        )?;
    }
    Ok(())
}

/// Load a manifest and build an executor persisting through `store`.
pub async fn load_executor<S>(
    manifest_path: &Path,
    store: S,
) -> Result<MigrationExecutor<ShellContext>, ManifestError>
where
    S: ActiveVersionStore<ShellContext> + 'static,
{
    let manifest = read_manifest(manifest_path).await?;
    let base_dir = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut executor = MigrationExecutor::with_store(shell_context(&manifest, base_dir), store);
    register_versions(&mut executor, &manifest)?;
    Ok(executor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest: StepManifest = serde_json::from_str(
            r#"{
                "workingDir": "work",
                "versions": [
                    { "version": "v1", "up": "touch a", "down": "rm a", "comment": "first" },
                    { "version": "2", "up": "touch b", "down": "rm b" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.working_dir.as_deref(), Some("work"));
        assert_eq!(manifest.shell, None);
        assert_eq!(manifest.versions.len(), 2);
        assert_eq!(manifest.versions[0].comment.as_deref(), Some("first"));
        assert_eq!(manifest.versions[1].comment, None);
    }

    #[test]
    fn test_shell_context_defaults() {
        let manifest = StepManifest::default();
        let ctx = shell_context(&manifest, Path::new("/srv/app"));
        assert_eq!(ctx.working_dir, PathBuf::from("/srv/app"));
        assert_eq!(ctx.shell, DEFAULT_SHELL);

        let manifest = StepManifest {
            working_dir: Some("db".to_string()),
            shell: Some("bash".to_string()),
            versions: Vec::new(),
        };
        let ctx = shell_context(&manifest, Path::new("/srv/app"));
        assert_eq!(ctx.working_dir, PathBuf::from("/srv/app/db"));
        assert_eq!(ctx.shell, "bash");
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let manifest = StepManifest {
            versions: vec![
                ManifestVersion {
                    version: "1.0.0".to_string(),
                    up: "true".to_string(),
                    down: "true".to_string(),
                    comment: None,
                },
                ManifestVersion {
                    version: "v1".to_string(),
                    up: "true".to_string(),
                    down: "true".to_string(),
                    comment: None,
                },
            ],
            ..StepManifest::default()
        };
        let mut executor = MigrationExecutor::new(shell_context(&manifest, Path::new(".")));
        let err = register_versions(&mut executor, &manifest).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Migration(MigrationError::DuplicateVersion(_))
        ));
    }

    #[tokio::test]
    async fn test_read_missing_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = read_manifest(&temp_dir.path().join("updown.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_shell_action_failure_carries_stderr() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = ShellContext {
            working_dir: temp_dir.path().to_path_buf(),
            shell: DEFAULT_SHELL.to_string(),
        };
        let action = ShellAction::new("echo broken >&2; exit 3", "1.0.0", MigrationDirection::Up);
        let err = action.run(&ctx).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken"), "{message}");
    }

    #[tokio::test]
    async fn test_shell_action_sees_version_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = ShellContext {
            working_dir: temp_dir.path().to_path_buf(),
            shell: DEFAULT_SHELL.to_string(),
        };
        let action = ShellAction::new(
            "echo \"$UPDOWN_DIRECTION $UPDOWN_VERSION\" > out.txt",
            "2.1.0",
            MigrationDirection::Down,
        );
        action.run(&ctx).await.unwrap();
        let written = std::fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "down 2.1.0");
    }
}
