use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use updown::utils::{MANIFEST_FILE, STATE_FILE};
use updown::{load_executor, normalize, FileStore, MigrationExecutor, ShellContext, Target};

/// Updown - run reversible version steps toward a target version
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Manifest listing versions and their up/down commands
    #[arg(short, long, env = "UPDOWN_MANIFEST", default_value = MANIFEST_FILE)]
    manifest: PathBuf,

    /// File recording the active version
    #[arg(short, long, env = "UPDOWN_STATE", default_value = STATE_FILE)]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered versions in order, marking the active one
    List,

    /// Show the active version, the latest version and how many are pending
    Status,

    /// Upgrade toward TARGET: latest, initial, major, minor, patch or a version
    Up {
        #[arg(default_value = "latest")]
        target: Target,
    },

    /// Downgrade toward TARGET: initial, major, minor, patch or a version
    Down {
        #[arg(default_value = "initial")]
        target: Target,
    },

    /// Revert every version, including the initial one, and clear the state
    Uninstall,

    /// Print the canonical form of a version string
    Normalize {
        input: String,

        /// Print 0.0.0 instead of failing on unrecognized input
        #[arg(long)]
        lenient: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let args = Args::parse();

    match &args.command {
        Command::Normalize { input, lenient } => {
            println!("{}", normalize(input, !lenient)?);
        }
        Command::List => {
            let executor = load(&args).await?;
            let active = executor.get_active_version().await?;
            for step in executor.versions() {
                let marker = if active.as_deref() == Some(step.normalized()) {
                    "*"
                } else {
                    " "
                };
                match step.comment() {
                    Some(comment) => println!("{} {}  {}", marker, step.normalized(), comment),
                    None => println!("{} {}", marker, step.normalized()),
                }
            }
        }
        Command::Status => {
            let status = load(&args).await?.status().await?;
            println!("active:  {}", status.active.as_deref().unwrap_or("(none)"));
            println!("latest:  {}", status.latest.as_deref().unwrap_or("(none)"));
            println!("pending: {}", status.pending);
        }
        Command::Up { target } => {
            let steps = load(&args).await?.up(target).await?;
            info!(steps, "Upgrade finished");
            println!("{steps}");
        }
        Command::Down { target } => {
            let steps = load(&args).await?.down(target).await?;
            info!(steps, "Downgrade finished");
            println!("{steps}");
        }
        Command::Uninstall => {
            let steps = load(&args).await?.uninstall().await?;
            println!("{steps}");
        }
    }

    Ok(())
}

/// Build the executor from the manifest, persisting to the state file.
async fn load(args: &Args) -> Result<MigrationExecutor<ShellContext>> {
    load_executor(&args.manifest, FileStore::new(&args.state))
        .await
        .with_context(|| format!("Failed to load {}", args.manifest.display()))
}
