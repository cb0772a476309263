use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use keyward::Result;
use keyward::archive::command_exists;
use keyward::backup::{BackupResult, backup};
use keyward::fingerprint::snapshot;
use keyward::metadata::BackupMetadata;
use keyward::restore::{RestoreResult, restore};
use keyward::settings::Settings;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or refresh the encrypted credential backup
    Backup {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Decrypt the backup and rebuild the credential directory
    Restore {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Print the source fingerprint without touching the backup
    Fingerprint {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Report tool availability and whether the backup is current
    Status {
        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(Debug, clap::Args)]
struct PathArgs {
    /// Credential directory (default: $HOME/.ssh)
    #[arg(long)]
    source: Option<PathBuf>,
    /// Encrypted artifact path (default: vault/ssh/ssh-keys.tar.enc)
    #[arg(long)]
    artifact: Option<PathBuf>,
    /// Metadata sidecar path (default: vault/ssh/ssh-keys.meta.json)
    #[arg(long)]
    metadata: Option<PathBuf>,
}

impl PathArgs {
    fn apply(self, mut settings: Settings) -> Settings {
        if let Some(source) = self.source {
            settings.source_dir = source;
        }
        if let Some(artifact) = self.artifact {
            settings.artifact_path = artifact;
        }
        if let Some(metadata) = self.metadata {
            settings.metadata_path = metadata;
        }
        settings
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: Args) -> Result<()> {
    match args.cmd {
        Command::Backup { paths } => cmd_backup(paths.apply(Settings::from_env()?)),
        Command::Restore { paths } => cmd_restore(paths.apply(Settings::from_env()?)),
        Command::Fingerprint { paths } => cmd_fingerprint(paths.apply(Settings::from_env()?)),
        Command::Status { paths } => cmd_status(paths.apply(Settings::from_env()?)),
    }
}

fn cmd_backup(settings: Settings) -> Result<()> {
    match backup(&settings)? {
        BackupResult::Unchanged => {
            println!("backup is already current; no files changed");
        }
        BackupResult::Updated {
            file_count,
            total_bytes,
        } => {
            println!("created: {}", settings.artifact_path.display());
            println!("created: {}", settings.metadata_path.display());
            println!("captured {file_count} entries ({total_bytes} bytes)");
        }
    }
    Ok(())
}

fn cmd_restore(settings: Settings) -> Result<()> {
    let RestoreResult::Restored { destination } = restore(&settings)?;
    println!("restored: {}", destination.display());
    println!("next: ssh -T git@github.com");
    println!("next: ssh -T git@codeberg.org");
    Ok(())
}

fn cmd_fingerprint(settings: Settings) -> Result<()> {
    let snap = snapshot(&settings.source_dir)?;
    println!("source: {}", settings.source_dir.display());
    println!("fingerprint: {}", snap.fingerprint);
    println!("files: {}", snap.file_count);
    println!("bytes: {}", snap.total_bytes);
    Ok(())
}

fn cmd_status(settings: Settings) -> Result<()> {
    println!(
        "tar: {}",
        if command_exists("tar") { "ok" } else { "missing" }
    );
    let artifact_ok = settings.artifact_path.is_file();
    let metadata_ok = settings.metadata_path.is_file();
    println!(
        "artifact: {} ({})",
        settings.artifact_path.display(),
        if artifact_ok { "ok" } else { "missing" }
    );
    println!(
        "metadata: {} ({})",
        settings.metadata_path.display(),
        if metadata_ok { "ok" } else { "missing" }
    );

    if !(artifact_ok && metadata_ok && settings.source_dir.is_dir()) {
        println!("backup: unknown");
        return Ok(());
    }
    let meta = BackupMetadata::load(&settings.metadata_path)?;
    let snap = snapshot(&settings.source_dir)?;
    if meta.source_fingerprint == snap.fingerprint {
        println!("backup: current");
    } else {
        println!("backup: stale");
    }
    Ok(())
}
