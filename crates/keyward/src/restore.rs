use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive;
use crate::container;
use crate::error::{Error, Result};
use crate::kdf;
use crate::permissions;
use crate::settings::Settings;
use crate::ssh_config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreResult {
    Restored { destination: PathBuf },
}

/// Authenticate and decrypt the artifact, rebuild the credential directory
/// from a staged extraction, then reinstate canonical permissions and the
/// managed host configuration. The destination is only touched after the
/// payload has been authenticated and its shape verified.
pub fn restore(settings: &Settings) -> Result<RestoreResult> {
    info!("checking restore prerequisites");
    if !archive::command_exists("tar") {
        return Err(Error::Prerequisite("missing required tool: tar".into()));
    }
    if !settings.artifact_path.is_file() {
        return Err(Error::Prerequisite(format!(
            "encrypted backup not found: {}",
            settings.artifact_path.display()
        )));
    }
    kdf::check_passphrase(&settings.passphrase)?;

    // Dropped on every exit path, taking the staged plaintext with it.
    let staging = tempfile::Builder::new()
        .prefix("keyward-restore-")
        .tempdir()?;

    info!("decrypting and authenticating archive");
    let artifact = fs::read(&settings.artifact_path)?;
    let plaintext = container::open(&artifact, &settings.passphrase)?;

    let tar_path = staging.path().join("credentials.tar");
    fs::write(&tar_path, &plaintext)?;

    let extract_root = staging.path().join("extract-root");
    archive::unpack(&tar_path, &extract_root)?;
    let staged = staged_tree(&extract_root)?;

    info!("replacing {}", settings.source_dir.display());
    if let Some(parent) = settings.source_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::symlink_metadata(&settings.source_dir) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(&settings.source_dir)?,
        Ok(_) => fs::remove_file(&settings.source_dir)?,
        Err(_) => {}
    }
    copy_tree(&staged, &settings.source_dir)?;

    info!("normalizing permissions");
    permissions::normalize(&settings.source_dir)?;

    info!("ensuring managed git host entries");
    let block =
        ssh_config::managed_host_block(&settings.github_identity, &settings.codeberg_identity);
    ssh_config::upsert_managed_block(
        &settings.source_dir.join("config"),
        &block,
        ssh_config::MANAGED_BLOCK_START,
        ssh_config::MANAGED_BLOCK_END,
    )?;

    Ok(RestoreResult::Restored {
        destination: settings.source_dir.clone(),
    })
}

// An authenticated payload can still be the wrong content entirely; the
// archive must hold exactly one top-level directory, the packed tree.
fn staged_tree(extract_root: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    let mut others = 0usize;
    for entry in fs::read_dir(extract_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        } else {
            others += 1;
        }
    }
    if dirs.len() == 1 && others == 0 {
        Ok(dirs.remove(0))
    } else {
        Err(Error::CorruptArchive(
            "expected a single top-level credential directory".into(),
        ))
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    let mode = fs::symlink_metadata(from)?.permissions().mode();
    fs::set_permissions(to, fs::Permissions::from_mode(mode))?;

    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            let target = fs::read_link(&src)?;
            std::os::unix::fs::symlink(&target, &dst)?;
        } else if file_type.is_dir() {
            copy_tree(&src, &dst)?;
        } else {
            fs::copy(&src, &dst)?;
        }
    }
    Ok(())
}
