use std::fs;

use tracing::info;

use crate::archive;
use crate::container;
use crate::error::{Error, Result};
use crate::fingerprint;
use crate::kdf;
use crate::metadata::{self, BackupMetadata};
use crate::settings::Settings;
use crate::util;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupResult {
    /// Source fingerprint matched the recorded one; nothing was written.
    Unchanged,
    Updated { file_count: u64, total_bytes: u64 },
}

/// Fingerprint the credential directory and, when it drifted from the
/// recorded state, write a fresh encrypted artifact plus metadata sidecar.
/// The unchanged path writes nothing at all.
pub fn backup(settings: &Settings) -> Result<BackupResult> {
    info!("checking backup prerequisites");
    if !archive::command_exists("tar") {
        return Err(Error::Prerequisite("missing required tool: tar".into()));
    }
    if !settings.source_dir.is_dir() {
        return Err(Error::Prerequisite(format!(
            "credential directory not found: {}",
            settings.source_dir.display()
        )));
    }
    kdf::check_passphrase(&settings.passphrase)?;

    let snap = fingerprint::snapshot(&settings.source_dir)?;

    if backup_is_current(settings, &snap.fingerprint) {
        info!(fingerprint = %snap.fingerprint, "backup is already current");
        return Ok(BackupResult::Unchanged);
    }

    info!("creating encrypted archive");
    let staging = tempfile::Builder::new()
        .prefix("keyward-backup-")
        .tempdir()?;
    let tar_path = staging.path().join("credentials.tar");
    archive::pack(&settings.source_dir, &tar_path)?;

    let plaintext = fs::read(&tar_path)?;
    let artifact = container::seal(&plaintext, &settings.passphrase)?;
    util::atomic_write(&settings.artifact_path, &artifact, 0o600)?;

    info!("writing backup metadata");
    let meta = BackupMetadata {
        created_at: chrono::Local::now().to_rfc3339(),
        host: hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".into()),
        source_dir: settings.source_dir.clone(),
        encrypted_backup_file: settings.artifact_path.clone(),
        cipher: metadata::CIPHER.into(),
        kdf: metadata::KDF.into(),
        kdf_digest: metadata::KDF_DIGEST.into(),
        kdf_iterations: kdf::KDF_ITERATIONS,
        source_fingerprint: snap.fingerprint,
        source_file_count: snap.file_count,
        source_total_bytes: snap.total_bytes,
        encrypted_backup_sha256: util::sha256_hex(&artifact),
    };
    meta.save(&settings.metadata_path)?;

    Ok(BackupResult::Updated {
        file_count: snap.file_count,
        total_bytes: snap.total_bytes,
    })
}

// Unreadable or stale metadata forces a fresh backup; it never aborts one.
fn backup_is_current(settings: &Settings, current_fingerprint: &str) -> bool {
    if !settings.artifact_path.is_file() || !settings.metadata_path.is_file() {
        return false;
    }
    match BackupMetadata::load(&settings.metadata_path) {
        Ok(meta) => meta.source_fingerprint == current_fingerprint,
        Err(_) => false,
    }
}
