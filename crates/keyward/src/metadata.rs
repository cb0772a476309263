use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util;

pub const CIPHER: &str = "aes-256-gcm";
pub const KDF: &str = "pbkdf2";
pub const KDF_DIGEST: &str = "sha256";

/// Sidecar record written next to the artifact. It only feeds the
/// idempotency gate and status reporting; restore never needs it, so losing
/// it costs at most one redundant backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub created_at: String,
    pub host: String,
    pub source_dir: PathBuf,
    pub encrypted_backup_file: PathBuf,
    pub cipher: String,
    pub kdf: String,
    pub kdf_digest: String,
    pub kdf_iterations: u32,
    pub source_fingerprint: String,
    pub source_file_count: u64,
    pub source_total_bytes: u64,
    pub encrypted_backup_sha256: String,
}

impl BackupMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut body = serde_json::to_string_pretty(self)?;
        body.push('\n');
        util::atomic_write(path, body.as_bytes(), 0o600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BackupMetadata {
        BackupMetadata {
            created_at: "2026-08-04T10:00:00+00:00".into(),
            host: "workstation".into(),
            source_dir: PathBuf::from("/home/user/.ssh"),
            encrypted_backup_file: PathBuf::from("/repo/vault/ssh/ssh-keys.tar.enc"),
            cipher: CIPHER.into(),
            kdf: KDF.into(),
            kdf_digest: KDF_DIGEST.into(),
            kdf_iterations: 250_000,
            source_fingerprint: "ab".repeat(32),
            source_file_count: 5,
            source_total_bytes: 1234,
            encrypted_backup_sha256: "cd".repeat(32),
        }
    }

    #[test]
    fn save_load_round_trip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("ssh-keys.meta.json");
        let meta = sample();
        meta.save(&path).expect("save");

        let loaded = BackupMetadata::load(&path).expect("load");
        assert_eq!(loaded.source_fingerprint, meta.source_fingerprint);
        assert_eq!(loaded.source_file_count, 5);
        assert_eq!(loaded.kdf_iterations, 250_000);
    }

    #[test]
    fn serializes_camel_case_with_trailing_newline() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("meta.json");
        sample().save(&path).expect("save");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"sourceFingerprint\""));
        assert!(raw.contains("\"encryptedBackupSha256\""));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn garbage_sidecar_fails_to_load() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("meta.json");
        fs::write(&path, b"{not json").expect("write");
        assert!(BackupMetadata::load(&path).is_err());
    }
}
