use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const PASSPHRASE_ENV: &str = "KEYWARD_PASSPHRASE";
pub const BACKUP_FILE_ENV: &str = "KEYWARD_BACKUP_FILE";
pub const METADATA_FILE_ENV: &str = "KEYWARD_METADATA_FILE";
pub const GITHUB_IDENTITY_ENV: &str = "KEYWARD_GITHUB_IDENTITY";
pub const CODEBERG_IDENTITY_ENV: &str = "KEYWARD_CODEBERG_IDENTITY";

const DEFAULT_IDENTITY: &str = "~/.ssh/id_ed25519";

/// Everything the orchestrators need from the process environment,
/// collected once at the boundary. The core never reads environment
/// variables itself, so tests inject paths directly.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Credential directory: backup source and restore destination.
    pub source_dir: PathBuf,
    pub artifact_path: PathBuf,
    pub metadata_path: PathBuf,
    pub passphrase: String,
    pub github_identity: String,
    pub codeberg_identity: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let home = env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| Error::Prerequisite("HOME is not set".into()))?;
        let vault_dir = env::current_dir()?.join("vault").join("ssh");

        Ok(Self {
            source_dir: home.join(".ssh"),
            artifact_path: env_path(BACKUP_FILE_ENV)
                .unwrap_or_else(|| vault_dir.join("ssh-keys.tar.enc")),
            metadata_path: env_path(METADATA_FILE_ENV)
                .unwrap_or_else(|| vault_dir.join("ssh-keys.meta.json")),
            passphrase: env::var(PASSPHRASE_ENV).unwrap_or_default(),
            github_identity: env::var(GITHUB_IDENTITY_ENV)
                .unwrap_or_else(|_| DEFAULT_IDENTITY.into()),
            codeberg_identity: env::var(CODEBERG_IDENTITY_ENV)
                .unwrap_or_else(|_| DEFAULT_IDENTITY.into()),
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
