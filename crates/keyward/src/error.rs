use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing prerequisite: {0}")]
    Prerequisite(String),

    #[error("passphrase must be at least 16 characters (set KEYWARD_PASSPHRASE)")]
    WeakPassphrase,

    #[error("encrypted backup is malformed: {0}")]
    MalformedArtifact(String),

    #[error("failed to decrypt and authenticate backup; check the passphrase and backup integrity")]
    Authentication,

    #[error("decrypted archive is unusable: {0}")]
    CorruptArchive(String),

    #[error("command failed ({status}): {cmd}: {stderr}")]
    Command {
        cmd: String,
        status: i32,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
