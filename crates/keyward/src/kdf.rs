use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::error::{Error, Result};

// The iteration count is a compiled constant shared by backup and restore;
// the artifact header stores only the salt. It is recorded in the metadata
// sidecar for the record, never read back from it.
pub const KDF_ITERATIONS: u32 = 250_000;
pub const KEY_LENGTH: usize = 32;
pub const MIN_PASSPHRASE_CHARS: usize = 16;

/// Length policy gate, applied before any derivation work.
pub fn check_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.chars().count() < MIN_PASSPHRASE_CHARS {
        return Err(Error::WeakPassphrase);
    }
    Ok(())
}

pub fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    key
}
