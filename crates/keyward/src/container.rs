//! Authenticated artifact container.
//!
//! Layout: `MAGIC(8) || salt(16) || nonce(12) || auth tag(16) || ciphertext`.
//! The magic tag is a fast-fail format check, not a security boundary; the
//! AEAD tag covers the ciphertext, so any bit flip surfaces as an
//! authentication failure rather than altered plaintext.

use std::io;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::kdf;

pub const MAGIC: &[u8; 8] = b"KEYWARD1";
pub const SALT_LENGTH: usize = 16;
pub const NONCE_LENGTH: usize = 12;
pub const AUTH_TAG_LENGTH: usize = 16;
pub const HEADER_LENGTH: usize = MAGIC.len() + SALT_LENGTH + NONCE_LENGTH + AUTH_TAG_LENGTH;

/// Encrypt `plaintext` under a key derived from `passphrase` and a fresh
/// random salt, and serialize the full artifact byte sequence.
pub fn seal(plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LENGTH];
    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce_bytes);

    let mut key = kdf::derive_key(passphrase, &salt);
    let cipher = Aes256Gcm::new(&Key::<Aes256Gcm>::from(key));
    key.zeroize();

    let mut ciphertext_and_tag = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| Error::Io(io::Error::other("encryption failed")))?;
    let tag_start = ciphertext_and_tag.len() - AUTH_TAG_LENGTH;
    let tag = ciphertext_and_tag.split_off(tag_start);
    let ciphertext = ciphertext_and_tag;

    let mut artifact = Vec::with_capacity(HEADER_LENGTH + ciphertext.len());
    artifact.extend_from_slice(MAGIC);
    artifact.extend_from_slice(&salt);
    artifact.extend_from_slice(&nonce_bytes);
    artifact.extend_from_slice(&tag);
    artifact.extend_from_slice(&ciphertext);
    Ok(artifact)
}

/// Parse an artifact, re-derive the key from the embedded salt, and return
/// the authenticated plaintext. Never returns partial or unauthenticated
/// data on any failure path.
pub fn open(artifact: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    if artifact.len() < HEADER_LENGTH + 1 {
        return Err(Error::MalformedArtifact(
            "file is truncated or empty".into(),
        ));
    }
    let (magic, rest) = artifact.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(Error::MalformedArtifact("unrecognized format tag".into()));
    }
    let (salt, rest) = rest.split_at(SALT_LENGTH);
    let (nonce_bytes, rest) = rest.split_at(NONCE_LENGTH);
    let (tag, ciphertext) = rest.split_at(AUTH_TAG_LENGTH);

    let mut key = kdf::derive_key(passphrase, salt);
    let cipher = Aes256Gcm::new(&Key::<Aes256Gcm>::from(key));
    key.zeroize();

    // The aead interface expects ciphertext || tag.
    let mut combined = Vec::with_capacity(ciphertext.len() + tag.len());
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), combined.as_ref())
        .map_err(|_| Error::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "abcdEFGH12345678";

    #[test]
    fn seal_open_round_trip() {
        let artifact = seal(b"credential archive bytes", PASSPHRASE).expect("seal");
        assert_eq!(&artifact[..8], MAGIC);
        assert_eq!(
            open(&artifact, PASSPHRASE).expect("open"),
            b"credential archive bytes"
        );
    }

    #[test]
    fn fresh_salt_and_nonce_per_seal() {
        let a = seal(b"same payload", PASSPHRASE).expect("seal a");
        let b = seal(b"same payload", PASSPHRASE).expect("seal b");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_passphrase_fails_authentication() {
        let artifact = seal(b"payload", PASSPHRASE).expect("seal");
        assert!(matches!(
            open(&artifact, "wrongPASSPHRASE1"),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn bit_flips_never_yield_plaintext() {
        let artifact = seal(b"payload", PASSPHRASE).expect("seal");
        // One position inside each region after the magic: salt, nonce,
        // auth tag, ciphertext.
        for pos in [9, 30, 40, HEADER_LENGTH + 1] {
            let mut tampered = artifact.clone();
            tampered[pos] ^= 0x01;
            assert!(
                matches!(open(&tampered, PASSPHRASE), Err(Error::Authentication)),
                "flip at {pos} not caught"
            );
        }
    }

    #[test]
    fn flipped_magic_is_malformed_not_authentication() {
        let mut artifact = seal(b"payload", PASSPHRASE).expect("seal");
        artifact[0] ^= 0x01;
        assert!(matches!(
            open(&artifact, PASSPHRASE),
            Err(Error::MalformedArtifact(_))
        ));
    }

    #[test]
    fn truncated_artifact_is_malformed() {
        let artifact = seal(b"payload", PASSPHRASE).expect("seal");
        assert!(matches!(
            open(&artifact[..HEADER_LENGTH], PASSPHRASE),
            Err(Error::MalformedArtifact(_))
        ));
        assert!(matches!(
            open(b"", PASSPHRASE),
            Err(Error::MalformedArtifact(_))
        ));
    }

    #[test]
    fn truncated_ciphertext_fails_authentication() {
        let artifact = seal(b"a longer payload to truncate", PASSPHRASE).expect("seal");
        let cut = &artifact[..artifact.len() - 4];
        assert!(matches!(open(cut, PASSPHRASE), Err(Error::Authentication)));
    }
}
