use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// Write via a sibling temp file and rename so a reader never observes a
// partially written artifact or metadata file. The mode is applied before
// the rename makes the file visible.
pub fn atomic_write(path: &Path, body: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let Some(file_name) = path.file_name() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid file path for atomic write: {}", path.display()),
        )
        .into());
    };
    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(format!(
        ".tmp.{}.{}",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, body)?;
    fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn atomic_write_sets_mode_and_creates_parents() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let target = tmp.path().join("nested/dir/file.bin");
        atomic_write(&target, b"payload", 0o600).expect("write");
        assert_eq!(fs::read(&target).expect("read"), b"payload");
        let mode = fs::metadata(&target)
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let target = tmp.path().join("file.bin");
        atomic_write(&target, b"one", 0o600).expect("first write");
        atomic_write(&target, b"two", 0o600).expect("second write");
        assert_eq!(fs::read(&target).expect("read"), b"two");
    }
}
