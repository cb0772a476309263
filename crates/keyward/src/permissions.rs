use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::Result;

const DIR_MODE: u32 = 0o700;
const PRIVATE_FILE_MODE: u32 = 0o600;
const PUBLIC_FILE_MODE: u32 = 0o644;

/// Reinstate canonical modes under `root`: directories owner-only,
/// private key material owner read/write, public identifiers world-readable.
/// Symlinks are left alone; their own mode bits carry no meaning.
pub fn normalize(root: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(root)?;
    if meta.file_type().is_symlink() {
        return Ok(());
    }
    if meta.is_dir() {
        fs::set_permissions(root, fs::Permissions::from_mode(DIR_MODE))?;
        for child in fs::read_dir(root)? {
            normalize(&child?.path())?;
        }
        return Ok(());
    }
    if meta.is_file() {
        fs::set_permissions(root, fs::Permissions::from_mode(file_mode(root)))?;
    }
    Ok(())
}

fn file_mode(path: &Path) -> u32 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.ends_with(".pub") || name.contains("known_hosts") {
        PUBLIC_FILE_MODE
    } else {
        PRIVATE_FILE_MODE
    }
}
