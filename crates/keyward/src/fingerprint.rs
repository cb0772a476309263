use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::Result;

/// One path under the source root, classified without following symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File {
        rel_path: String,
        mode: u32,
        size: u64,
        sha256: String,
    },
    Dir {
        rel_path: String,
        mode: u32,
    },
    Symlink {
        rel_path: String,
        mode: u32,
        target: String,
    },
    Other {
        rel_path: String,
        mode: u32,
    },
}

impl TreeEntry {
    fn descriptor(&self) -> String {
        match self {
            TreeEntry::File {
                rel_path,
                mode,
                size,
                sha256,
            } => format!("file {rel_path} mode={mode:03o} size={size} sha256={sha256}"),
            TreeEntry::Dir { rel_path, mode } => format!("dir {rel_path} mode={mode:03o}"),
            TreeEntry::Symlink {
                rel_path,
                mode,
                target,
            } => format!("symlink {rel_path} mode={mode:03o} -> {target}"),
            TreeEntry::Other { rel_path, mode } => format!("other {rel_path} mode={mode:03o}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub fingerprint: String,
    pub file_count: u64,
    pub total_bytes: u64,
}

/// Digest the content, structure, and permission bits of the tree under
/// `root`. Read-only; identical tree state always yields an identical
/// fingerprint regardless of OS directory iteration order.
pub fn snapshot(root: &Path) -> Result<SourceSnapshot> {
    let entries = walk(root)?;

    let mut file_count = 0u64;
    let mut total_bytes = 0u64;
    for entry in &entries {
        match entry {
            TreeEntry::File { size, .. } => {
                file_count += 1;
                total_bytes += size;
            }
            TreeEntry::Symlink { .. } => file_count += 1,
            _ => {}
        }
    }

    let joined = entries
        .iter()
        .map(TreeEntry::descriptor)
        .collect::<Vec<_>>()
        .join("\n");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());

    Ok(SourceSnapshot {
        fingerprint: hex::encode(hasher.finalize()),
        file_count,
        total_bytes,
    })
}

/// Collect entries in a deterministic total order: siblings sorted by name,
/// each directory's own entry emitted before its children.
pub fn walk(root: &Path) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let meta = entry.metadata().map_err(io::Error::from)?;
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o777
        };
        let rel_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?.to_string_lossy().into_owned();
            entries.push(TreeEntry::Symlink {
                rel_path,
                mode,
                target,
            });
        } else if file_type.is_dir() {
            entries.push(TreeEntry::Dir { rel_path, mode });
        } else if file_type.is_file() {
            let content = fs::read(entry.path())?;
            entries.push(TreeEntry::File {
                rel_path,
                mode,
                size: meta.len(),
                sha256: crate::util::sha256_hex(&content),
            });
        } else {
            entries.push(TreeEntry::Other { rel_path, mode });
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;

    fn fixture(root: &Path) {
        fs::create_dir_all(root.join("keys")).expect("mkdir");
        fs::write(root.join("keys/id_ed25519"), b"private material").expect("write");
        fs::write(root.join("keys/id_ed25519.pub"), b"public material").expect("write");
        fs::write(root.join("known_hosts"), b"host entries").expect("write");
        std::os::unix::fs::symlink("keys/id_ed25519", root.join("default_key"))
            .expect("symlink");
    }

    #[test]
    fn snapshot_is_deterministic() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());
        let a = snapshot(tmp.path()).expect("first");
        let b = snapshot(tmp.path()).expect("second");
        assert_eq!(a, b);
        assert_eq!(a.fingerprint.len(), 64);
    }

    #[test]
    fn counts_cover_files_and_symlinks_but_bytes_only_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());
        let snap = snapshot(tmp.path()).expect("snapshot");
        // Three regular files plus one symlink.
        assert_eq!(snap.file_count, 4);
        let expected_bytes = ("private material".len()
            + "public material".len()
            + "host entries".len()) as u64;
        assert_eq!(snap.total_bytes, expected_bytes);
    }

    #[test]
    fn mtime_only_change_keeps_fingerprint() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());
        let before = snapshot(tmp.path()).expect("before");

        filetime::set_file_mtime(
            tmp.path().join("known_hosts"),
            filetime::FileTime::from_unix_time(1_000_000, 0),
        )
        .expect("set mtime");

        let after = snapshot(tmp.path()).expect("after");
        assert_eq!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn content_change_moves_fingerprint() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());
        let before = snapshot(tmp.path()).expect("before");

        fs::write(tmp.path().join("known_hosts"), b"host entrieS").expect("mutate");

        let after = snapshot(tmp.path()).expect("after");
        assert_ne!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn permission_change_moves_fingerprint() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());
        let before = snapshot(tmp.path()).expect("before");

        fs::set_permissions(
            tmp.path().join("keys/id_ed25519"),
            fs::Permissions::from_mode(0o644),
        )
        .expect("chmod");

        let after = snapshot(tmp.path()).expect("after");
        assert_ne!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn symlink_target_is_recorded_not_followed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::os::unix::fs::symlink("missing-target", tmp.path().join("dangling"))
            .expect("symlink");
        let entries = walk(tmp.path()).expect("walk");
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            TreeEntry::Symlink { target, .. } => assert_eq!(target, "missing-target"),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(snapshot(&tmp.path().join("nope")).is_err());
    }
}
