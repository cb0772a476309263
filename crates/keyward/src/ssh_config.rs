use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::Result;
use crate::util;

pub const MANAGED_BLOCK_START: &str = "# >>> keyward managed git hosts >>>";
pub const MANAGED_BLOCK_END: &str = "# <<< keyward managed git hosts <<<";

/// Render the tool-owned block of `Host` stanzas for the managed git
/// forges. Ends with a trailing newline.
pub fn managed_host_block(github_identity: &str, codeberg_identity: &str) -> String {
    let stanza = |host: &str, identity: &str| {
        format!(
            "Host {host}\n  HostName {host}\n  User git\n  IdentityFile {identity}\n  IdentitiesOnly yes"
        )
    };
    [
        MANAGED_BLOCK_START.to_string(),
        stanza("github.com", github_identity),
        String::new(),
        stanza("codeberg.org", codeberg_identity),
        MANAGED_BLOCK_END.to_string(),
        String::new(),
    ]
    .join("\n")
}

/// Replace any existing managed span in `path` with `block` and keep every
/// byte outside the span, aside from a normalizing trim. Applying the same
/// block twice is a fixed point. The file ends up owner read/write only.
///
/// The span is located with an explicit indexed search rather than a
/// regex; the first start marker and the first end marker after it bound
/// it, plus at most one trailing newline.
pub fn upsert_managed_block(
    path: &Path,
    block: &str,
    start_marker: &str,
    end_marker: &str,
) -> Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let existing = existing.replace("\r\n", "\n");
    let remainder = strip_managed_span(&existing, start_marker, end_marker);
    let remainder = remainder.trim();

    let next = if remainder.is_empty() {
        block.to_string()
    } else {
        let mut s = format!("{block}\n{remainder}");
        if !s.ends_with('\n') {
            s.push('\n');
        }
        s
    };

    if next != existing {
        util::atomic_write(path, next.as_bytes(), 0o600)?;
    } else {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

// When only one marker is present the file is left as user content; a
// half-open span is not ours to delete.
fn strip_managed_span(content: &str, start_marker: &str, end_marker: &str) -> String {
    let Some(start) = content.find(start_marker) else {
        return content.to_string();
    };
    let after_start = start + start_marker.len();
    let Some(end_rel) = content[after_start..].find(end_marker) else {
        return content.to_string();
    };
    let mut span_end = after_start + end_rel + end_marker.len();
    if content[span_end..].starts_with('\n') {
        span_end += 1;
    }
    format!("{}{}", &content[..start], &content[span_end..])
}
