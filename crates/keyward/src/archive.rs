use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Locate `binary` on PATH the way a shell would.
pub fn command_exists(binary: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| is_executable(&dir.join(binary)))
}

fn is_executable(p: &Path) -> bool {
    fs::metadata(p)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

pub fn run<I, S>(program: &str, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let rendered = render_cmd(program, &args);
    debug!("$ {rendered}");

    let output = Command::new(program).args(&args).output()?;
    if !output.status.success() {
        return Err(Error::Command {
            cmd: rendered,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn render_cmd(program: &str, args: &[OsString]) -> String {
    let mut out = String::from(program);
    for a in args {
        out.push(' ');
        out.push_str(&a.to_string_lossy());
    }
    out
}

/// Pack `source` into a plain tar at `tar_path`. The archive keeps the
/// source's own name as its single top-level entry so a restore can verify
/// the payload shape before touching the destination.
pub fn pack(source: &Path, tar_path: &Path) -> Result<()> {
    let parent = source.parent().ok_or_else(|| {
        Error::Prerequisite(format!(
            "source path has no parent directory: {}",
            source.display()
        ))
    })?;
    let name = source.file_name().ok_or_else(|| {
        Error::Prerequisite(format!("source path has no name: {}", source.display()))
    })?;
    run(
        "tar",
        [
            OsStr::new("-C"),
            parent.as_os_str(),
            OsStr::new("-cf"),
            tar_path.as_os_str(),
            name,
        ],
    )
}

pub fn unpack(tar_path: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    run(
        "tar",
        [
            OsStr::new("-C"),
            dest.as_os_str(),
            OsStr::new("-xf"),
            tar_path.as_os_str(),
        ],
    )
}
