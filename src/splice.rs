//! Writing marker blocks into files.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Append `block` to `path`, creating the file if needed.
///
/// Existing content is separated from the block by exactly one blank line.
pub fn append_block(path: &Path, block: &str) -> Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let separator = if existing.is_empty() || existing.ends_with("\n\n") {
        ""
    } else if existing.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{}{}", separator, block)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "appended block");
    Ok(())
}

/// Backup location for `path`: the same name with `.bak` appended.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Replace the content of `path`, first copying the original to
/// [`backup_path`] when `backup` is set. Returns the backup location.
pub fn replace_file(path: &Path, content: &str, backup: bool) -> Result<Option<PathBuf>> {
    let backup_to = if backup {
        let to = backup_path(path);
        fs::copy(path, &to).with_context(|| {
            format!("Failed to back up {} to {}", path.display(), to.display())
        })?;
        Some(to)
    } else {
        None
    };

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), backup = backup_to.is_some(), "replaced file");
    Ok(backup_to)
}
