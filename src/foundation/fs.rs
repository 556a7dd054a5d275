use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::ScenecropResult;

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> ScenecropResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Sibling path used while `path` is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write to a sibling temp file via `write`, then rename over `path`.
///
/// Readers never observe a half-written `path`; the temp file is removed if any
/// step fails.
pub fn write_atomic(
    path: &Path,
    write: impl FnOnce(&Path) -> ScenecropResult<()>,
) -> ScenecropResult<()> {
    ensure_parent_dir(path)?;
    let tmp = partial_path(path);
    let mut guard = TempFileGuard(Some(tmp.clone()));
    write(&tmp)?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename '{}' -> '{}'", tmp.display(), path.display()))?;
    guard.0 = None;
    Ok(())
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/fs.rs"]
mod tests;
