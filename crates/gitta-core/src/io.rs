use crate::error::{GittaError, IoContext, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `data` by persisting a sibling temp file over it.
///
/// Status files and the counter file go through here, so a crash leaves the
/// previous token or counter set in place rather than a truncated one. The
/// parent directory (usually a `.gitta/` sidecar dir) is created on demand.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;
    let mut staged = NamedTempFile::new_in(dir).io_ctx("stage temp file in", dir)?;
    staged.write_all(data).io_ctx("write staged copy of", path)?;
    staged
        .persist(path)
        .map_err(|e| e.error)
        .io_ctx("replace", path)?;
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).io_ctx("create directory", path)
}

/// Rename a sprint folder. Anything already at `to`, including a dangling
/// symlink, is left alone and reported as `DestinationExists`.
pub fn rename_no_clobber(from: &Path, to: &Path) -> Result<()> {
    if to.symlink_metadata().is_ok() {
        return Err(GittaError::DestinationExists(to.to_path_buf()));
    }
    std::fs::rename(from, to).io_ctx("rename", from)
}
