//! The `Current` pointer inside the sprints root.
//!
//! Realised as a symbolic link, a Windows junction, or a `Current.txt` file
//! holding a path, tried in that order. Readers treat the pointer as
//! advisory: it may be missing or point at a folder that has since moved.

use crate::error::{GittaError, IoContext, Result};
use crate::paths::{CURRENT_POINTER, CURRENT_POINTER_TEXT, LEGACY_CURRENT_POINTER};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerMechanism {
    Symlink,
    Junction,
    TextFile,
}

impl fmt::Display for PointerMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PointerMechanism::Symlink => "symlink",
            PointerMechanism::Junction => "junction",
            PointerMechanism::TextFile => "text file",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPointer {
    pub target: PathBuf,
    pub mechanism: PointerMechanism,
}

impl ResolvedPointer {
    /// False when the pointer is stale.
    pub fn target_exists(&self) -> bool {
        self.target.is_dir()
    }
}

/// Mechanisms worth attempting on this platform, in priority order.
pub fn platform_mechanisms() -> &'static [PointerMechanism] {
    if cfg!(windows) {
        &[
            PointerMechanism::Symlink,
            PointerMechanism::Junction,
            PointerMechanism::TextFile,
        ]
    } else {
        &[PointerMechanism::Symlink, PointerMechanism::TextFile]
    }
}

// ---------------------------------------------------------------------------
// Set / clear
// ---------------------------------------------------------------------------

/// Point `Current` at `target`, replacing any existing pointer object.
pub fn set(sprints_dir: &Path, target: &Path) -> Result<PointerMechanism> {
    set_with(sprints_dir, target, platform_mechanisms())
}

/// Like [`set`], restricted to `mechanisms` in the given order.
pub fn set_with(
    sprints_dir: &Path,
    target: &Path,
    mechanisms: &[PointerMechanism],
) -> Result<PointerMechanism> {
    clear(sprints_dir)?;

    let link = sprints_dir.join(CURRENT_POINTER);
    let relative = relative_target(sprints_dir, target);
    let mut last_err = None;

    for &mechanism in mechanisms {
        let attempt = match mechanism {
            PointerMechanism::Symlink => create_symlink(&relative, &link),
            PointerMechanism::Junction => create_junction(target, &link),
            PointerMechanism::TextFile => {
                let text = format!("{}\n", relative.to_string_lossy());
                crate::io::atomic_write(&sprints_dir.join(CURRENT_POINTER_TEXT), text.as_bytes())
                    .map_err(|e| std::io::Error::other(e.to_string()))
            }
        };
        match attempt {
            Ok(()) => {
                tracing::debug!(%mechanism, target = %target.display(), "set Current pointer");
                return Ok(mechanism);
            }
            Err(e) => {
                tracing::debug!(%mechanism, error = %e, "pointer mechanism unavailable");
                last_err = Some(e);
            }
        }
    }

    let err = last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Unsupported, "no pointer mechanism")
    });
    Err(GittaError::io("set Current pointer", &link, err))
}

/// Remove every kind of pointer object, including the legacy name.
pub fn clear(sprints_dir: &Path) -> Result<()> {
    for name in [CURRENT_POINTER, CURRENT_POINTER_TEXT, LEGACY_CURRENT_POINTER] {
        let path = sprints_dir.join(name);
        let Ok(meta) = path.symlink_metadata() else {
            continue;
        };
        if meta.is_dir() && !meta.file_type().is_symlink() {
            tracing::warn!(path = %path.display(), "refusing to remove a real directory named like the pointer");
            continue;
        }
        // Junctions and directory symlinks on Windows need remove_dir.
        if std::fs::remove_file(&path).is_err() {
            std::fs::remove_dir(&path).io_ctx("remove pointer", &path)?;
        }
    }
    Ok(())
}

fn relative_target(sprints_dir: &Path, target: &Path) -> PathBuf {
    target
        .strip_prefix(sprints_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| target.to_path_buf())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlinks unsupported",
    ))
}

#[cfg(windows)]
fn create_junction(target: &Path, link: &Path) -> std::io::Result<()> {
    // Junctions need no privilege but must hold an absolute target.
    let target = std::path::absolute(target)?;
    let status = std::process::Command::new("cmd")
        .arg("/C")
        .arg("mklink")
        .arg("/J")
        .arg(link)
        .arg(&target)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("mklink /J exited with {status}")))
    }
}

#[cfg(not(windows))]
fn create_junction(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "junctions exist only on Windows",
    ))
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

/// Find the pointer and return the directory it designates. Relative targets
/// are resolved against `sprints_dir`, never against the working directory.
pub fn resolve(sprints_dir: &Path) -> Result<ResolvedPointer> {
    for name in [CURRENT_POINTER, CURRENT_POINTER_TEXT, LEGACY_CURRENT_POINTER] {
        let path = sprints_dir.join(name);
        let Ok(meta) = path.symlink_metadata() else {
            continue;
        };
        if meta.file_type().is_symlink() || is_junction(&meta) {
            let raw = std::fs::read_link(&path).io_ctx("read pointer", &path)?;
            return Ok(ResolvedPointer {
                target: anchor(sprints_dir, raw),
                mechanism: link_mechanism(&meta),
            });
        }
        if meta.is_file() {
            let text = std::fs::read_to_string(&path).io_ctx("read pointer", &path)?;
            let line = text.lines().next().unwrap_or("").trim();
            if line.is_empty() {
                tracing::warn!(path = %path.display(), "ignoring empty pointer file");
                continue;
            }
            return Ok(ResolvedPointer {
                target: anchor(sprints_dir, PathBuf::from(line)),
                mechanism: PointerMechanism::TextFile,
            });
        }
    }
    Err(GittaError::NoCurrentPointer(sprints_dir.to_path_buf()))
}

fn anchor(sprints_dir: &Path, raw: PathBuf) -> PathBuf {
    if raw.is_absolute() {
        raw
    } else {
        sprints_dir.join(raw)
    }
}

#[cfg(windows)]
fn link_mechanism(meta: &std::fs::Metadata) -> PointerMechanism {
    use std::os::windows::fs::FileTypeExt;
    if meta.file_type().is_symlink_dir() || meta.file_type().is_symlink_file() {
        PointerMechanism::Symlink
    } else {
        PointerMechanism::Junction
    }
}

#[cfg(not(windows))]
fn link_mechanism(_meta: &std::fs::Metadata) -> PointerMechanism {
    PointerMechanism::Symlink
}

#[cfg(windows)]
fn is_junction(meta: &std::fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
    meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
}

#[cfg(not(windows))]
fn is_junction(_meta: &std::fs::Metadata) -> bool {
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
