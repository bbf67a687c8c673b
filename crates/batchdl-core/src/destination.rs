//! Destination validation: maps a request's relative destination onto an
//! existing directory under the configured root.

use std::path::{Component, Path, PathBuf};

use crate::error::DestinationError;

/// Resolve `relative` against `root`.
///
/// The joined path is normalized lexically and must stay inside `root`
/// (compared component by component, so `/data` does not contain
/// `/dataEvil`). It must name an existing directory; symlinks are then
/// resolved and the result checked again.
pub fn resolve_destination(root: &Path, relative: &str) -> Result<PathBuf, DestinationError> {
    let root = root.canonicalize().map_err(|source| io_or_missing(root, source))?;
    let joined = normalize(&root.join(relative.trim()));
    if !joined.starts_with(&root) {
        return Err(DestinationError::OutsideRoot(joined));
    }
    if !joined.is_dir() {
        return Err(DestinationError::NotFound(joined));
    }

    let resolved = joined
        .canonicalize()
        .map_err(|source| io_or_missing(&joined, source))?;
    if !resolved.starts_with(&root) {
        return Err(DestinationError::OutsideRoot(resolved));
    }
    Ok(resolved)
}

fn io_or_missing(path: &Path, source: std::io::Error) -> DestinationError {
    if source.kind() == std::io::ErrorKind::NotFound {
        DestinationError::NotFound(path.to_path_buf())
    } else {
        DestinationError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
