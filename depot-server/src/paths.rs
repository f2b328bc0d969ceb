//! # Artifact Path Resolution
//!
//! Maps the part of a request path after `/repository/<name>/` onto the
//! repository's document root. The sub-path is normalized lexically and checked
//! to stay inside the root before any filesystem operation happens; nothing
//! here relies on the static file server's own traversal protection.

use std::path::{Component, Path, PathBuf};

/// Reasons a sub-path is refused
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Path traversal detected: {path}")]
    PathTraversal { path: String },

    #[error("Absolute path not allowed: {path}")]
    AbsolutePath { path: String },

    #[error("Invalid characters in path: {path}")]
    InvalidCharacters { path: String },

    #[error("Path contains null bytes")]
    NullBytes,

    #[error("Path contains control characters")]
    ControlCharacters,
}

/// Resolves `sub_path` (already percent-decoded) against `root`.
///
/// Empty and `.` segments are dropped, so `a//./b` resolves to `root/a/b` and
/// an empty sub-path resolves to the root itself. Any `..` segment is refused
/// outright rather than normalized away.
pub fn resolve_artifact_path(root: &Path, sub_path: &str) -> Result<PathBuf, PathError> {
    if sub_path.contains('\0') {
        return Err(PathError::NullBytes);
    }

    if sub_path.chars().any(char::is_control) {
        return Err(PathError::ControlCharacters);
    }

    if sub_path.starts_with('/') {
        return Err(PathError::AbsolutePath {
            path: sub_path.to_string(),
        });
    }

    // A backslash is a separator on Windows and never needed in artifact names
    if sub_path.contains('\\') {
        return Err(PathError::InvalidCharacters {
            path: sub_path.to_string(),
        });
    }

    let mut resolved = root.to_path_buf();
    for segment in sub_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(PathError::PathTraversal {
                    path: sub_path.to_string(),
                })
            }
            _ => {}
        }

        // Each segment must be a single plain file name (no drive prefixes)
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => resolved.push(segment),
            _ => {
                return Err(PathError::InvalidCharacters {
                    path: sub_path.to_string(),
                })
            }
        }
    }

    if !resolved.starts_with(root) {
        return Err(PathError::PathTraversal {
            path: sub_path.to_string(),
        });
    }

    Ok(resolved)
}

/// True for sub-paths naming a directory rather than a file.
pub fn is_directory_path(sub_path: &str) -> bool {
    sub_path.is_empty() || sub_path.ends_with('/')
}
