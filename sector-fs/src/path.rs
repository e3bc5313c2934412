//! `/`-separated paths. A leading `/` names the root and may be omitted.

use alloc::vec::Vec;

use crate::{FsError, MAX_DEPTH, NAME_MAX_LEN, Result};

/// Splits `path` into its components, root first.
///
/// `"/"` yields no components. Empty components (`"a//b"`, a trailing `/`)
/// and components holding a NUL byte are rejected, as are components longer than [`NAME_MAX_LEN`] and paths
/// deeper than [`MAX_DEPTH`].
pub fn split(path: &str) -> Result<Vec<&str>> {
    let relative = path.strip_prefix('/').unwrap_or(path);
    if relative.is_empty() {
        return if path.is_empty() {
            Err(FsError::InvalidPath)
        } else {
            Ok(Vec::new())
        };
    }

    let components: Vec<&str> = relative.split('/').collect();
    if components.len() > MAX_DEPTH {
        return Err(FsError::PathTooDeep);
    }
    for name in &components {
        // names are stored NUL-padded
        if name.is_empty() || name.contains('\0') {
            return Err(FsError::InvalidPath);
        }
        if name.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }
    }

    Ok(components)
}

/// Single-component name with an optional leading `/` removed.
#[inline]
pub fn flat_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}
