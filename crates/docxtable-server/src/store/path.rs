use docxtable_core::TableError;
use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::ToolError;

/// Cache key for a document path: absolute, with `.` and `..` resolved
/// lexically, and case-folded on case-insensitive hosts.
///
/// The file does not need to exist, so symlinks are not followed.
pub fn normalize_path(path: &Path) -> Result<PathBuf, ToolError> {
    if path.as_os_str().is_empty() {
        return Err(TableError::DataFormat("File path cannot be empty".to_string()).into());
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    if cfg!(windows) {
        normalized = PathBuf::from(normalized.to_string_lossy().to_lowercase());
    }
    Ok(normalized)
}
