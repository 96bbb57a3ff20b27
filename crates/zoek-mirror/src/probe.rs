use std::path::{Path, PathBuf};

pub use zoek_core::models::record::STAGING_SUFFIX;
use zoek_core::models::sync_state::LocalCloneState;

/// Where the clone of `name` lives under the mirror root.
pub fn clone_path(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

/// Where an in-progress clone of `name` is written.
pub fn staging_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!(".{name}{STAGING_SUFFIX}"))
}

/// Inspect the mirror root for `name`.
///
/// Existence of a directory is enough for [`LocalCloneState::PresentClean`];
/// the contents are not validated.
pub fn probe(name: &str, root: &Path) -> LocalCloneState {
    let path = clone_path(root, name);
    match std::fs::symlink_metadata(&path) {
        Ok(meta) if meta.is_dir() => LocalCloneState::PresentClean,
        Ok(meta) if meta.file_type().is_symlink() && path.is_dir() => LocalCloneState::PresentClean,
        Ok(_) => {
            tracing::debug!("{} exists but is not a directory", path.display());
            LocalCloneState::PresentUnknown
        }
        Err(_) => LocalCloneState::Absent,
    }
}

/// Whether an earlier clone of `name` was interrupted and left its staging directory.
pub fn stale_staging(root: &Path, name: &str) -> bool {
    staging_path(root, name).exists()
}
