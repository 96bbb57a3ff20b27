use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::probe::STAGING_SUFFIX;

/// A clone directory found directly under the mirror root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredRepo {
    pub name: String,
    pub path: PathBuf,
}

/// List clone directories under `root`, sorted by name.
///
/// Interrupted clone staging directories and blacklisted names are skipped.
pub fn scan_mirror(root: &Path, blacklist: &HashSet<String>) -> Vec<MirroredRepo> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut repos = Vec::new();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(STAGING_SUFFIX) {
            continue;
        }
        if blacklist.contains(&name) {
            tracing::warn!("skipping repo {name}, blacklisted");
            continue;
        }
        repos.push(MirroredRepo {
            name,
            path: entry.path().to_path_buf(),
        });
    }
    repos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("beta").join(".git")).unwrap();
        std::fs::create_dir_all(root.join("alpha").join("nested")).unwrap();
        std::fs::create_dir(root.join(".gamma.zoek-partial")).unwrap();
        std::fs::create_dir(root.join(".github")).unwrap();
        std::fs::create_dir(root.join("private")).unwrap();
        std::fs::write(root.join("notes.txt"), "x").unwrap();

        let blacklist: HashSet<String> = ["private".to_string()].into_iter().collect();
        let repos = scan_mirror(root, &blacklist);
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec![".github", "alpha", "beta"]);
        assert_eq!(repos[1].path, root.join("alpha"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_mirror(&dir.path().join("missing"), &HashSet::new()).is_empty());
    }
}
