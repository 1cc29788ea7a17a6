//! Point-in-time listing of the test files in a workspace.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use super::classify::is_test_file;
use super::paths::NormalizedPath;

/// Collect every regular file under `workspace` that classifies as a test.
///
/// Symlinks are not followed and never emitted. Entries that cannot be read
/// (permission errors, files removed mid-walk) are skipped; the snapshot
/// itself never fails.
pub fn snapshot_test_files(workspace: &Path) -> BTreeSet<NormalizedPath> {
    let mut files = BTreeSet::new();

    for entry in WalkDir::new(workspace).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable workspace entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(workspace) else {
            continue;
        };

        let normalized = NormalizedPath::from(relative);
        if is_test_file(&normalized) {
            files.insert(normalized);
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x").unwrap();
    }

    fn as_strings(set: &BTreeSet<NormalizedPath>) -> Vec<&str> {
        set.iter().map(NormalizedPath::as_str).collect()
    }

    #[test]
    fn test_collects_only_test_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "src/lib.rs");
        touch(temp.path(), "src/lib_test.rs");
        touch(temp.path(), "tests/integration/helpers.py");
        touch(temp.path(), "README.md");
        touch(temp.path(), "web/__tests__/App.jsx");

        let snapshot = snapshot_test_files(temp.path());

        assert_eq!(
            as_strings(&snapshot),
            vec![
                "src/lib_test.rs",
                "tests/integration/helpers.py",
                "web/__tests__/App.jsx",
            ]
        );
    }

    #[test]
    fn test_directories_are_not_emitted() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(temp.path().join("tests/empty")).unwrap();

        assert!(snapshot_test_files(temp.path()).is_empty());
    }

    #[test]
    fn test_empty_workspace() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(snapshot_test_files(temp.path()).is_empty());
    }

    #[test]
    fn test_missing_root_yields_empty_set() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("gone");
        assert!(snapshot_test_files(&missing).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "real/test_real.py");
        std::os::unix::fs::symlink(
            temp.path().join("real/test_real.py"),
            temp.path().join("test_link.py"),
        )
        .unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("tests")).unwrap();

        let snapshot = snapshot_test_files(temp.path());

        assert_eq!(as_strings(&snapshot), vec!["real/test_real.py"]);
    }
}
