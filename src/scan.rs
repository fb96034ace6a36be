//! Relative-path enumeration across tier roots.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("path is not within its root: {0}")]
    OutsideRoot(PathBuf),
}

/// Sorted union of relative file paths present under any of the given
/// roots. Roots that do not exist contribute nothing; directories
/// themselves are not listed.
pub fn relative_union(roots: &[&Path]) -> Result<BTreeSet<PathBuf>, ScanError> {
    let mut union = BTreeSet::new();
    for root in roots {
        if !root.exists() {
            continue;
        }
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| ScanError::OutsideRoot(entry.path().to_path_buf()))?;
            union.insert(rel.to_path_buf());
        }
    }
    Ok(union)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn union_across_roots_deduplicates_and_sorts() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();

        fs::create_dir_all(a.path().join("sub")).unwrap();
        fs::write(a.path().join("sub/one.xml"), "<r/>").unwrap();
        fs::write(a.path().join("shared.txt"), "k=1").unwrap();
        fs::write(b.path().join("shared.txt"), "k=2").unwrap();
        fs::write(b.path().join("only_b.dat"), [0u8; 4]).unwrap();

        let union = relative_union(&[a.path(), b.path()]).unwrap();
        let paths: Vec<&Path> = union.iter().map(PathBuf::as_path).collect();
        assert_eq!(
            paths,
            [
                Path::new("only_b.dat"),
                Path::new("shared.txt"),
                Path::new("sub/one.xml"),
            ]
        );
    }

    #[test]
    fn missing_roots_contribute_nothing() {
        let a = tempfile::tempdir().unwrap();
        fs::write(a.path().join("f.txt"), "k=1").unwrap();
        let missing = a.path().join("does-not-exist");

        let union = relative_union(&[a.path(), &missing]).unwrap();
        assert_eq!(union.len(), 1);
        assert!(relative_union(&[&missing]).unwrap().is_empty());
    }
}
