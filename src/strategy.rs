//! Per-file merge strategy routing.

use std::path::Path;

use serde::Serialize;

/// How a given relative path is merged across tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Recursive identity-aware node merge for markup catalogs.
    HierarchicalTree,
    /// Section/key-value merge for flat config text.
    SectionTable,
    /// Highest-priority tier that has the file wins wholesale.
    ByteCopy,
}

impl MergeStrategy {
    /// Route by file extension, case-insensitively.
    ///
    /// The caller passes the path of the first candidate file that
    /// actually exists, in Base, Patch, Overlay order; a given relative
    /// path need not exist in all three tiers.
    pub fn for_path(path: &Path) -> MergeStrategy {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xml") => MergeStrategy::HierarchicalTree,
            Some("txt") | Some("ini") => MergeStrategy::SectionTable,
            _ => MergeStrategy::ByteCopy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::HierarchicalTree => "hierarchical_tree",
            MergeStrategy::SectionTable => "section_table",
            MergeStrategy::ByteCopy => "byte_copy",
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
