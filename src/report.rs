//! Merge report emitted after a tree merge.
//!
//! Diagnostics are collected per file and attributed to that file's
//! relative path; the merge itself never prints. The CLI decides how to
//! surface the report (human-readable or JSON).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sections::ConflictRecord;
use crate::strategy::MergeStrategy;
use crate::tier::Tier;

pub const REPORT_SCHEMA_ID: &str = "mapstitch/merge_report@1";
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Full report for one tree merge invocation.
#[derive(Debug, Serialize)]
pub struct MergeReport {
    pub schema_id: &'static str,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub files: Vec<FileOutcome>,
}

impl MergeReport {
    pub fn new(files: Vec<FileOutcome>) -> Self {
        MergeReport {
            schema_id: REPORT_SCHEMA_ID,
            schema_version: REPORT_SCHEMA_VERSION,
            created_at: Utc::now(),
            files,
        }
    }

    pub fn conflicts(&self) -> impl Iterator<Item = (&str, &ConflictRecord)> {
        self.files
            .iter()
            .flat_map(|f| f.conflicts.iter().map(move |c| (f.path.as_str(), c)))
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .flat_map(|f| f.warnings.iter().map(move |w| (f.path.as_str(), w.as_str())))
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| f.action == FileAction::Failed)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What happened to one relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// Two or more tiers contributed; a merged file was written.
    Merged,
    /// One tier's content was copied verbatim.
    Copied,
    /// No output was produced (all candidates absent or unparseable).
    Skipped,
    /// Merging this path failed; other paths were unaffected.
    Failed,
}

/// Per-file entry in the report.
#[derive(Debug, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub strategy: MergeStrategy,
    pub action: FileAction,
    /// Tier whose content was copied verbatim, for `Copied` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied_from: Option<Tier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl FileOutcome {
    pub fn new(path: String, strategy: MergeStrategy, action: FileAction) -> Self {
        FileOutcome {
            path,
            strategy,
            action,
            copied_from: None,
            conflicts: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn copied(path: String, strategy: MergeStrategy, from: Tier) -> Self {
        let mut outcome = Self::new(path, strategy, FileAction::Copied);
        outcome.copied_from = Some(from);
        outcome
    }

    pub fn failed(path: String, strategy: MergeStrategy, reason: String) -> Self {
        let mut outcome = Self::new(path, strategy, FileAction::Failed);
        outcome.warnings.push(reason);
        outcome
    }
}
