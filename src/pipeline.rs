//! Merge orchestration across three tier roots.
//!
//! For every relative path present in any tier, the orchestrator routes
//! the path to a merge strategy, merges whichever candidate files exist,
//! and writes exactly one output file. A failure on one path is recorded
//! in the report and never aborts the remaining paths.
//!
//! Paths are processed in sorted order, so the report and its per-file
//! conflict records are deterministic for a given set of inputs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::{self, ParseOutcome};
use crate::merge::merge_documents;
use crate::report::{FileAction, FileOutcome, MergeReport};
use crate::scan::{self, ScanError};
use crate::sections::{merge_sections, SectionTable};
use crate::strategy::MergeStrategy;
use crate::tier::Tier;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("relative path escapes the output tree: {0}")]
    UnsafeRelativePath(PathBuf),
}

/// Merges three tier roots into one output tree.
pub struct TreeMerger {
    base: PathBuf,
    patch: PathBuf,
    overlay: PathBuf,
}

/// What a single path's merge produced, before anything is written.
pub struct PathPreview {
    pub outcome: FileOutcome,
    /// Output file content; `None` when no output is produced.
    pub content: Option<Vec<u8>>,
}

/// Resolved output for one path: either freshly merged bytes or a
/// verbatim copy of one tier's file.
enum Payload {
    Bytes(Vec<u8>),
    CopyFrom(PathBuf),
}

impl TreeMerger {
    pub fn new(base: PathBuf, patch: PathBuf, overlay: PathBuf) -> Self {
        TreeMerger {
            base,
            patch,
            overlay,
        }
    }

    fn candidates(&self, rel: &Path) -> [(Tier, PathBuf); 3] {
        [
            (Tier::Base, self.base.join(rel)),
            (Tier::Patch, self.patch.join(rel)),
            (Tier::Overlay, self.overlay.join(rel)),
        ]
    }

    /// Merge every path in the union of the three roots into `out_dir`.
    pub fn merge_to(&self, out_dir: &Path) -> Result<MergeReport, PipelineError> {
        let union = scan::relative_union(&[&self.base, &self.patch, &self.overlay])?;
        let mut files = Vec::with_capacity(union.len());

        for rel in &union {
            let outcome = match self.merge_one(rel, out_dir) {
                Ok(outcome) => outcome,
                // Per-path isolation: record the failure, keep going.
                Err(err) => FileOutcome::failed(
                    rel.display().to_string(),
                    MergeStrategy::for_path(rel),
                    err.to_string(),
                ),
            };
            files.push(outcome);
        }
        Ok(MergeReport::new(files))
    }

    fn merge_one(&self, rel: &Path, out_dir: &Path) -> Result<FileOutcome, PipelineError> {
        use std::path::Component;
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(PipelineError::UnsafeRelativePath(rel.to_path_buf()));
        }

        let (outcome, payload) = self.resolve(rel)?;
        if let Some(payload) = payload {
            let dest = out_dir.join(rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            match payload {
                Payload::Bytes(bytes) => fs::write(&dest, bytes)?,
                Payload::CopyFrom(src) => {
                    fs::copy(&src, &dest)?;
                }
            }
        }
        Ok(outcome)
    }

    /// Merge one path in memory, without touching the output tree.
    pub fn preview(&self, rel: &Path) -> Result<PathPreview, PipelineError> {
        let (outcome, payload) = self.resolve(rel)?;
        let content = match payload {
            Some(Payload::Bytes(bytes)) => Some(bytes),
            Some(Payload::CopyFrom(src)) => Some(fs::read(src)?),
            None => None,
        };
        Ok(PathPreview { outcome, content })
    }

    fn resolve(&self, rel: &Path) -> Result<(FileOutcome, Option<Payload>), PipelineError> {
        let candidates = self.candidates(rel);
        let existing: Vec<(Tier, &Path)> = candidates
            .iter()
            .filter(|(_, p)| p.is_file())
            .map(|(t, p)| (*t, p.as_path()))
            .collect();
        let path = rel.display().to_string();

        let Some(&(_, first)) = existing.first() else {
            // Cannot occur for paths drawn from the union; kept as a
            // defensive invariant.
            let mut outcome =
                FileOutcome::new(path, MergeStrategy::for_path(rel), FileAction::Skipped);
            outcome
                .warnings
                .push("no tier provides this path".to_string());
            return Ok((outcome, None));
        };

        let strategy = MergeStrategy::for_path(first);
        match strategy {
            MergeStrategy::HierarchicalTree => self.resolve_catalog(path, &existing),
            MergeStrategy::SectionTable => self.resolve_sections(path, &existing),
            MergeStrategy::ByteCopy => {
                let (tier, src) = existing[existing.len() - 1];
                let outcome = FileOutcome::copied(path, strategy, tier);
                Ok((outcome, Some(Payload::CopyFrom(src.to_path_buf()))))
            }
        }
    }

    fn resolve_catalog(
        &self,
        path: String,
        existing: &[(Tier, &Path)],
    ) -> Result<(FileOutcome, Option<Payload>), PipelineError> {
        let mut warnings = Vec::new();
        let mut parsed = Vec::new();
        for &(tier, candidate) in existing {
            let bytes = fs::read(candidate)?;
            match catalog::parse_document(&bytes) {
                ParseOutcome::Parsed(node) => parsed.push((tier, candidate, node)),
                ParseOutcome::Unparseable(err) => {
                    warnings.push(format!("{tier} copy treated as absent: {err}"));
                }
            }
        }

        match parsed.len() {
            0 => {
                let mut outcome = FileOutcome::new(
                    path,
                    MergeStrategy::HierarchicalTree,
                    FileAction::Skipped,
                );
                outcome.warnings = warnings;
                outcome
                    .warnings
                    .push("no parseable candidate; no output produced".to_string());
                Ok((outcome, None))
            }
            1 => {
                // Single-sided result passes through verbatim, unmerged.
                let (tier, candidate, _) = parsed.remove(0);
                let mut outcome =
                    FileOutcome::copied(path, MergeStrategy::HierarchicalTree, tier);
                outcome.warnings = warnings;
                Ok((outcome, Some(Payload::CopyFrom(candidate.to_path_buf()))))
            }
            _ => {
                let merged = merge_documents(parsed.into_iter().map(|(_, _, node)| Some(node)));
                let mut outcome = FileOutcome::new(
                    path,
                    MergeStrategy::HierarchicalTree,
                    FileAction::Merged,
                );
                outcome.warnings = warnings;
                let payload = merged
                    .map(|node| Payload::Bytes(catalog::write_document(&node).into_bytes()));
                Ok((outcome, payload))
            }
        }
    }

    fn resolve_sections(
        &self,
        path: String,
        existing: &[(Tier, &Path)],
    ) -> Result<(FileOutcome, Option<Payload>), PipelineError> {
        // A path present in exactly one tier passes through verbatim, so
        // its output is bit-identical to its single source.
        if let [(tier, candidate)] = existing {
            let outcome = FileOutcome::copied(path, MergeStrategy::SectionTable, *tier);
            return Ok((outcome, Some(Payload::CopyFrom(candidate.to_path_buf()))));
        }

        let mut tables = [
            SectionTable::default(),
            SectionTable::default(),
            SectionTable::default(),
        ];
        for &(tier, candidate) in existing {
            let bytes = fs::read(candidate)?;
            tables[tier as usize] = SectionTable::parse(&String::from_utf8_lossy(&bytes));
        }
        let [base, patch, overlay] = tables;
        let (merged, conflicts) = merge_sections(base, patch, overlay);

        let mut outcome = FileOutcome::new(path, MergeStrategy::SectionTable, FileAction::Merged);
        outcome.conflicts = conflicts;
        Ok((
            outcome,
            Some(Payload::Bytes(merged.render().into_bytes())),
        ))
    }
}
