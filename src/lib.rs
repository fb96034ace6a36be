//! mapstitch - deterministic three-tier merge of map descriptor trees
//!
//! Merges three overlapping directory trees (base map, game patch,
//! overlay fixes) into one output tree. Markup catalog files merge
//! node-by-node with identity matching and structural deduplication;
//! flat section/key-value files merge key-by-key with conflict
//! reporting; everything else is copied from the highest-priority tier.

pub mod catalog;
pub mod merge;
pub mod pack;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod sections;
pub mod strategy;
pub mod tier;

pub use catalog::{parse_document, write_document, Node, ParseOutcome};
pub use merge::{merge_documents, merge_nodes, IdentityKey, StructuralSignature};
pub use pack::{PackManifest, Packer};
pub use pipeline::TreeMerger;
pub use report::{FileAction, FileOutcome, MergeReport};
pub use sections::{merge_sections, ConflictRecord, SectionTable};
pub use strategy::MergeStrategy;
pub use tier::Tier;
