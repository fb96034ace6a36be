//! Deterministic packing of a merged tree into one archive.
//!
//! The merge core's only contract with packing is "hand over a complete,
//! already-merged directory tree". The packer produces a canonical tar:
//! entries sorted by path, epoch timestamps, zeroed ownership, and
//! normalized modes, so packing the same merged tree always yields
//! byte-identical output. A manifest with per-file SHA-256 digests and
//! the archive digest is returned alongside.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tar::{Builder, Header};
use walkdir::WalkDir;

pub const MANIFEST_SCHEMA_ID: &str = "mapstitch/pack_manifest@1";
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("merged tree not found: {0}")]
    MissingTree(PathBuf),

    #[error("path is not within the merged tree: {0}")]
    OutsideRoot(PathBuf),

    #[error("archive already exists: {0}")]
    ArchiveExists(PathBuf),
}

/// Manifest describing one packed archive.
#[derive(Debug, Serialize)]
pub struct PackManifest {
    pub schema_id: &'static str,
    pub schema_version: u32,
    /// SHA-256 of the full archive bytes.
    pub archive_sha256: String,
    pub entries: Vec<PackEntry>,
}

#[derive(Debug, Serialize)]
pub struct PackEntry {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

/// Packs a merged output tree into a canonical tar archive.
pub struct Packer {
    root: PathBuf,
    force: bool,
}

impl Packer {
    pub fn new(root: PathBuf) -> Self {
        Packer { root, force: false }
    }

    /// Allow overwriting an existing archive file.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn collect_entries(&self) -> Result<BTreeMap<PathBuf, bool>, PackError> {
        let mut entries = BTreeMap::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry?;
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| PackError::OutsideRoot(entry.path().to_path_buf()))?;
            if rel.as_os_str().is_empty() {
                continue;
            }
            entries.insert(rel.to_path_buf(), entry.file_type().is_dir());
        }
        Ok(entries)
    }

    /// Build the archive, write it to `out_file`, and return its
    /// manifest.
    pub fn pack_to(&self, out_file: &Path) -> Result<PackManifest, PackError> {
        if !self.root.is_dir() {
            return Err(PackError::MissingTree(self.root.clone()));
        }
        if out_file.exists() && !self.force {
            return Err(PackError::ArchiveExists(out_file.to_path_buf()));
        }

        let entries = self.collect_entries()?;
        let mut archive = Vec::new();
        let mut manifest_entries = Vec::new();

        {
            let mut builder = Builder::new(&mut archive);
            for (rel, is_dir) in &entries {
                let full = self.root.join(rel);
                let mut header = Header::new_gnu();
                header.set_mtime(0);
                header.set_uid(0);
                header.set_gid(0);

                if *is_dir {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    header.set_cksum();
                    builder.append_data(&mut header, rel, io::empty())?;
                } else {
                    let mut contents = Vec::new();
                    File::open(&full)?.read_to_end(&mut contents)?;
                    header.set_size(contents.len() as u64);
                    header.set_mode(0o644);
                    header.set_cksum();
                    builder.append_data(&mut header, rel, contents.as_slice())?;

                    manifest_entries.push(PackEntry {
                        path: rel.to_string_lossy().into_owned(),
                        size: contents.len() as u64,
                        sha256: hex_sha256(&contents),
                    });
                }
            }
            builder.finish()?;
        }

        if let Some(parent) = out_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(out_file, &archive)?;

        Ok(PackManifest {
            schema_id: MANIFEST_SCHEMA_ID,
            schema_version: MANIFEST_SCHEMA_VERSION,
            archive_sha256: hex_sha256(&archive),
            entries: manifest_entries,
        })
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
