//! Filesystem asset directory.
//!
//! Derivative files are keyed by a deterministic name (park id, asset kind,
//! short content hash of the source reference) so re-runs overwrite in place
//! rather than accumulating variants. The audit walk finds files that exist
//! but are implausibly small (half-written downloads from an interrupted
//! run) and reports them for regeneration.

use std::fs;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use walkdir::WalkDir;

use crate::error::IngestError;
use crate::model::AssetKind;

/// Files smaller than this are treated as missing by the audit.
pub const MIN_PLAUSIBLE_BYTES: u64 = 10_000;

pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic base filename for an asset:
    /// `park_{id}_{kind}_{hash8}.jpg`.
    pub fn asset_filename(park_id: i64, kind: AssetKind, reference: &str) -> String {
        let digest = format!("{:x}", Md5::digest(reference.as_bytes()));
        format!("park_{}_{}_{}.jpg", park_id, kind.as_str(), &digest[..8])
    }

    /// Derivative name for a size preset: `{preset}_{filename}`.
    pub fn preset_filename(preset: &str, filename: &str) -> String {
        format!("{}_{}", preset, filename)
    }

    pub fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, IngestError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(filename);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn exists_with_min_size(&self, filename: &str, min_bytes: u64) -> bool {
        fs::metadata(self.root.join(filename))
            .map(|meta| meta.is_file() && meta.len() >= min_bytes)
            .unwrap_or(false)
    }

    /// Walk the store and return files below the plausibility threshold.
    pub fn audit_undersized(&self, min_bytes: u64) -> Result<Vec<PathBuf>, IngestError> {
        let mut undersized = Vec::new();

        if !self.root.exists() {
            return Ok(undersized);
        }

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                if size < min_bytes {
                    undersized.push(entry.path().to_path_buf());
                }
            }
        }

        undersized.sort();
        Ok(undersized)
    }
}
