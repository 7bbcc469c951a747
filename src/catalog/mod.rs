//! SQLite catalog writer.
//!
//! All writes for one park go through a single transaction: the park upsert
//! first, then its assets, so a crash can never leave an asset pointing at
//! an uncommitted park. Asset inserts are keyed by a content-derived dedup
//! hash with a UNIQUE index; re-running the pipeline over the same inputs
//! inserts nothing the second time.

mod schema;

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::IngestError;
use crate::model::{AssetKind, NewAsset, Park};

pub use schema::SCHEMA;

pub struct Catalog {
    conn: Connection,
}

/// What a per-entity transaction actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

/// Stable dedup key: the same logical asset always hashes identically, no
/// matter which run records it.
pub fn dedup_key(park_id: i64, kind: AssetKind, reference: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(park_id.to_le_bytes());
    hasher.update([0x1F]);
    hasher.update(kind.as_str().as_bytes());
    hasher.update([0x1F]);
    hasher.update(reference.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, IngestError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn initialize(&self) -> Result<(), IngestError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert-or-replace a park row, keyed by its stable id.
    pub fn upsert_entity(&mut self, park: &Park) -> Result<(), IngestError> {
        let tx = self.conn.transaction()?;
        upsert_park(&tx, park)?;
        tx.commit()?;
        Ok(())
    }

    /// Record a single asset; returns false when the dedup key already
    /// exists. The park row must already be present.
    pub fn record_asset(&mut self, park_id: i64, asset: &NewAsset) -> Result<bool, IngestError> {
        let tx = self.conn.transaction()?;
        let inserted = insert_asset(&tx, park_id, asset)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Upsert the park and record its assets atomically: the park row lands
    /// before any of its assets inside one transaction, so a crash cannot
    /// leave an asset without its park. Duplicate assets (same dedup key)
    /// are skipped, making a full re-run a no-op.
    pub fn persist_entity(
        &mut self,
        park: &Park,
        assets: &[NewAsset],
    ) -> Result<PersistOutcome, IngestError> {
        let tx = self.conn.transaction()?;

        upsert_park(&tx, park)?;

        let mut outcome = PersistOutcome::default();
        for asset in assets {
            if insert_asset(&tx, park.id, asset)? {
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    pub fn park_count(&self) -> Result<i64, IngestError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM parks", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn asset_count(&self) -> Result<i64, IngestError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_assets(&self, park_id: i64, kind: AssetKind) -> Result<i64, IngestError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM assets WHERE park_id = ? AND kind = ?",
            rusqlite::params![park_id, kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Distinct provenance tags recorded for one park and kind.
    pub fn asset_sources(&self, park_id: i64, kind: AssetKind) -> Result<Vec<String>, IngestError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT source FROM assets WHERE park_id = ? AND kind = ? ORDER BY source",
        )?;
        let sources = stmt
            .query_map(rusqlite::params![park_id, kind.as_str()], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(sources)
    }
}

fn upsert_park(tx: &rusqlite::Transaction<'_>, park: &Park) -> Result<(), IngestError> {
    tx.execute(
        r#"
        INSERT OR REPLACE INTO parks
        (id, name, country, latitude, longitude, biome, established, area_acres, summary, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
        rusqlite::params![
            park.id,
            park.name,
            park.country,
            park.latitude,
            park.longitude,
            park.biome,
            park.established,
            park.area_acres,
            park.summary,
        ],
    )?;
    Ok(())
}

fn insert_asset(
    tx: &rusqlite::Transaction<'_>,
    park_id: i64,
    asset: &NewAsset,
) -> Result<bool, IngestError> {
    let key = dedup_key(park_id, asset.kind, &asset.reference);
    let changed = tx.execute(
        r#"
        INSERT OR IGNORE INTO assets
        (park_id, kind, source, reference, local_path, placeholder,
         width, height, attribution, dedup_key, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
        rusqlite::params![
            park_id,
            asset.kind.as_str(),
            asset.source,
            asset.reference,
            asset.local_path,
            asset.placeholder,
            asset.width,
            asset.height,
            asset.attribution,
            key,
        ],
    )?;
    Ok(changed > 0)
}
