//! Core data types shared across the pipeline.

use serde::Deserialize;

/// A geographic entity to ingest assets for. Loaded once from the seed list
/// at startup and never mutated by the pipeline; `id` is the stable upsert
/// key across runs.
#[derive(Debug, Clone, Deserialize)]
pub struct Park {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub biome: String,
    pub established: i32,
    pub area_acres: i64,
    pub summary: String,
}

/// Kind of visual asset tied to a park.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Photo,
    Satellite,
    Curated,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Photo => "photo",
            AssetKind::Satellite => "satellite",
            AssetKind::Curated => "curated",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One acquired or synthesized asset, ready for the catalog writer.
///
/// `reference` is the remote URL for fetched assets and a
/// `synthetic:{layer}:{seed}` tag for synthesized ones; together with the
/// park id and kind it forms the dedup key, so the same logical asset is
/// never recorded twice across runs.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub kind: AssetKind,
    pub source: String,
    pub reference: String,
    pub local_path: Option<String>,
    pub placeholder: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub attribution: Option<String>,
}
