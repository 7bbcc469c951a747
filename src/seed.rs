//! Entity seed list loading.
//!
//! The park list is a static CSV input (id, name, country, latitude,
//! longitude, biome, established, area_acres, summary). A missing or
//! unparsable file is fatal to the run; individual rows never are, because
//! the list is curated alongside the repo and a bad row is a data bug worth
//! surfacing immediately.

use anyhow::{Context, Result};
use std::path::Path;

use crate::model::Park;

pub fn load_parks(path: &Path) -> Result<Vec<Park>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open seed list {}", path.display()))?;

    let mut parks = Vec::new();
    for (index, record) in reader.deserialize::<Park>().enumerate() {
        let park = record.with_context(|| {
            format!("bad seed row {} in {}", index + 1, path.display())
        })?;
        parks.push(park);
    }

    // Stable processing order regardless of how the CSV is maintained.
    parks.sort_by_key(|p| p.id);
    Ok(parks)
}
