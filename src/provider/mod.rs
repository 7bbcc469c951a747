//! External imagery provider abstraction.
//!
//! One trait covers all three provider classes so the fetch client and
//! orchestrator never branch on provider identity: a keyed photo search, a
//! coordinate-keyed satellite lookup, and a code-keyed curated metadata
//! source. Each implementation turns its API's response shape into plain
//! [`Candidate`]s; all network I/O goes through the shared [`FetchClient`].

mod counters;
mod curated;
mod photo;
mod satellite;

use std::sync::Arc;

use tracing::warn;

use crate::config::ProvidersConfig;
use crate::error::IngestError;
use crate::fetch::FetchClient;
use crate::model::Park;

pub use counters::{CallCounters, CallCountersSnapshot};
pub use curated::CuratedParkProvider;
pub use photo::PhotoSearchProvider;
pub use satellite::SatelliteImageryProvider;

/// Provider class, used for rate limiting and call accounting. The
/// discriminants index the rate limiter's slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderClass {
    PhotoSearch = 0,
    SatelliteImagery = 1,
    CuratedMetadata = 2,
}

impl ProviderClass {
    pub const ALL: [ProviderClass; 3] = [
        ProviderClass::PhotoSearch,
        ProviderClass::SatelliteImagery,
        ProviderClass::CuratedMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderClass::PhotoSearch => "photo_search",
            ProviderClass::SatelliteImagery => "satellite_imagery",
            ProviderClass::CuratedMetadata => "curated_metadata",
        }
    }
}

/// One downloadable source for a logical asset, as surfaced by a provider.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub url: String,
    /// Extra request headers the download needs (e.g. auth).
    pub headers: Vec<(String, String)>,
    pub source: &'static str,
    pub attribution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A provider answers either by query (photo/curated search) or by
/// coordinates (satellite lookup); the default impls let each implementation
/// supply only the mode it supports.
pub trait ImageryProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn class(&self) -> ProviderClass;

    /// Ranked candidate images for a park. Empty is a valid answer.
    fn search(&self, _park: &Park, _counters: &CallCounters) -> Result<Vec<Candidate>, IngestError> {
        Ok(Vec::new())
    }

    /// Zero or one binary image located by the park's coordinates.
    fn locate(&self, _park: &Park, _counters: &CallCounters) -> Result<Option<Candidate>, IngestError> {
        Ok(None)
    }
}

/// Build the configured providers. A provider without credentials is skipped
/// with a warning; its layer then falls through to the next source or to
/// synthesis, same as any other unavailable provider.
pub fn create_providers(
    config: &ProvidersConfig,
    fetch: Arc<FetchClient>,
) -> Vec<Arc<dyn ImageryProvider>> {
    let mut providers: Vec<Arc<dyn ImageryProvider>> = Vec::new();

    match &config.photo.access_key {
        Some(key) => providers.push(Arc::new(PhotoSearchProvider::new(
            &config.photo.endpoint,
            key,
            config.photo.per_park,
            Arc::clone(&fetch),
        ))),
        None => warn!("photo search provider disabled: no access key configured"),
    }

    match &config.satellite.api_key {
        Some(key) => providers.push(Arc::new(SatelliteImageryProvider::new(
            &config.satellite.endpoint,
            key,
            config.satellite.dim_degrees,
            Arc::clone(&fetch),
        ))),
        None => warn!("satellite imagery provider disabled: no API key configured"),
    }

    match &config.curated.api_key {
        Some(key) => providers.push(Arc::new(CuratedParkProvider::new(
            &config.curated.endpoint,
            key,
            config.curated.per_park,
            fetch,
        ))),
        None => warn!("curated metadata provider disabled: no API key configured"),
    }

    providers
}
