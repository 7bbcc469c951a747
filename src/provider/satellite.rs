//! Coordinate-keyed satellite imagery provider (NASA Earth API shape).
//!
//! Two-step lookup, matching the upstream API: an availability check against
//! the assets endpoint, then the imagery endpoint URL handed back as the
//! candidate for the fetch client to download.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{CallCounters, Candidate, ImageryProvider, ProviderClass};
use crate::error::IngestError;
use crate::fetch::{Expectation, FetchClient};
use crate::model::Park;

pub struct SatelliteImageryProvider {
    endpoint: String,
    api_key: String,
    dim_degrees: f64,
    fetch: Arc<FetchClient>,
}

#[derive(Debug, Deserialize)]
struct AssetsResponse {
    #[serde(default)]
    count: u64,
}

impl SatelliteImageryProvider {
    pub fn new(endpoint: &str, api_key: &str, dim_degrees: f64, fetch: Arc<FetchClient>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            dim_degrees,
            fetch,
        }
    }

    fn imagery_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/planetary/earth/imagery?lon={}&lat={}&dim={}&api_key={}",
            self.endpoint, lon, lat, self.dim_degrees, self.api_key
        )
    }
}

impl ImageryProvider for SatelliteImageryProvider {
    fn name(&self) -> &'static str {
        "nasa"
    }

    fn class(&self) -> ProviderClass {
        ProviderClass::SatelliteImagery
    }

    fn locate(&self, park: &Park, counters: &CallCounters) -> Result<Option<Candidate>, IngestError> {
        let url = format!("{}/planetary/earth/assets", self.endpoint);
        let lat = park.latitude.to_string();
        let lon = park.longitude.to_string();
        let dim = self.dim_degrees.to_string();

        debug!(park = %park.name, lat = park.latitude, lon = park.longitude, "satellite lookup");

        let payload = self.fetch.get_retrying(
            &url,
            &[
                ("lon", lon.as_str()),
                ("lat", lat.as_str()),
                ("dim", dim.as_str()),
                ("api_key", self.api_key.as_str()),
            ],
            &[],
            Expectation::Json,
            ProviderClass::SatelliteImagery,
            counters,
        )?;

        let assets: AssetsResponse = serde_json::from_slice(&payload.bytes)
            .map_err(|e| IngestError::Transient(format!("unparsable assets response: {}", e)))?;

        if assets.count == 0 {
            debug!(park = %park.name, "no satellite scenes cover these coordinates");
            return Ok(None);
        }

        Ok(Some(Candidate {
            url: self.imagery_url(park.latitude, park.longitude),
            headers: Vec::new(),
            source: "nasa",
            attribution: Some("NASA Earth Observatory".to_string()),
            width: None,
            height: None,
        }))
    }
}
