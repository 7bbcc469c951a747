//! Code-keyed curated metadata provider (NPS API shape).
//!
//! Only covers United States parks; the park code is derived from the name
//! the way NPS mints them (first four letters of a one-word name, two plus
//! two for longer names: Yellowstone -> yell, Grand Canyon -> grca).

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{CallCounters, Candidate, ImageryProvider, ProviderClass};
use crate::error::IngestError;
use crate::fetch::{Expectation, FetchClient};
use crate::model::Park;

pub struct CuratedParkProvider {
    endpoint: String,
    api_key: String,
    per_park: usize,
    fetch: Arc<FetchClient>,
}

#[derive(Debug, Deserialize)]
struct ParksResponse {
    #[serde(default)]
    data: Vec<ParkData>,
}

#[derive(Debug, Deserialize)]
struct ParkData {
    #[serde(default)]
    images: Vec<ParkImage>,
}

#[derive(Debug, Deserialize)]
struct ParkImage {
    #[serde(default)]
    url: String,
    #[serde(default)]
    credit: Option<String>,
}

pub fn park_code(name: &str) -> String {
    let words: Vec<String> = name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect();

    match words.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(4).collect(),
        [first, second, ..] => {
            let mut code: String = first.chars().take(2).collect();
            code.extend(second.chars().take(2));
            code
        }
    }
}

impl CuratedParkProvider {
    pub fn new(endpoint: &str, api_key: &str, per_park: usize, fetch: Arc<FetchClient>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            per_park,
            fetch,
        }
    }

    fn parse_candidates(body: &[u8], limit: usize) -> Result<Vec<Candidate>, IngestError> {
        let response: ParksResponse = serde_json::from_slice(body)
            .map_err(|e| IngestError::Transient(format!("unparsable parks response: {}", e)))?;

        let Some(park_data) = response.data.first() else {
            return Ok(Vec::new());
        };

        Ok(park_data
            .images
            .iter()
            .filter(|image| !image.url.is_empty())
            .take(limit)
            .map(|image| Candidate {
                url: image.url.clone(),
                headers: Vec::new(),
                source: "nps",
                attribution: Some(match &image.credit {
                    Some(credit) => format!("NPS Photo: {}", credit),
                    None => "NPS Photo".to_string(),
                }),
                width: None,
                height: None,
            })
            .collect())
    }
}

impl ImageryProvider for CuratedParkProvider {
    fn name(&self) -> &'static str {
        "nps"
    }

    fn class(&self) -> ProviderClass {
        ProviderClass::CuratedMetadata
    }

    fn search(&self, park: &Park, counters: &CallCounters) -> Result<Vec<Candidate>, IngestError> {
        if park.country.as_deref() != Some("United States") {
            return Ok(Vec::new());
        }

        let code = park_code(&park.name);
        if code.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/parks", self.endpoint);
        debug!(park = %park.name, code = %code, "curated metadata lookup");

        let payload = self.fetch.get_retrying(
            &url,
            &[("parkCode", code.as_str()), ("api_key", self.api_key.as_str())],
            &[],
            Expectation::Json,
            ProviderClass::CuratedMetadata,
            counters,
        )?;

        Self::parse_candidates(&payload.bytes, self.per_park)
    }
}
