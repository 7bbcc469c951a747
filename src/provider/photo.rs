//! Keyed photo search provider (Unsplash-compatible API shape).

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{CallCounters, Candidate, ImageryProvider, ProviderClass};
use crate::error::IngestError;
use crate::fetch::{Expectation, FetchClient};
use crate::model::Park;

pub struct PhotoSearchProvider {
    endpoint: String,
    access_key: String,
    per_park: usize,
    fetch: Arc<FetchClient>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: PhotoUrls,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    user: PhotoUser,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    #[serde(default)]
    raw: Option<String>,
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
}

impl PhotoSearchProvider {
    pub fn new(endpoint: &str, access_key: &str, per_park: usize, fetch: Arc<FetchClient>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
            per_park,
            fetch,
        }
    }

    fn search_query(park: &Park) -> String {
        match park.country.as_deref() {
            Some(country) if country != "United States" => {
                format!("{} {}", park.name, country)
            }
            _ => format!("{} National Park", park.name),
        }
    }

    fn download_url(result: &SearchResult) -> String {
        // Prefer the raw rendition and pin a consistent crop; the raw URL
        // already carries query parameters.
        match &result.urls.raw {
            Some(raw) => {
                let separator = if raw.contains('?') { '&' } else { '?' };
                format!("{}{}w=1920&h=1080&fit=crop&q=80", raw, separator)
            }
            None => result.urls.regular.clone(),
        }
    }

    fn parse_candidates(body: &[u8], limit: usize) -> Result<Vec<Candidate>, IngestError> {
        let response: SearchResponse = serde_json::from_slice(body)
            .map_err(|e| IngestError::Transient(format!("unparsable search response: {}", e)))?;

        Ok(response
            .results
            .iter()
            .take(limit)
            .map(|result| Candidate {
                url: Self::download_url(result),
                headers: Vec::new(),
                source: "unsplash",
                attribution: Some(format!("Photo by {} on Unsplash", result.user.name)),
                width: result.width,
                height: result.height,
            })
            .collect())
    }
}

impl ImageryProvider for PhotoSearchProvider {
    fn name(&self) -> &'static str {
        "unsplash"
    }

    fn class(&self) -> ProviderClass {
        ProviderClass::PhotoSearch
    }

    fn search(&self, park: &Park, counters: &CallCounters) -> Result<Vec<Candidate>, IngestError> {
        let url = format!("{}/search/photos", self.endpoint);
        let query = Self::search_query(park);
        let per_page = self.per_park.to_string();
        let auth = format!("Client-ID {}", self.access_key);

        debug!(park = %park.name, query = %query, "photo search");

        let payload = self.fetch.get_retrying(
            &url,
            &[
                ("query", query.as_str()),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
                ("content_filter", "high"),
            ],
            &[("Authorization", auth.as_str())],
            Expectation::Json,
            ProviderClass::PhotoSearch,
            counters,
        )?;

        Self::parse_candidates(&payload.bytes, self.per_park)
    }
}
