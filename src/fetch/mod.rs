//! Fetch-with-fallback client.
//!
//! One logical asset may have several candidate sources. Each candidate gets
//! a bounded number of attempts with exponential backoff; transient failures
//! burn attempts, permanent failures skip straight to the next candidate,
//! and an exhausted chain ends in `AssetUnavailable` for the orchestrator to
//! turn into synthesis.

pub mod http;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::FetchConfig;
use crate::error::IngestError;
use crate::provider::{CallCounters, Candidate, ProviderClass};

pub use http::{HttpFetch, HttpResponse, UreqClient};

/// What a successful payload must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Binary image: content-type in the `image/` family and at least the
    /// configured minimum size.
    Image,
    /// API response: any non-empty body.
    Json,
}

#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub struct FetchClient {
    http: Arc<dyn HttpFetch>,
    clock: Arc<dyn Clock>,
    cancel: Arc<AtomicBool>,
    retry_budget: u32,
    backoff_base: Duration,
    min_payload_bytes: usize,
}

impl FetchClient {
    pub fn new(
        http: Arc<dyn HttpFetch>,
        clock: Arc<dyn Clock>,
        cancel: Arc<AtomicBool>,
        config: &FetchConfig,
    ) -> Self {
        Self {
            http,
            clock,
            cancel,
            retry_budget: config.retry_budget.max(1),
            backoff_base: Duration::from_secs(config.backoff_base_secs),
            min_payload_bytes: config.min_payload_bytes,
        }
    }

    /// Retrying GET against a single URL. Used by providers for API calls and
    /// by `fetch_first` for each candidate in a chain.
    pub fn get_retrying(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        expectation: Expectation,
        class: ProviderClass,
        counters: &CallCounters,
    ) -> Result<FetchedPayload, IngestError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            counters.record_attempt(class);

            let outcome = self
                .http
                .get(url, query, headers)
                .and_then(|response| self.validate(response, expectation, url));

            match outcome {
                Ok(payload) => return Ok(payload),
                Err(err @ IngestError::Transient(_)) if attempt < self.retry_budget => {
                    if self.cancel.load(Ordering::SeqCst) {
                        debug!(url, "cancelled; abandoning retries");
                        return Err(err);
                    }
                    let delay = self.backoff_delay(attempt);
                    debug!(url, attempt, ?delay, error = %err, "retrying after backoff");
                    self.clock.sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Walk the fallback chain, returning the first candidate that yields a
    /// valid payload. Exhaustion of every candidate is `AssetUnavailable`.
    pub fn fetch_first(
        &self,
        candidates: &[Candidate],
        class: ProviderClass,
        counters: &CallCounters,
    ) -> Result<(Candidate, FetchedPayload), IngestError> {
        for candidate in candidates {
            let headers: Vec<(&str, &str)> = candidate
                .headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();

            match self.get_retrying(
                &candidate.url,
                &[],
                &headers,
                Expectation::Image,
                class,
                counters,
            ) {
                Ok(payload) => return Ok((candidate.clone(), payload)),
                Err(err) => {
                    warn!(
                        url = %candidate.url,
                        source = candidate.source,
                        error = %err,
                        "candidate exhausted, advancing fallback chain"
                    );
                }
            }
        }

        Err(IngestError::AssetUnavailable)
    }

    fn validate(
        &self,
        response: HttpResponse,
        expectation: Expectation,
        url: &str,
    ) -> Result<FetchedPayload, IngestError> {
        if !response.is_success() {
            let reason = format!("HTTP {} from {}", response.status, url);
            // 429 is the provider asking us to slow down, not a dead source.
            return if response.status == 429 || response.status >= 500 {
                Err(IngestError::Transient(reason))
            } else {
                Err(IngestError::Permanent(reason))
            };
        }

        if response.body.is_empty() {
            return Err(IngestError::Transient(format!("empty body from {}", url)));
        }

        if expectation == Expectation::Image {
            if !response.content_type.starts_with("image/") {
                return Err(IngestError::Transient(format!(
                    "expected image, got {} from {}",
                    response.content_type, url
                )));
            }
            if response.body.len() < self.min_payload_bytes {
                return Err(IngestError::Transient(format!(
                    "suspiciously small payload ({} bytes) from {}",
                    response.body.len(),
                    url
                )));
            }
        }

        Ok(FetchedPayload {
            bytes: response.body,
            content_type: response.content_type,
        })
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = (attempt - 1).min(6);
        self.backoff_base * (1u32 << exponent)
    }
}
