//! Error taxonomy for the ingestion pipeline.
//!
//! The split matters to the orchestrator: transient failures are retried
//! within a candidate's budget, permanent failures skip straight to the next
//! candidate, and `AssetUnavailable` is the expected end state of an
//! exhausted fallback chain, handled by synthesis rather than surfaced.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network failure, timeout, 429 or 5xx. Retried within the attempt budget.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// Non-retryable HTTP status (4xx other than 429). Advances the fallback
    /// chain without consuming further attempts on this candidate.
    #[error("permanent fetch failure: {0}")]
    Permanent(String),

    /// Every candidate in the fallback chain was exhausted. Expected,
    /// non-fatal; the orchestrator falls through to synthesis.
    #[error("no candidate source yielded a usable asset")]
    AssetUnavailable,

    /// The downloaded payload could not be decoded as an image. Treated the
    /// same as `AssetUnavailable` for the candidate that produced it.
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    /// A synthesis region/feature table failed validation. Fatal at startup,
    /// never raised during rendering.
    #[error("invalid synthesis spec: {0}")]
    InvalidSyntheticSpec(String),

    /// Catalog write failure. The orchestrator retries the entity's
    /// transaction once before reporting the entity failed.
    #[error("catalog write failed: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("asset store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// True for failures worth another attempt against the same candidate.
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(IngestError::Transient("timeout".into()).is_transient());
        assert!(!IngestError::Permanent("404".into()).is_transient());
        assert!(!IngestError::AssetUnavailable.is_transient());
    }
}
