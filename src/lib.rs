//! parkfetch: batch asset ingestion for the ParkSphere catalog.
//!
//! Fetches photos, satellite imagery, and curated images for a static list
//! of parks from rate-limited external providers, falls back to procedural
//! texture synthesis when sources are exhausted, post-processes images into
//! sized derivatives, and records everything idempotently in SQLite.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod process;
pub mod provider;
pub mod ratelimit;
pub mod seed;
pub mod store;
pub mod synth;

pub use catalog::Catalog;
pub use config::Config;
pub use error::IngestError;
pub use ingest::{Orchestrator, RunSummary};
pub use model::{AssetKind, NewAsset, Park};
pub use synth::{SynthesisSpec, Synthesizer};
