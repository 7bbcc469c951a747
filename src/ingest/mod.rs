//! Ingestion orchestrator.
//!
//! Drives the per-entity workflow: each asset layer walks its provider
//! chain in priority order behind the rate limiter, successful downloads
//! are post-processed and staged, exhausted chains fall through to
//! synthesis where configured, and the entity's full asset set is committed
//! in one catalog transaction. A failing entity is reported and the run
//! moves on; only startup configuration problems abort a run.
//!
//! Layer progression per entity:
//! `Pending -> Fetching(provider 0) -> Fetching(provider 1) -> ... ->
//! {Processed | Synthesizing} -> Persisted`. `AssetUnavailable` and
//! `ImageDecodeError` both advance to the next provider; synthesis never
//! fails once the spec has validated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::config::ImageConfig;
use crate::error::IngestError;
use crate::fetch::FetchClient;
use crate::model::{AssetKind, NewAsset, Park};
use crate::process;
use crate::provider::{CallCounters, CallCountersSnapshot, Candidate, ImageryProvider, ProviderClass};
use crate::ratelimit::RateLimiter;
use crate::store::AssetStore;
use crate::synth::{LayerKind, Synthesizer};

/// Planet texture files below this size are interrupted writes and get
/// regenerated by `ensure_planet_textures`.
const MIN_TEXTURE_BYTES: u64 = 64;

/// How one layer of one entity resolved.
enum LayerOutcome {
    Fetched(NewAsset),
    Synthesized(NewAsset),
    Missing,
}

/// Per-entity result for the end-of-run summary.
#[derive(Debug, Clone)]
pub struct EntityReport {
    pub park_id: i64,
    pub name: String,
    pub assets_inserted: usize,
    pub duplicates_skipped: usize,
    /// Layers for which no source produced an asset and no synthetic
    /// fallback is configured.
    pub missing: Vec<AssetKind>,
    pub error: Option<String>,
}

impl EntityReport {
    fn new(park: &Park) -> Self {
        Self {
            park_id: park.id,
            name: park.name.clone(),
            assets_inserted: 0,
            duplicates_skipped: 0,
            missing: Vec::new(),
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub reports: Vec<EntityReport>,
    pub provider_calls: CallCountersSnapshot,
}

pub struct Orchestrator {
    providers: Vec<Arc<dyn ImageryProvider>>,
    fetch: Arc<FetchClient>,
    limiter: RateLimiter,
    synthesizer: Synthesizer,
    catalog: Catalog,
    store: AssetStore,
    textures: AssetStore,
    images: ImageConfig,
    counters: CallCounters,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        providers: Vec<Arc<dyn ImageryProvider>>,
        fetch: Arc<FetchClient>,
        limiter: RateLimiter,
        synthesizer: Synthesizer,
        catalog: Catalog,
        store: AssetStore,
        textures: AssetStore,
        images: ImageConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            providers,
            fetch,
            limiter,
            synthesizer,
            catalog,
            store,
            textures,
            images,
            counters: CallCounters::default(),
            cancel,
        }
    }

    /// Process the entity list sequentially. Cancellation stops scheduling
    /// new entities; the entity in flight finishes so its writes stay whole.
    pub fn run(&mut self, parks: &[Park]) -> RunSummary {
        let started_at = Local::now();
        let mut summary = RunSummary {
            started_at,
            finished_at: started_at,
            processed: 0,
            succeeded: 0,
            failed: 0,
            reports: Vec::new(),
            provider_calls: CallCountersSnapshot::default(),
        };
        info!(total = parks.len(), "starting ingestion run");

        for park in parks {
            if self.cancel.load(Ordering::SeqCst) {
                info!(
                    remaining = parks.len() - summary.processed,
                    "cancellation requested; not scheduling further entities"
                );
                break;
            }

            let report = self.process_entity(park);
            if report.succeeded() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            summary.processed += 1;
            summary.reports.push(report);
        }

        summary.provider_calls = self.counters.snapshot();
        summary.finished_at = Local::now();
        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "ingestion run finished"
        );
        summary
    }

    fn process_entity(&mut self, park: &Park) -> EntityReport {
        info!(park_id = park.id, park = %park.name, "processing entity");
        let mut report = EntityReport::new(park);
        let mut assets = Vec::new();

        for kind in [AssetKind::Photo, AssetKind::Satellite, AssetKind::Curated] {
            match self.acquire_layer(park, kind) {
                Ok(LayerOutcome::Fetched(asset)) | Ok(LayerOutcome::Synthesized(asset)) => {
                    assets.push(asset);
                }
                Ok(LayerOutcome::Missing) => {
                    info!(park_id = park.id, layer = %kind, "no asset obtainable for layer");
                    report.missing.push(kind);
                }
                Err(err) => {
                    // Keep going: the other layers may still produce assets
                    // worth persisting, and the entity is reported failed.
                    error!(park_id = park.id, layer = %kind, error = %err, "layer failed");
                    report.error = Some(format!("{} layer: {}", kind, err));
                }
            }
        }

        match self.persist_with_retry(park, &assets) {
            Ok(outcome) => {
                report.assets_inserted = outcome.inserted;
                report.duplicates_skipped = outcome.skipped;
            }
            Err(err) => {
                error!(park_id = park.id, error = %err, "entity persistence failed");
                report.error = Some(format!("persist: {}", err));
            }
        }

        report
    }

    /// Walk the provider chain for one layer. A provider is skipped on API
    /// failure, empty results, an exhausted download chain, or a corrupt
    /// payload; when no providers remain, the satellite layer synthesizes
    /// its surface and other layers report missing.
    fn acquire_layer(&self, park: &Park, kind: AssetKind) -> Result<LayerOutcome, IngestError> {
        let class = provider_class(kind);

        for provider in self.providers.iter().filter(|p| p.class() == class) {
            self.limiter.await_slot(class);

            let candidates = match kind {
                AssetKind::Satellite => provider
                    .locate(park, &self.counters)
                    .map(|located| located.into_iter().collect::<Vec<_>>()),
                _ => provider.search(park, &self.counters),
            };

            let candidates = match candidates {
                Ok(candidates) if candidates.is_empty() => {
                    debug!(provider = provider.name(), park_id = park.id, "no candidates");
                    continue;
                }
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        park_id = park.id,
                        error = %err,
                        "provider lookup failed; trying next provider"
                    );
                    continue;
                }
            };

            let (winner, payload) = match self.fetch.fetch_first(&candidates, class, &self.counters)
            {
                Ok(result) => result,
                Err(IngestError::AssetUnavailable) => continue,
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "download failed");
                    continue;
                }
            };

            match self.process_and_store(park, kind, &winner, &payload.bytes) {
                Ok(asset) => return Ok(LayerOutcome::Fetched(asset)),
                Err(IngestError::ImageDecode(reason)) => {
                    warn!(
                        provider = provider.name(),
                        url = %winner.url,
                        reason = %reason,
                        "corrupt payload; advancing to next provider"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        if kind == AssetKind::Satellite {
            return self.synthesize_surface(park).map(LayerOutcome::Synthesized);
        }
        Ok(LayerOutcome::Missing)
    }

    fn process_and_store(
        &self,
        park: &Park,
        kind: AssetKind,
        candidate: &Candidate,
        bytes: &[u8],
    ) -> Result<NewAsset, IngestError> {
        let processed = process::process(
            bytes,
            &self.images.presets,
            self.images.jpeg_quality,
            self.images.placeholder_size,
        )?;

        let filename = AssetStore::asset_filename(park.id, kind, &candidate.url);
        for derivative in &processed.derivatives {
            self.store.write(
                &AssetStore::preset_filename(&derivative.preset, &filename),
                &derivative.bytes,
            )?;
        }

        debug!(
            park_id = park.id,
            layer = %kind,
            source = candidate.source,
            derivatives = processed.derivatives.len(),
            "asset processed"
        );

        Ok(NewAsset {
            kind,
            source: candidate.source.to_string(),
            reference: candidate.url.clone(),
            local_path: Some(filename),
            placeholder: Some(processed.placeholder),
            width: Some(processed.source_width),
            height: Some(processed.source_height),
            attribution: candidate.attribution.clone(),
        })
    }

    fn synthesize_surface(&self, park: &Park) -> Result<NewAsset, IngestError> {
        info!(park_id = park.id, park = %park.name, "synthesizing surface layer");
        let layer = self.synthesizer.render_surface(park.id)?;
        self.store.write(&layer.file_name, &layer.bytes)?;

        Ok(NewAsset {
            kind: AssetKind::Satellite,
            source: "synthetic".to_string(),
            reference: format!("synthetic:{}:{}", layer.name, layer.seed),
            local_path: Some(layer.file_name.clone()),
            placeholder: None,
            width: Some(layer.width),
            height: Some(layer.height),
            attribution: None,
        })
    }

    fn persist_with_retry(
        &mut self,
        park: &Park,
        assets: &[NewAsset],
    ) -> Result<crate::catalog::PersistOutcome, IngestError> {
        match self.catalog.persist_entity(park, assets) {
            Ok(outcome) => Ok(outcome),
            Err(first) => {
                warn!(park_id = park.id, error = %first, "catalog write failed; retrying once");
                self.catalog.persist_entity(park, assets)
            }
        }
    }

    /// Generate any missing whole-planet texture layers into the textures
    /// directory. Present files with a plausible size are left alone, so
    /// this is cheap to run at every startup.
    pub fn ensure_planet_textures(&self) -> Result<Vec<String>, IngestError> {
        let mut created = Vec::new();

        for kind in LayerKind::PLANET {
            if self
                .textures
                .exists_with_min_size(kind.file_name(), MIN_TEXTURE_BYTES)
            {
                continue;
            }

            let layer = self.synthesizer.render(kind)?;
            self.textures.write(&layer.file_name, &layer.bytes)?;
            info!(layer = %layer.name, file = %layer.file_name, "generated planet texture");
            created.push(layer.file_name);
        }

        Ok(created)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

fn provider_class(kind: AssetKind) -> ProviderClass {
    match kind {
        AssetKind::Photo => ProviderClass::PhotoSearch,
        AssetKind::Satellite => ProviderClass::SatelliteImagery,
        AssetKind::Curated => ProviderClass::CuratedMetadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test::ManualClock;
    use crate::config::{FetchConfig, ImageConfig};
    use crate::fetch::http::test::RoutedHttp;
    use crate::fetch::HttpResponse;
    use crate::synth::SynthesisSpec;
    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StaticProvider {
        name: &'static str,
        class: ProviderClass,
        candidates: Vec<Candidate>,
    }

    impl StaticProvider {
        fn searching(name: &'static str, class: ProviderClass, candidates: Vec<Candidate>) -> Self {
            Self {
                name,
                class,
                candidates,
            }
        }
    }

    impl ImageryProvider for StaticProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn class(&self) -> ProviderClass {
            self.class
        }

        fn search(&self, _park: &Park, _counters: &CallCounters) -> Result<Vec<Candidate>, IngestError> {
            Ok(self.candidates.clone())
        }

        fn locate(&self, _park: &Park, _counters: &CallCounters) -> Result<Option<Candidate>, IngestError> {
            Ok(self.candidates.first().cloned())
        }
    }

    fn candidate(url: &str, source: &'static str) -> Candidate {
        Candidate {
            url: url.to_string(),
            headers: Vec::new(),
            source,
            attribution: Some(format!("via {}", source)),
            width: None,
            height: None,
        }
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img = ImageBuffer::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        });
        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, 90);
        DynamicImage::ImageRgb8(img).write_with_encoder(encoder).unwrap();
        buf.into_inner()
    }

    fn park(id: i64, name: &str) -> Park {
        Park {
            id,
            name: name.to_string(),
            country: None,
            latitude: 10.0,
            longitude: 20.0,
            biome: "forest".into(),
            established: 1900,
            area_acres: 1000,
            summary: String::new(),
        }
    }

    fn harness(
        providers: Vec<Arc<dyn ImageryProvider>>,
        routes: Vec<(&str, HttpResponse)>,
    ) -> (Orchestrator, TempDir) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let cancel = Arc::new(AtomicBool::new(false));

        let fetch = Arc::new(FetchClient::new(
            Arc::new(RoutedHttp::new(routes)),
            clock.clone(),
            cancel.clone(),
            &FetchConfig {
                retry_budget: 1,
                min_payload_bytes: 16,
                ..FetchConfig::default()
            },
        ));

        let catalog = Catalog::open_in_memory().unwrap();
        catalog.initialize().unwrap();

        let orchestrator = Orchestrator::new(
            providers,
            fetch,
            RateLimiter::uniform(clock, Duration::ZERO),
            Synthesizer::new(SynthesisSpec::canonical(64, 32, 42).unwrap()),
            catalog,
            AssetStore::new(dir.path().join("assets")),
            AssetStore::new(dir.path().join("textures")),
            ImageConfig::default(),
            cancel,
        );

        (orchestrator, dir)
    }

    #[test]
    fn secondary_provider_wins_when_primary_is_permanent() {
        let providers: Vec<Arc<dyn ImageryProvider>> = vec![
            Arc::new(StaticProvider::searching(
                "primary",
                ProviderClass::PhotoSearch,
                vec![candidate("http://a/1.jpg", "primary")],
            )),
            Arc::new(StaticProvider::searching(
                "secondary",
                ProviderClass::PhotoSearch,
                vec![candidate("http://b/1.jpg", "secondary")],
            )),
        ];
        let routes = vec![
            ("http://a/1.jpg", RoutedHttp::response(403, "text/html", b"denied".to_vec())),
            ("http://b/1.jpg", RoutedHttp::response(200, "image/jpeg", jpeg_bytes())),
        ];

        let (mut orchestrator, _dir) = harness(providers, routes);
        let summary = orchestrator.run(&[park(1, "Sample Park")]);

        assert_eq!(summary.succeeded, 1);
        let catalog = orchestrator.catalog();
        assert_eq!(catalog.count_assets(1, AssetKind::Photo).unwrap(), 1);
        assert_eq!(
            catalog.asset_sources(1, AssetKind::Photo).unwrap(),
            vec!["secondary".to_string()]
        );
    }

    #[test]
    fn satellite_exhaustion_falls_back_to_synthesis() {
        let providers: Vec<Arc<dyn ImageryProvider>> = vec![Arc::new(StaticProvider::searching(
            "sat",
            ProviderClass::SatelliteImagery,
            vec![candidate("http://sat/1.png", "sat")],
        ))];
        let routes = vec![(
            "http://sat/1.png",
            RoutedHttp::response(404, "text/html", b"nothing here".to_vec()),
        )];

        let (mut orchestrator, dir) = harness(providers, routes);
        let summary = orchestrator.run(&[park(1, "Sample Park")]);

        assert_eq!(summary.succeeded, 1);
        let catalog = orchestrator.catalog();
        assert_eq!(catalog.count_assets(1, AssetKind::Satellite).unwrap(), 1);
        assert_eq!(
            catalog.asset_sources(1, AssetKind::Satellite).unwrap(),
            vec!["synthetic".to_string()]
        );
        assert!(dir.path().join("assets/park_1_surface.jpg").exists());
    }

    #[test]
    fn missing_photo_layer_is_reported_without_aborting_the_run() {
        // End-to-end scenario: the photo provider has nothing, there is no
        // secondary and no synthetic fallback for photos.
        let providers: Vec<Arc<dyn ImageryProvider>> = vec![Arc::new(StaticProvider::searching(
            "primary",
            ProviderClass::PhotoSearch,
            Vec::new(),
        ))];

        let (mut orchestrator, _dir) = harness(providers, Vec::new());
        let summary = orchestrator.run(&[park(1, "Sample Park"), park(2, "Other Park")]);

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.succeeded, 2, "missing layers are not failures");
        assert!(summary.reports[0].missing.contains(&AssetKind::Photo));
        assert_eq!(
            orchestrator
                .catalog()
                .count_assets(1, AssetKind::Photo)
                .unwrap(),
            0
        );
        // Both parks still got their synthetic satellite surface.
        assert_eq!(
            orchestrator
                .catalog()
                .count_assets(2, AssetKind::Satellite)
                .unwrap(),
            1
        );
    }

    #[test]
    fn corrupt_payload_advances_to_the_next_provider() {
        let providers: Vec<Arc<dyn ImageryProvider>> = vec![
            Arc::new(StaticProvider::searching(
                "primary",
                ProviderClass::PhotoSearch,
                vec![candidate("http://a/corrupt.jpg", "primary")],
            )),
            Arc::new(StaticProvider::searching(
                "secondary",
                ProviderClass::PhotoSearch,
                vec![candidate("http://b/good.jpg", "secondary")],
            )),
        ];
        let routes = vec![
            (
                "http://a/corrupt.jpg",
                // 200 and image content-type, but not decodable.
                RoutedHttp::response(200, "image/jpeg", vec![0xAB; 2048]),
            ),
            ("http://b/good.jpg", RoutedHttp::response(200, "image/jpeg", jpeg_bytes())),
        ];

        let (mut orchestrator, _dir) = harness(providers, routes);
        orchestrator.run(&[park(1, "Sample Park")]);

        assert_eq!(
            orchestrator
                .catalog()
                .asset_sources(1, AssetKind::Photo)
                .unwrap(),
            vec!["secondary".to_string()]
        );
    }

    #[test]
    fn rerunning_the_pipeline_inserts_nothing_new() {
        let providers: Vec<Arc<dyn ImageryProvider>> = vec![Arc::new(StaticProvider::searching(
            "primary",
            ProviderClass::PhotoSearch,
            vec![candidate("http://a/1.jpg", "primary")],
        ))];
        let routes = vec![(
            "http://a/1.jpg",
            RoutedHttp::response(200, "image/jpeg", jpeg_bytes()),
        )];

        let (mut orchestrator, _dir) = harness(providers, routes);
        let parks = [park(1, "Sample Park")];

        let first = orchestrator.run(&parks);
        let count_after_first = orchestrator.catalog().asset_count().unwrap();
        assert!(first.reports[0].assets_inserted > 0);

        let second = orchestrator.run(&parks);
        assert_eq!(orchestrator.catalog().asset_count().unwrap(), count_after_first);
        assert_eq!(second.reports[0].assets_inserted, 0);
        assert_eq!(
            second.reports[0].duplicates_skipped,
            first.reports[0].assets_inserted
        );
    }

    #[test]
    fn preset_derivatives_land_in_the_asset_store() {
        let providers: Vec<Arc<dyn ImageryProvider>> = vec![Arc::new(StaticProvider::searching(
            "primary",
            ProviderClass::PhotoSearch,
            vec![candidate("http://a/1.jpg", "primary")],
        ))];
        let routes = vec![(
            "http://a/1.jpg",
            RoutedHttp::response(200, "image/jpeg", jpeg_bytes()),
        )];

        let (mut orchestrator, dir) = harness(providers, routes);
        orchestrator.run(&[park(1, "Sample Park")]);

        let base = AssetStore::asset_filename(1, AssetKind::Photo, "http://a/1.jpg");
        for preset in ["original", "medium", "thumb"] {
            let path = dir
                .path()
                .join("assets")
                .join(AssetStore::preset_filename(preset, &base));
            assert!(path.exists(), "missing derivative {:?}", path);
        }
    }

    #[test]
    fn cancellation_stops_scheduling_entities() {
        let (mut orchestrator, _dir) = harness(Vec::new(), Vec::new());
        orchestrator.cancel.store(true, Ordering::SeqCst);

        let summary = orchestrator.run(&[park(1, "One"), park(2, "Two")]);
        assert_eq!(summary.processed, 0);
        assert!(summary.reports.is_empty());
    }

    #[test]
    fn provider_calls_are_accounted_in_the_summary() {
        let providers: Vec<Arc<dyn ImageryProvider>> = vec![Arc::new(StaticProvider::searching(
            "sat",
            ProviderClass::SatelliteImagery,
            vec![candidate("http://sat/1.png", "sat")],
        ))];
        let routes = vec![(
            "http://sat/1.png",
            RoutedHttp::response(200, "image/png", {
                let mut buf = Cursor::new(Vec::new());
                let img = ImageBuffer::from_fn(32, 32, |x, y| Rgb([x as u8, y as u8, 0]));
                DynamicImage::ImageRgb8(img)
                    .write_to(&mut buf, image::ImageFormat::Png)
                    .unwrap();
                buf.into_inner()
            }),
        )];

        let (mut orchestrator, _dir) = harness(providers, routes);
        let summary = orchestrator.run(&[park(1, "Sample Park")]);

        assert!(summary.provider_calls.satellite > 0);
        assert_eq!(summary.provider_calls.photo_search, 0);
    }

    #[test]
    fn planet_textures_generate_once_and_stick() {
        let (orchestrator, dir) = harness(Vec::new(), Vec::new());

        let created = orchestrator.ensure_planet_textures().unwrap();
        assert_eq!(created.len(), 5);
        assert!(dir.path().join("textures/earth_day.jpg").exists());
        assert!(dir.path().join("textures/earth_clouds.png").exists());

        let second = orchestrator.ensure_planet_textures().unwrap();
        assert!(second.is_empty(), "existing textures must not regenerate");
    }
}
