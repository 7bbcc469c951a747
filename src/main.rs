use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use parkfetch::clock::SystemClock;
use parkfetch::config::Config;
use parkfetch::fetch::{FetchClient, UreqClient};
use parkfetch::ingest::{Orchestrator, RunSummary};
use parkfetch::provider::{create_providers, ProviderClass};
use parkfetch::ratelimit::RateLimiter;
use parkfetch::store::{AssetStore, MIN_PLAUSIBLE_BYTES};
use parkfetch::synth::{SynthesisSpec, Synthesizer};
use parkfetch::{logging, seed, Catalog};

struct CliArgs {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    parks_path: Option<PathBuf>,
    limit: Option<usize>,
    textures_only: bool,
    audit: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = CliArgs {
        config_path: None,
        db_path: None,
        assets_dir: None,
        parks_path: None,
        limit: None,
        textures_only: false,
        audit: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("parkfetch {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--db" => {
                if i + 1 < args.len() {
                    parsed.db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --db requires a path argument");
                    std::process::exit(1);
                }
            }
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    parsed.assets_dir = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --out requires a path argument");
                    std::process::exit(1);
                }
            }
            "--parks" => {
                if i + 1 < args.len() {
                    parsed.parks_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --parks requires a path argument");
                    std::process::exit(1);
                }
            }
            "--limit" | "-n" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(limit) => parsed.limit = Some(limit),
                        Err(_) => {
                            eprintln!("Error: --limit requires a number");
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                } else {
                    eprintln!("Error: --limit requires a number");
                    std::process::exit(1);
                }
            }
            "--textures" | "-t" => {
                parsed.textures_only = true;
            }
            "--audit" => {
                parsed.audit = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"parkfetch - batch asset ingestion for the ParkSphere catalog

USAGE:
    parkfetch [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --db PATH           SQLite catalog path (overrides config)
    --out, -o PATH      Asset output directory (overrides config)
    --parks PATH        Park seed list CSV (overrides config)
    --limit, -n N       Only process the first N parks
    --textures, -t      Only generate the planet texture set, then exit
    --audit             Report undersized asset files before ingesting
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PARKFETCH_LOG       Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/parkfetch/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    let _ = logging::init(None);

    let mut config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    if let Some(assets_dir) = args.assets_dir {
        config.assets_dir = assets_dir;
    }
    if let Some(parks_path) = args.parks_path {
        config.seed_list = parks_path;
    }

    // Invalid synthesis tables are a configuration error: fail before any
    // network or database work happens.
    let spec = SynthesisSpec::canonical(
        config.synthesis.width,
        config.synthesis.height,
        config.synthesis.seed,
    )
    .context("synthesis spec rejected")?;
    let synthesizer = Synthesizer::new(spec);

    let clock = Arc::new(SystemClock);
    let cancel = Arc::new(AtomicBool::new(false));

    let http = Arc::new(UreqClient::new(Duration::from_secs(config.fetch.timeout_secs)));
    let fetch = Arc::new(FetchClient::new(
        http,
        clock.clone(),
        cancel.clone(),
        &config.fetch,
    ));

    let mut intervals = [Duration::ZERO; ProviderClass::ALL.len()];
    intervals[ProviderClass::PhotoSearch as usize] =
        Duration::from_secs(config.rate_limit.photo_search_secs);
    intervals[ProviderClass::SatelliteImagery as usize] =
        Duration::from_secs(config.rate_limit.satellite_secs);
    intervals[ProviderClass::CuratedMetadata as usize] =
        Duration::from_secs(config.rate_limit.curated_secs);
    let limiter = RateLimiter::new(clock, intervals);

    let providers = create_providers(&config.providers, Arc::clone(&fetch));

    let catalog = Catalog::open(&config.db_path)?;
    catalog.initialize()?;

    let store = AssetStore::new(&config.assets_dir);
    let textures = AssetStore::new(&config.textures_dir);

    let mut orchestrator = Orchestrator::new(
        providers,
        fetch,
        limiter,
        synthesizer,
        catalog,
        store,
        textures,
        config.images.clone(),
        cancel,
    );

    if args.textures_only {
        let created = orchestrator.ensure_planet_textures()?;
        if created.is_empty() {
            println!("All planet textures present in {}", config.textures_dir.display());
        } else {
            println!("Generated {} planet textures:", created.len());
            for name in created {
                println!("  {}", name);
            }
        }
        return Ok(());
    }

    if args.audit {
        let undersized = AssetStore::new(&config.assets_dir).audit_undersized(MIN_PLAUSIBLE_BYTES)?;
        if undersized.is_empty() {
            println!("Asset audit: nothing undersized");
        } else {
            println!("Asset audit: {} undersized files", undersized.len());
            for path in &undersized {
                println!("  {}", path.display());
            }
        }
    }

    let parks = seed::load_parks(&config.seed_list)?;
    if parks.is_empty() {
        bail!("seed list {} contains no parks", config.seed_list.display());
    }
    let parks = match args.limit {
        Some(limit) => &parks[..limit.min(parks.len())],
        None => &parks[..],
    };

    let summary = orchestrator.run(parks);
    orchestrator.ensure_planet_textures()?;

    print_summary(&summary);

    if summary.failed > 0 {
        bail!("{} of {} entities failed", summary.failed, summary.processed);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "\nProcessed {} parks in {}s: {} succeeded, {} failed",
        summary.processed,
        elapsed.num_seconds(),
        summary.succeeded,
        summary.failed
    );

    for report in &summary.reports {
        let mut line = format!(
            "  [{}] {}: {} new, {} already cataloged",
            report.park_id, report.name, report.assets_inserted, report.duplicates_skipped
        );
        if !report.missing.is_empty() {
            let missing: Vec<&str> = report.missing.iter().map(|k| k.as_str()).collect();
            line.push_str(&format!(", no {} asset", missing.join("/")));
        }
        if let Some(error) = &report.error {
            line.push_str(&format!(" - FAILED: {}", error));
        }
        println!("{}", line);
    }

    println!(
        "API calls: photo search {}, satellite {}, curated {}",
        summary.provider_calls.photo_search,
        summary.provider_calls.satellite,
        summary.provider_calls.curated
    );
}
