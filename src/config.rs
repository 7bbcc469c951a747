use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    #[serde(default = "default_textures_dir")]
    pub textures_dir: PathBuf,

    #[serde(default = "default_seed_list")]
    pub seed_list: PathBuf,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub photo: PhotoProviderConfig,

    #[serde(default)]
    pub satellite: SatelliteProviderConfig,

    #[serde(default)]
    pub curated: CuratedProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoProviderConfig {
    #[serde(default = "default_photo_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub access_key: Option<String>,

    /// Photos requested per park.
    #[serde(default = "default_photo_count")]
    pub per_park: usize,
}

fn default_photo_endpoint() -> String {
    "https://api.unsplash.com".to_string()
}

fn default_photo_count() -> usize {
    5
}

impl Default for PhotoProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_photo_endpoint(),
            access_key: None,
            per_park: default_photo_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteProviderConfig {
    #[serde(default = "default_satellite_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Bounding box width/height in degrees around the park coordinates.
    #[serde(default = "default_satellite_dim")]
    pub dim_degrees: f64,
}

fn default_satellite_endpoint() -> String {
    "https://api.nasa.gov".to_string()
}

fn default_satellite_dim() -> f64 {
    0.5
}

impl Default for SatelliteProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_satellite_endpoint(),
            api_key: None,
            dim_degrees: default_satellite_dim(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedProviderConfig {
    #[serde(default = "default_curated_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Curated images taken per park.
    #[serde(default = "default_curated_count")]
    pub per_park: usize,
}

fn default_curated_endpoint() -> String {
    "https://developer.nps.gov/api/v1".to_string()
}

fn default_curated_count() -> usize {
    3
}

impl Default for CuratedProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_curated_endpoint(),
            api_key: None,
            per_park: default_curated_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Attempts per candidate before advancing the fallback chain.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// First backoff delay; doubles on each subsequent attempt.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Payloads below this size are provider error pages, not assets.
    #[serde(default = "default_min_payload_bytes")]
    pub min_payload_bytes: usize,
}

fn default_retry_budget() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_backoff_base_secs() -> u64 {
    2
}

fn default_min_payload_bytes() -> usize {
    1024
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            timeout_secs: default_timeout_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            min_payload_bytes: default_min_payload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_interval_secs")]
    pub photo_search_secs: u64,

    #[serde(default = "default_interval_secs")]
    pub satellite_secs: u64,

    #[serde(default = "default_interval_secs")]
    pub curated_secs: u64,
}

fn default_interval_secs() -> u64 {
    2
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            photo_search_secs: default_interval_secs(),
            satellite_secs: default_interval_secs(),
            curated_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizePreset {
    pub name: String,
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Max dimension of the inline preview placeholder.
    #[serde(default = "default_placeholder_size")]
    pub placeholder_size: u32,

    #[serde(default = "default_presets")]
    pub presets: Vec<SizePreset>,
}

fn default_presets() -> Vec<SizePreset> {
    vec![
        SizePreset {
            name: "original".to_string(),
            max_width: 1920,
            max_height: 1080,
        },
        SizePreset {
            name: "medium".to_string(),
            max_width: 800,
            max_height: 600,
        },
        SizePreset {
            name: "thumb".to_string(),
            max_width: 400,
            max_height: 300,
        },
    ]
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_placeholder_size() -> u32 {
    20
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            placeholder_size: default_placeholder_size(),
            presets: default_presets(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_texture_width")]
    pub width: u32,

    #[serde(default = "default_texture_height")]
    pub height: u32,

    #[serde(default = "default_synthesis_seed")]
    pub seed: u64,
}

fn default_texture_width() -> u32 {
    2048
}

fn default_texture_height() -> u32 {
    1024
}

fn default_synthesis_seed() -> u64 {
    42
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            width: default_texture_width(),
            height: default_texture_height(),
            seed: default_synthesis_seed(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parkfetch")
}

fn default_db_path() -> PathBuf {
    data_dir().join("parks.db")
}

fn default_assets_dir() -> PathBuf {
    data_dir().join("assets")
}

fn default_textures_dir() -> PathBuf {
    data_dir().join("textures")
}

fn default_seed_list() -> PathBuf {
    PathBuf::from("data/world_parks.csv")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            assets_dir: default_assets_dir(),
            textures_dir: default_textures_dir(),
            seed_list: default_seed_list(),
            providers: ProvidersConfig::default(),
            fetch: FetchConfig::default(),
            rate_limit: RateLimitConfig::default(),
            images: ImageConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // First run: materialize the defaults so they can be edited.
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parkfetch")
            .join("config.toml")
    }
}
