//! Procedural texture synthesizer.
//!
//! The terminal fallback of the acquisition pipeline: when no external
//! source yields a usable asset, and for the inherently non-photographic
//! planet layers (night lights, elevation, specular, clouds), rasters are
//! generated from static region/feature tables with no network dependency.
//!
//! Rendering is deterministic: for a fixed spec, resolution, and seed the
//! encoded output is byte-identical across runs. Jitter and cloud placement
//! come from a ChaCha8 stream keyed on the seed and a per-layer salt, and
//! every compositing step consumes that stream in a fixed order. Validation
//! happens once at construction; rendering itself has no failure modes
//! beyond the (unreachable in practice) in-memory encode error.

mod blur;
mod raster;
mod table;

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::IngestError;

pub use raster::{Raster, RegionMask};

/// JPEG quality for synthesized layers, matching the original texture
/// tooling's output settings.
const LAYER_JPEG_QUALITY: u8 = 90;

/// Mixing constant for deriving per-entity seeds (splitmix64 increment), so
/// park id 0 does not collapse onto the base seed.
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// A named composited region: mask in normalized space, fill color, bounded
/// per-pixel jitter amplitude.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub mask: RegionMask,
    pub color: [u8; 3],
    pub jitter: f32,
}

/// A Gaussian-falloff hot spot for the night layer. `x`/`y` are normalized,
/// `radius` is a fraction of the image height.
#[derive(Debug, Clone)]
pub struct PointFeature {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub intensity: f32,
    pub radius: f64,
}

/// Cloud coverage parameters: how many elliptical blobs, their normalized
/// extent range, the vertical band they occupy, and peak alpha per blob.
#[derive(Debug, Clone)]
pub struct CloudParams {
    pub count: u32,
    pub min_extent: f64,
    pub max_extent: f64,
    pub band: (f64, f64),
    pub peak: f32,
}

/// Post-composite smoothing radii, per layer. Sharper for elevation, softer
/// for lights and clouds.
#[derive(Debug, Clone)]
pub struct BlurSigmas {
    pub day: f32,
    pub night: f32,
    pub normal: f32,
    pub specular: f32,
    pub clouds: f32,
}

impl Default for BlurSigmas {
    fn default() -> Self {
        Self {
            day: 1.5,
            night: 2.0,
            normal: 1.0,
            specular: 6.0,
            clouds: 3.0,
        }
    }
}

/// Validated synthesis parameters. Construction is the only place invalid
/// tables are caught; render never fails on spec content.
#[derive(Debug, Clone)]
pub struct SynthesisSpec {
    width: u32,
    height: u32,
    seed: u64,
    continents: Vec<Region>,
    elevations: Vec<Region>,
    waters: Vec<Region>,
    features: Vec<PointFeature>,
    clouds: CloudParams,
    blur: BlurSigmas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Day,
    Night,
    Normal,
    Specular,
    Clouds,
}

impl LayerKind {
    pub const PLANET: [LayerKind; 5] = [
        LayerKind::Day,
        LayerKind::Night,
        LayerKind::Normal,
        LayerKind::Specular,
        LayerKind::Clouds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Day => "day",
            LayerKind::Night => "night",
            LayerKind::Normal => "normal",
            LayerKind::Specular => "specular",
            LayerKind::Clouds => "clouds",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            LayerKind::Day => "earth_day.jpg",
            LayerKind::Night => "earth_night.jpg",
            LayerKind::Normal => "earth_normal.jpg",
            LayerKind::Specular => "earth_specular.jpg",
            LayerKind::Clouds => "earth_clouds.png",
        }
    }

    fn salt(&self) -> u64 {
        match self {
            LayerKind::Day => 0x01,
            LayerKind::Night => 0x02,
            LayerKind::Normal => 0x03,
            LayerKind::Specular => 0x04,
            LayerKind::Clouds => 0x05,
        }
    }
}

/// One rendered, encoded layer.
#[derive(Debug, Clone)]
pub struct SyntheticLayer {
    pub name: String,
    pub file_name: String,
    /// The seed this raster was derived from; part of its dedup identity.
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl SynthesisSpec {
    pub fn new(
        width: u32,
        height: u32,
        seed: u64,
        continents: Vec<Region>,
        elevations: Vec<Region>,
        waters: Vec<Region>,
        features: Vec<PointFeature>,
        clouds: CloudParams,
        blur: BlurSigmas,
    ) -> Result<Self, IngestError> {
        if width == 0 || height == 0 {
            return Err(IngestError::InvalidSyntheticSpec(format!(
                "resolution {}x{} has a zero dimension",
                width, height
            )));
        }

        for region in continents.iter().chain(&elevations).chain(&waters) {
            validate_region(region)?;
        }
        for feature in &features {
            validate_feature(feature)?;
        }
        validate_clouds(&clouds)?;

        for (layer, sigma) in [
            ("day", blur.day),
            ("night", blur.night),
            ("normal", blur.normal),
            ("specular", blur.specular),
            ("clouds", blur.clouds),
        ] {
            if sigma < 0.0 {
                return Err(IngestError::InvalidSyntheticSpec(format!(
                    "negative blur sigma for {} layer",
                    layer
                )));
            }
        }

        Ok(Self {
            width,
            height,
            seed,
            continents,
            elevations,
            waters,
            features,
            clouds,
            blur,
        })
    }

    /// The canonical table set at the given resolution and seed.
    pub fn canonical(width: u32, height: u32, seed: u64) -> Result<Self, IngestError> {
        Self::new(
            width,
            height,
            seed,
            table::continents(),
            table::elevations(),
            table::waters(),
            table::city_lights(),
            table::clouds(),
            BlurSigmas::default(),
        )
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn validate_unit(value: f64, what: &str, name: &str) -> Result<(), IngestError> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(IngestError::InvalidSyntheticSpec(format!(
            "{} of '{}' is {}, outside normalized [0, 1]",
            what, name, value
        )));
    }
    Ok(())
}

fn validate_region(region: &Region) -> Result<(), IngestError> {
    match region.mask {
        RegionMask::Rect { x0, y0, x1, y1 } => {
            validate_unit(x0, "x0", &region.name)?;
            validate_unit(y0, "y0", &region.name)?;
            validate_unit(x1, "x1", &region.name)?;
            validate_unit(y1, "y1", &region.name)?;
            if x0 >= x1 || y0 >= y1 {
                return Err(IngestError::InvalidSyntheticSpec(format!(
                    "rect region '{}' is inverted or empty",
                    region.name
                )));
            }
        }
        RegionMask::Ellipse { cx, cy, rx, ry } => {
            validate_unit(cx, "cx", &region.name)?;
            validate_unit(cy, "cy", &region.name)?;
            if rx <= 0.0 || ry <= 0.0 {
                return Err(IngestError::InvalidSyntheticSpec(format!(
                    "ellipse region '{}' has a non-positive radius",
                    region.name
                )));
            }
        }
    }

    if region.jitter < 0.0 {
        return Err(IngestError::InvalidSyntheticSpec(format!(
            "region '{}' has negative jitter",
            region.name
        )));
    }
    Ok(())
}

fn validate_feature(feature: &PointFeature) -> Result<(), IngestError> {
    validate_unit(feature.x, "x", &feature.name)?;
    validate_unit(feature.y, "y", &feature.name)?;
    if feature.intensity <= 0.0 {
        return Err(IngestError::InvalidSyntheticSpec(format!(
            "feature '{}' has non-positive intensity",
            feature.name
        )));
    }
    if feature.radius <= 0.0 {
        return Err(IngestError::InvalidSyntheticSpec(format!(
            "feature '{}' has non-positive radius",
            feature.name
        )));
    }
    Ok(())
}

fn validate_clouds(clouds: &CloudParams) -> Result<(), IngestError> {
    if clouds.min_extent <= 0.0 || clouds.max_extent < clouds.min_extent {
        return Err(IngestError::InvalidSyntheticSpec(
            "cloud extent range is empty or non-positive".to_string(),
        ));
    }
    validate_unit(clouds.band.0, "band start", "clouds")?;
    validate_unit(clouds.band.1, "band end", "clouds")?;
    if clouds.band.0 >= clouds.band.1 {
        return Err(IngestError::InvalidSyntheticSpec(
            "cloud band is inverted or empty".to_string(),
        ));
    }
    if clouds.peak <= 0.0 {
        return Err(IngestError::InvalidSyntheticSpec(
            "cloud peak alpha must be positive".to_string(),
        ));
    }
    Ok(())
}

pub struct Synthesizer {
    spec: SynthesisSpec,
}

impl Synthesizer {
    pub fn new(spec: SynthesisSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &SynthesisSpec {
        &self.spec
    }

    /// Render one planet layer.
    pub fn render(&self, kind: LayerKind) -> Result<SyntheticLayer, IngestError> {
        let seed = self.spec.seed ^ kind.salt();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let (raster, bytes) = match kind {
            LayerKind::Day => {
                let raster = self.compose_day(&mut rng);
                let bytes = encode_rgb_jpeg(&raster)?;
                (raster, bytes)
            }
            LayerKind::Night => {
                let raster = self.compose_night();
                let bytes = encode_rgb_jpeg(&raster)?;
                (raster, bytes)
            }
            LayerKind::Normal => {
                let raster = self.compose_normal(&mut rng);
                let bytes = encode_rgb_jpeg(&raster)?;
                (raster, bytes)
            }
            LayerKind::Specular => {
                let raster = self.compose_specular(&mut rng);
                let bytes = encode_gray_jpeg(&raster)?;
                (raster, bytes)
            }
            LayerKind::Clouds => {
                let raster = self.compose_clouds(&mut rng);
                let bytes = encode_rgba_png(&raster)?;
                (raster, bytes)
            }
        };

        Ok(SyntheticLayer {
            name: kind.name().to_string(),
            file_name: kind.file_name().to_string(),
            seed,
            width: raster.width(),
            height: raster.height(),
            bytes,
        })
    }

    /// Render every planet layer in a fixed order.
    pub fn render_planet_set(&self) -> Result<Vec<SyntheticLayer>, IngestError> {
        LayerKind::PLANET.iter().map(|kind| self.render(*kind)).collect()
    }

    /// Per-entity fallback surface: the day pipeline re-seeded with the park
    /// id, so each entity gets a distinct but reproducible raster.
    pub fn render_surface(&self, park_id: i64) -> Result<SyntheticLayer, IngestError> {
        let seed = self.spec.seed ^ (park_id as u64).wrapping_mul(SEED_MIX);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let raster = self.compose_day(&mut rng);
        let bytes = encode_rgb_jpeg(&raster)?;

        Ok(SyntheticLayer {
            name: "surface".to_string(),
            file_name: format!("park_{}_surface.jpg", park_id),
            seed,
            width: raster.width(),
            height: raster.height(),
            bytes,
        })
    }

    fn compose_day(&self, rng: &mut ChaCha8Rng) -> Raster {
        let mut raster = Raster::new(self.spec.width, self.spec.height, 3, 0.0);

        // Ocean base: smooth latitude gradient, brightest at the equator.
        raster.fill_rows(|fraction| {
            let latitude = (90.0 - fraction * 180.0).to_radians();
            let brightness = latitude.cos() as f32;
            vec![
                50.0 + 20.0 * brightness,
                100.0 + 30.0 * brightness,
                160.0 + 20.0 * brightness,
            ]
        });

        for region in &self.spec.continents {
            let color = [
                region.color[0] as f32,
                region.color[1] as f32,
                region.color[2] as f32,
            ];
            raster.composite_region(&region.mask, &color, region.jitter, rng);
        }

        blur::gaussian_blur(&mut raster, self.spec.blur.day);
        raster
    }

    fn compose_night(&self) -> Raster {
        let mut raster = Raster::new(self.spec.width, self.spec.height, 3, 0.0);

        // Warm channel weighting: city glow is sodium-orange, not white.
        for feature in &self.spec.features {
            raster.add_point_feature(
                (feature.x, feature.y),
                feature.radius,
                feature.intensity,
                &[2.5, 2.0, 1.0],
            );
        }

        blur::gaussian_blur(&mut raster, self.spec.blur.night);
        raster
    }

    fn compose_normal(&self, rng: &mut ChaCha8Rng) -> Raster {
        let mut raster = Raster::new(self.spec.width, self.spec.height, 3, 128.0);

        for region in &self.spec.elevations {
            let color = [
                region.color[0] as f32,
                region.color[1] as f32,
                region.color[2] as f32,
            ];
            raster.composite_region(&region.mask, &color, region.jitter, rng);
        }

        blur::gaussian_blur(&mut raster, self.spec.blur.normal);
        raster
    }

    fn compose_specular(&self, rng: &mut ChaCha8Rng) -> Raster {
        let mut raster = Raster::new(self.spec.width, self.spec.height, 1, 0.0);

        for region in &self.spec.waters {
            raster.composite_region(&region.mask, &[region.color[0] as f32], region.jitter, rng);
        }

        blur::gaussian_blur(&mut raster, self.spec.blur.specular);
        raster
    }

    fn compose_clouds(&self, rng: &mut ChaCha8Rng) -> Raster {
        let mut raster = Raster::new(self.spec.width, self.spec.height, 4, 0.0);
        raster.fill_rows(|_| vec![255.0, 255.0, 255.0, 0.0]);

        let params = &self.spec.clouds;
        for _ in 0..params.count {
            let cx = rng.gen_range(0.0..1.0);
            let cy = rng.gen_range(params.band.0..params.band.1);
            let rx = rng.gen_range(params.min_extent..=params.max_extent);
            // Clouds stretch along the prevailing winds.
            let ry = rng.gen_range(params.min_extent..=params.max_extent) * 0.6;
            raster.add_blob((cx, cy), (rx, ry.max(params.min_extent * 0.5)), params.peak, 3);
        }

        blur::gaussian_blur(&mut raster, self.spec.blur.clouds);
        raster
    }
}

fn encode_rgb_jpeg(raster: &Raster) -> Result<Vec<u8>, IngestError> {
    let image = image::RgbImage::from_raw(raster.width(), raster.height(), raster.to_bytes())
        .ok_or_else(|| IngestError::ImageDecode("raster buffer size mismatch".to_string()))?;

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, LAYER_JPEG_QUALITY);
    DynamicImage::ImageRgb8(image)
        .write_with_encoder(encoder)
        .map_err(|e| IngestError::ImageDecode(format!("layer encode failed: {}", e)))?;

    Ok(buf.into_inner())
}

fn encode_gray_jpeg(raster: &Raster) -> Result<Vec<u8>, IngestError> {
    let image = image::GrayImage::from_raw(raster.width(), raster.height(), raster.to_bytes())
        .ok_or_else(|| IngestError::ImageDecode("raster buffer size mismatch".to_string()))?;

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, LAYER_JPEG_QUALITY);
    DynamicImage::ImageLuma8(image)
        .write_with_encoder(encoder)
        .map_err(|e| IngestError::ImageDecode(format!("layer encode failed: {}", e)))?;

    Ok(buf.into_inner())
}

fn encode_rgba_png(raster: &Raster) -> Result<Vec<u8>, IngestError> {
    let image = image::RgbaImage::from_raw(raster.width(), raster.height(), raster.to_bytes())
        .ok_or_else(|| IngestError::ImageDecode("raster buffer size mismatch".to_string()))?;

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| IngestError::ImageDecode(format!("layer encode failed: {}", e)))?;

    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_synth(seed: u64) -> Synthesizer {
        Synthesizer::new(SynthesisSpec::canonical(64, 32, seed).unwrap())
    }

    #[test]
    fn canonical_spec_validates() {
        assert!(SynthesisSpec::canonical(2048, 1024, 42).is_ok());
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let err = SynthesisSpec::canonical(0, 1024, 42).unwrap_err();
        assert!(matches!(err, IngestError::InvalidSyntheticSpec(_)));
    }

    #[test]
    fn out_of_range_region_is_rejected_at_construction() {
        let bad_region = Region {
            name: "off_map".to_string(),
            mask: RegionMask::Rect {
                x0: 0.5,
                y0: 0.0,
                x1: 1.4,
                y1: 0.5,
            },
            color: [10, 10, 10],
            jitter: 0.0,
        };

        let err = SynthesisSpec::new(
            64,
            32,
            1,
            vec![bad_region],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            table::clouds(),
            BlurSigmas::default(),
        )
        .unwrap_err();

        assert!(matches!(err, IngestError::InvalidSyntheticSpec(_)));
    }

    #[test]
    fn inverted_rect_is_rejected() {
        let bad_region = Region {
            name: "inside_out".to_string(),
            mask: RegionMask::Rect {
                x0: 0.6,
                y0: 0.2,
                x1: 0.4,
                y1: 0.5,
            },
            color: [10, 10, 10],
            jitter: 0.0,
        };

        assert!(SynthesisSpec::new(
            64,
            32,
            1,
            vec![bad_region],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            table::clouds(),
            BlurSigmas::default(),
        )
        .is_err());
    }

    #[test]
    fn bad_feature_is_rejected() {
        let bad_feature = PointFeature {
            name: "dark_city".to_string(),
            x: 0.5,
            y: 0.5,
            intensity: 0.0,
            radius: 0.02,
        };

        assert!(SynthesisSpec::new(
            64,
            32,
            1,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            vec![bad_feature],
            table::clouds(),
            BlurSigmas::default(),
        )
        .is_err());
    }

    #[test]
    fn every_layer_renders_byte_identically_across_invocations() {
        let first = small_synth(42);
        let second = small_synth(42);

        for kind in LayerKind::PLANET {
            let a = first.render(kind).unwrap();
            let b = second.render(kind).unwrap();
            assert_eq!(a.bytes, b.bytes, "{} layer drifted", kind.name());
        }
    }

    #[test]
    fn different_seeds_change_stochastic_layers() {
        let a = small_synth(1).render(LayerKind::Clouds).unwrap();
        let b = small_synth(2).render(LayerKind::Clouds).unwrap();
        assert_ne!(a.bytes, b.bytes);
    }

    #[test]
    fn surface_renders_are_per_entity_and_reproducible() {
        let synth = small_synth(42);

        let one = synth.render_surface(7).unwrap();
        let again = synth.render_surface(7).unwrap();
        let other = synth.render_surface(8).unwrap();

        assert_eq!(one.bytes, again.bytes);
        assert_ne!(one.bytes, other.bytes);
        assert_eq!(one.file_name, "park_7_surface.jpg");
        assert_ne!(one.seed, other.seed);
    }

    #[test]
    fn layer_encodings_match_their_formats() {
        let synth = small_synth(42);

        let day = synth.render(LayerKind::Day).unwrap();
        assert_eq!(&day.bytes[..2], &[0xFF, 0xD8], "JPEG magic");
        assert_eq!(day.file_name, "earth_day.jpg");

        let clouds = synth.render(LayerKind::Clouds).unwrap();
        assert_eq!(&clouds.bytes[..4], &[0x89, b'P', b'N', b'G'], "PNG magic");
    }

    #[test]
    fn planet_set_covers_all_layers() {
        let layers = small_synth(42).render_planet_set().unwrap();
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["day", "night", "normal", "specular", "clouds"]);
    }

    #[test]
    fn day_layer_keeps_its_gradient() {
        // Ocean at x ~ 0.05 is land-free between the polar caps; the
        // latitude gradient must survive compositing and blur so the base
        // is never a flat fill.
        let synth = small_synth(42);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let raster = synth.compose_day(&mut rng);

        let equator = raster.get(3, 16, 2);
        let mid_latitude = raster.get(3, 8, 2);
        assert!(
            equator > mid_latitude,
            "equator ocean ({}) should be brighter than mid-latitude ocean ({})",
            equator,
            mid_latitude
        );
    }
}
