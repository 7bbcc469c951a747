//! Canonical region/feature tables for the planet layers.
//!
//! The geometry here is configuration data, not algorithm: coarse continent
//! and ocean shapes in normalized image space, the major mountain ranges,
//! and a set of bright-city hot spots with positions derived from real
//! coordinates (x = (lon + 180) / 360, y = (90 - lat) / 180).

use super::raster::RegionMask;
use super::{CloudParams, PointFeature, Region};

fn region(name: &str, mask: RegionMask, color: [u8; 3], jitter: f32) -> Region {
    Region {
        name: name.to_string(),
        mask,
        color,
        jitter,
    }
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> RegionMask {
    RegionMask::Rect { x0, y0, x1, y1 }
}

fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64) -> RegionMask {
    RegionMask::Ellipse { cx, cy, rx, ry }
}

/// Land masses composited over the ocean gradient, in paint order; later
/// entries overlay earlier ones (Sahara over the Africa ellipse, ice sheet
/// over northern America).
pub fn continents() -> Vec<Region> {
    vec![
        region("arctic", rect(0.0, 0.0, 1.0, 0.12), [240, 248, 255], 6.0),
        region(
            "north_america",
            ellipse(0.25, 0.325, 0.10, 0.175),
            [34, 139, 34],
            10.0,
        ),
        region(
            "canada_alaska",
            rect(0.14, 0.14, 0.27, 0.28),
            [240, 248, 255],
            8.0,
        ),
        region(
            "south_america",
            ellipse(0.275, 0.65, 0.075, 0.15),
            [0, 100, 0],
            10.0,
        ),
        region("andes_coast", rect(0.245, 0.50, 0.275, 0.80), [139, 90, 43], 8.0),
        region("europe", rect(0.45, 0.20, 0.55, 0.35), [34, 139, 34], 10.0),
        region(
            "africa",
            ellipse(0.50, 0.55, 0.05, 0.20),
            [34, 139, 34],
            10.0,
        ),
        region("sahara", rect(0.45, 0.35, 0.55, 0.45), [194, 178, 128], 10.0),
        region("asia", ellipse(0.65, 0.375, 0.15, 0.125), [34, 139, 34], 10.0),
        region("gobi_tibet", rect(0.70, 0.25, 0.80, 0.35), [160, 82, 45], 10.0),
        region(
            "australia",
            ellipse(0.75, 0.725, 0.05, 0.075),
            [194, 178, 128],
            10.0,
        ),
        region("antarctica", rect(0.0, 0.85, 1.0, 1.0), [250, 250, 255], 4.0),
    ]
}

/// Elevation features for the normal layer: mountain ranges push the blue
/// channel up, ocean basins pull it down from the neutral 128 base.
pub fn elevations() -> Vec<Region> {
    vec![
        region("pacific_basin_west", rect(0.0, 0.0, 0.15, 1.0), [128, 128, 100], 4.0),
        region("pacific_basin_east", rect(0.80, 0.0, 1.0, 1.0), [128, 128, 100], 4.0),
        region(
            "atlantic_basin",
            rect(0.35, 0.20, 0.45, 0.80),
            [128, 128, 110],
            4.0,
        ),
        region("rockies", rect(0.17, 0.20, 0.27, 0.50), [135, 135, 190], 8.0),
        region("andes", rect(0.25, 0.45, 0.29, 0.85), [140, 140, 200], 8.0),
        region("alps", rect(0.39, 0.29, 0.55, 0.35), [135, 135, 190], 8.0),
        region("himalayas", rect(0.55, 0.30, 0.75, 0.40), [140, 140, 200], 8.0),
    ]
}

/// Water mask for the specular layer: bright where light should reflect.
pub fn waters() -> Vec<Region> {
    vec![
        region("pacific_west", rect(0.0, 0.0, 0.15, 1.0), [200, 200, 200], 4.0),
        region("pacific_east", rect(0.80, 0.0, 1.0, 1.0), [200, 200, 200], 4.0),
        region("atlantic", rect(0.35, 0.20, 0.45, 0.80), [200, 200, 200], 4.0),
        region("indian", rect(0.55, 0.40, 0.70, 0.80), [200, 200, 200], 4.0),
        region("arctic_ocean", rect(0.0, 0.0, 1.0, 0.15), [128, 128, 128], 4.0),
        region("southern_ocean", rect(0.0, 0.85, 1.0, 1.0), [128, 128, 128], 4.0),
    ]
}

fn city(name: &str, lat: f64, lon: f64, intensity: f32, radius: f64) -> PointFeature {
    PointFeature {
        name: name.to_string(),
        x: (lon + 180.0) / 360.0,
        y: (90.0 - lat) / 180.0,
        intensity,
        radius,
    }
}

/// City-light hot spots for the night layer.
pub fn city_lights() -> Vec<PointFeature> {
    vec![
        city("new_york", 40.7, -74.0, 60.0, 0.025),
        city("chicago", 41.9, -87.6, 45.0, 0.020),
        city("los_angeles", 34.1, -118.2, 45.0, 0.020),
        city("sao_paulo", -23.6, -46.6, 45.0, 0.022),
        city("buenos_aires", -34.6, -58.4, 35.0, 0.018),
        city("london", 51.5, -0.1, 60.0, 0.022),
        city("paris", 48.9, 2.35, 50.0, 0.020),
        city("moscow", 55.8, 37.6, 40.0, 0.020),
        city("cairo", 30.0, 31.2, 45.0, 0.020),
        city("lagos", 6.5, 3.4, 35.0, 0.018),
        city("mumbai", 19.1, 72.9, 55.0, 0.022),
        city("delhi", 28.6, 77.2, 55.0, 0.022),
        city("beijing", 39.9, 116.4, 65.0, 0.025),
        city("shanghai", 31.2, 121.5, 65.0, 0.025),
        city("tokyo", 35.7, 139.7, 80.0, 0.028),
        city("sydney", -33.9, 151.2, 40.0, 0.018),
    ]
}

/// Cloud coverage: random elliptical blobs in the temperate band.
pub fn clouds() -> CloudParams {
    CloudParams {
        count: 150,
        min_extent: 0.015,
        max_extent: 0.06,
        band: (0.20, 0.80),
        peak: 180.0,
    }
}
