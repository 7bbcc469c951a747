//! Float raster buffer and the compositing primitives the synthesizer
//! builds layers from.
//!
//! Channels accumulate in f32 over the 0..=255 range and are quantized once
//! at encode time; intermediate math never wraps, and additive overlays
//! saturate at the channel maximum instead of overflowing.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub const CHANNEL_MAX: f32 = 255.0;

/// Axis-aligned or elliptical mask in normalized (0..1, 0..1) image space.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionMask {
    Rect { x0: f64, y0: f64, x1: f64, y1: f64 },
    Ellipse { cx: f64, cy: f64, rx: f64, ry: f64 },
}

impl RegionMask {
    pub fn contains(&self, nx: f64, ny: f64) -> bool {
        match *self {
            RegionMask::Rect { x0, y0, x1, y1 } => nx >= x0 && nx < x1 && ny >= y0 && ny < y1,
            RegionMask::Ellipse { cx, cy, rx, ry } => {
                let dx = (nx - cx) / rx;
                let dy = (ny - cy) / ry;
                dx * dx + dy * dy < 1.0
            }
        }
    }

    /// Normalized bounding box, for iterating only the covered pixels.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match *self {
            RegionMask::Rect { x0, y0, x1, y1 } => (x0, y0, x1, y1),
            RegionMask::Ellipse { cx, cy, rx, ry } => (cx - rx, cy - ry, cx + rx, cy + ry),
        }
    }
}

pub struct Raster {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<f32>,
}

impl Raster {
    pub fn new(width: u32, height: u32, channels: usize, fill: f32) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![fill; width as usize * height as usize * channels],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vec<f32> {
        &mut self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels
    }

    pub fn get(&self, x: u32, y: u32, channel: usize) -> f32 {
        self.data[self.index(x, y) + channel]
    }

    pub fn set(&mut self, x: u32, y: u32, channel: usize, value: f32) {
        let idx = self.index(x, y) + channel;
        self.data[idx] = value;
    }

    /// Additive write that clamps at the channel maximum.
    pub fn add_saturating(&mut self, x: u32, y: u32, channel: usize, value: f32) {
        let idx = self.index(x, y) + channel;
        self.data[idx] = (self.data[idx] + value).min(CHANNEL_MAX);
    }

    /// Normalized center coordinate of a pixel.
    #[inline]
    fn normalized(&self, x: u32, y: u32) -> (f64, f64) {
        (
            (x as f64 + 0.5) / self.width as f64,
            (y as f64 + 0.5) / self.height as f64,
        )
    }

    /// Fill every row from a function of the row's vertical fraction. Used
    /// for the smooth base gradients that keep flat-fill banding out of the
    /// day layer.
    pub fn fill_rows(&mut self, row_color: impl Fn(f64) -> Vec<f32>) {
        let width = self.width as usize;
        let channels = self.channels;
        for y in 0..self.height {
            let color = row_color((y as f64 + 0.5) / self.height as f64);
            debug_assert_eq!(color.len(), channels);
            let row_start = y as usize * width * channels;
            for x in 0..width {
                let base = row_start + x * channels;
                self.data[base..base + channels].copy_from_slice(&color);
            }
        }
    }

    /// Pixel range covered by a normalized interval, clamped to the raster.
    fn pixel_span(lo: f64, hi: f64, extent: u32) -> (u32, u32) {
        let lo = ((lo * extent as f64).floor().max(0.0)) as u32;
        let hi = ((hi * extent as f64).ceil().min(extent as f64)) as u32;
        (lo, hi.max(lo))
    }

    /// Composite a solid region with bounded per-pixel jitter. Jitter is
    /// sampled in a fixed row-major order from the caller's seeded RNG, which
    /// is what keeps renders reproducible.
    pub fn composite_region(
        &mut self,
        mask: &RegionMask,
        color: &[f32],
        jitter: f32,
        rng: &mut ChaCha8Rng,
    ) {
        let (bx0, by0, bx1, by1) = mask.bounds();
        let (px0, px1) = Self::pixel_span(bx0, bx1, self.width);
        let (py0, py1) = Self::pixel_span(by0, by1, self.height);
        let channels = color.len().min(self.channels);

        for y in py0..py1 {
            for x in px0..px1 {
                let (nx, ny) = self.normalized(x, y);
                if !mask.contains(nx, ny) {
                    continue;
                }
                for c in 0..channels {
                    let noise = if jitter > 0.0 {
                        rng.gen_range(-jitter..=jitter)
                    } else {
                        0.0
                    };
                    self.set(x, y, c, (color[c] + noise).clamp(0.0, CHANNEL_MAX));
                }
            }
        }
    }

    /// Stamp a Gaussian-falloff hot spot. Overlapping features accumulate
    /// additively and saturate at the channel maximum.
    ///
    /// `center` is normalized; `radius` is a fraction of the raster height.
    /// `weights` scale the peak intensity per channel.
    pub fn add_point_feature(
        &mut self,
        center: (f64, f64),
        radius: f64,
        intensity: f32,
        weights: &[f32],
    ) {
        let cx = center.0 * self.width as f64;
        let cy = center.1 * self.height as f64;
        let radius_px = (radius * self.height as f64).max(1.0);
        // Beyond twice the radius the Gaussian tail is invisible.
        let reach = radius_px * 2.0;

        let (px0, px1) = Self::pixel_span(
            (cx - reach) / self.width as f64,
            (cx + reach) / self.width as f64,
            self.width,
        );
        let (py0, py1) = Self::pixel_span(
            (cy - reach) / self.height as f64,
            (cy + reach) / self.height as f64,
            self.height,
        );
        let channels = weights.len().min(self.channels);

        for y in py0..py1 {
            for x in px0..px1 {
                let dx = (x as f64 + 0.5) - cx;
                let dy = (y as f64 + 0.5) - cy;
                let normalized_distance = (dx * dx + dy * dy).sqrt() / radius_px;
                if normalized_distance >= 2.0 {
                    continue;
                }
                let falloff = (-(normalized_distance * normalized_distance) * 2.0).exp() as f32;
                for c in 0..channels {
                    self.add_saturating(x, y, c, intensity * falloff * weights[c]);
                }
            }
        }
    }

    /// Accumulate an elliptical coverage blob into `channel` with linear
    /// distance falloff, clamped to the valid range. Used for cloud alpha.
    pub fn add_blob(
        &mut self,
        center: (f64, f64),
        extent: (f64, f64),
        peak: f32,
        channel: usize,
    ) {
        let mask = RegionMask::Ellipse {
            cx: center.0,
            cy: center.1,
            rx: extent.0,
            ry: extent.1,
        };
        let (bx0, by0, bx1, by1) = mask.bounds();
        let (px0, px1) = Self::pixel_span(bx0, bx1, self.width);
        let (py0, py1) = Self::pixel_span(by0, by1, self.height);

        for y in py0..py1 {
            for x in px0..px1 {
                let (nx, ny) = self.normalized(x, y);
                let dx = (nx - center.0) / extent.0;
                let dy = (ny - center.1) / extent.1;
                let distance_sq = dx * dx + dy * dy;
                if distance_sq >= 1.0 {
                    continue;
                }
                self.add_saturating(x, y, channel, peak * (1.0 - distance_sq as f32));
            }
        }
    }

    /// Quantize to interleaved u8 for encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| v.round().clamp(0.0, CHANNEL_MAX) as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn rect_mask_bounds_and_containment() {
        let mask = RegionMask::Rect {
            x0: 0.2,
            y0: 0.3,
            x1: 0.4,
            y1: 0.5,
        };
        assert!(mask.contains(0.3, 0.4));
        assert!(!mask.contains(0.5, 0.4));
        assert_eq!(mask.bounds(), (0.2, 0.3, 0.4, 0.5));
    }

    #[test]
    fn ellipse_mask_containment() {
        let mask = RegionMask::Ellipse {
            cx: 0.5,
            cy: 0.5,
            rx: 0.2,
            ry: 0.1,
        };
        assert!(mask.contains(0.5, 0.5));
        assert!(mask.contains(0.65, 0.5));
        assert!(!mask.contains(0.5, 0.65));
    }

    #[test]
    fn row_gradient_is_not_flat() {
        let mut raster = Raster::new(16, 16, 3, 0.0);
        raster.fill_rows(|fraction| vec![0.0, 0.0, 100.0 + 100.0 * fraction as f32]);

        assert!(raster.get(0, 0, 2) < raster.get(0, 15, 2));
        // Constant across a row.
        assert_eq!(raster.get(0, 8, 2), raster.get(15, 8, 2));
    }

    #[test]
    fn overlapping_point_features_saturate_exactly_at_max() {
        let mut raster = Raster::new(32, 32, 3, 0.0);
        // Two stamps whose naive sum at the shared center far exceeds 255.
        raster.add_point_feature((0.5, 0.5), 0.2, 200.0, &[1.0, 1.0, 1.0]);
        raster.add_point_feature((0.5, 0.5), 0.2, 200.0, &[1.0, 1.0, 1.0]);

        let center = raster.get(16, 16, 0);
        assert_eq!(center, CHANNEL_MAX, "clamped, never wrapped");
    }

    #[test]
    fn jitter_is_reproducible_for_a_fixed_seed() {
        let mask = RegionMask::Rect {
            x0: 0.0,
            y0: 0.0,
            x1: 1.0,
            y1: 1.0,
        };

        let render = || {
            let mut raster = Raster::new(8, 8, 3, 0.0);
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            raster.composite_region(&mask, &[100.0, 100.0, 100.0], 10.0, &mut rng);
            raster.to_bytes()
        };

        assert_eq!(render(), render());
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mask = RegionMask::Rect {
            x0: 0.0,
            y0: 0.0,
            x1: 1.0,
            y1: 1.0,
        };
        let mut raster = Raster::new(16, 16, 3, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        raster.composite_region(&mask, &[100.0, 100.0, 100.0], 10.0, &mut rng);

        for value in raster.data() {
            assert!((90.0..=110.0).contains(value));
        }
    }

    #[test]
    fn blob_accumulation_clamps_alpha() {
        let mut raster = Raster::new(32, 32, 4, 0.0);
        for _ in 0..5 {
            raster.add_blob((0.5, 0.5), (0.3, 0.3), 100.0, 3);
        }

        let alpha = raster.get(16, 16, 3);
        assert_eq!(alpha, CHANNEL_MAX);
        // Color channels untouched by the alpha blob.
        assert_eq!(raster.get(16, 16, 0), 0.0);
    }

    #[test]
    fn quantization_rounds_and_clamps() {
        let mut raster = Raster::new(2, 1, 1, 0.0);
        raster.set(0, 0, 0, 100.6);
        raster.set(1, 0, 0, 300.0);

        assert_eq!(raster.to_bytes(), vec![101, 255]);
    }
}
