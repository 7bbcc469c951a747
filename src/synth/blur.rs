//! Separable Gaussian smoothing pass.
//!
//! Applied after compositing to remove hard mask edges. Two 1-D convolutions
//! (rows, then columns) with edge clamping; rows are processed in parallel
//! but each output pixel is a pure function of the input, so results are
//! identical regardless of thread scheduling.

use rayon::prelude::*;

use super::raster::Raster;

pub fn gaussian_blur(raster: &mut Raster, sigma: f32) {
    if sigma <= 0.0 {
        return;
    }

    let kernel = build_kernel(sigma);
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let channels = raster.channels();

    let horizontal = convolve_rows(raster.data(), width, height, channels, &kernel);
    let vertical = convolve_columns(&horizontal, width, height, channels, &kernel);

    *raster.data_mut() = vertical;
}

fn build_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as i64;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|offset| (-(offset * offset) as f32 / denom).exp())
        .collect();

    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

fn convolve_rows(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
) -> Vec<f32> {
    let radius = (kernel.len() / 2) as i64;
    let row_len = width * channels;
    let mut out = vec![0.0f32; data.len()];

    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, out_row)| {
            let in_row = &data[y * row_len..(y + 1) * row_len];
            for x in 0..width {
                for c in 0..channels {
                    let mut acc = 0.0f32;
                    for (k, weight) in kernel.iter().enumerate() {
                        let sample_x =
                            (x as i64 + k as i64 - radius).clamp(0, width as i64 - 1) as usize;
                        acc += in_row[sample_x * channels + c] * weight;
                    }
                    out_row[x * channels + c] = acc;
                }
            }
        });

    out
}

fn convolve_columns(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
) -> Vec<f32> {
    let radius = (kernel.len() / 2) as i64;
    let row_len = width * channels;
    let mut out = vec![0.0f32; data.len()];

    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut acc = 0.0f32;
                    for (k, weight) in kernel.iter().enumerate() {
                        let sample_y =
                            (y as i64 + k as i64 - radius).clamp(0, height as i64 - 1) as usize;
                        acc += data[sample_y * row_len + x * channels + c] * weight;
                    }
                    out_row[x * channels + c] = acc;
                }
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sigma_is_a_no_op() {
        let mut raster = Raster::new(4, 4, 1, 0.0);
        raster.set(2, 2, 0, 255.0);
        let before = raster.data().to_vec();

        gaussian_blur(&mut raster, 0.0);
        assert_eq!(raster.data(), &before[..]);
    }

    #[test]
    fn impulse_spreads_and_preserves_mass() {
        let mut raster = Raster::new(15, 15, 1, 0.0);
        raster.set(7, 7, 0, 255.0);

        gaussian_blur(&mut raster, 1.5);

        let center = raster.get(7, 7, 0);
        let neighbor = raster.get(8, 7, 0);
        assert!(center < 255.0, "peak flattened");
        assert!(neighbor > 0.0, "energy spread outward");
        assert!(center > neighbor, "still a peak");

        // Away from edges the kernel is fully inside, so mass is conserved.
        let total: f32 = raster.data().iter().sum();
        assert!((total - 255.0).abs() < 0.5, "total was {}", total);
    }

    #[test]
    fn blur_is_deterministic_across_invocations() {
        let render = || {
            let mut raster = Raster::new(32, 16, 3, 0.0);
            raster.set(10, 8, 1, 200.0);
            raster.set(20, 4, 2, 120.0);
            gaussian_blur(&mut raster, 2.5);
            raster.to_bytes()
        };

        assert_eq!(render(), render());
    }

    #[test]
    fn kernel_is_normalized() {
        let kernel = build_kernel(2.0);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len(), 13); // radius ceil(6) both sides plus center
    }
}
