//! Image post-processing: sized derivatives plus an inline preview.
//!
//! Every downloaded raster is turned into the configured size presets
//! (bounding boxes, aspect ratio preserved, never upscaled past the source)
//! and one tiny base64 placeholder for progressive loading.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::config::SizePreset;
use crate::error::IngestError;

/// Quality for the tiny inline placeholder; it only needs to block out
/// colors, not survive inspection.
const PLACEHOLDER_QUALITY: u8 = 20;

#[derive(Debug, Clone)]
pub struct Derivative {
    pub preset: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub source_width: u32,
    pub source_height: u32,
    pub derivatives: Vec<Derivative>,
    /// `data:image/jpeg;base64,` preview payload.
    pub placeholder: String,
}

pub fn process(
    bytes: &[u8],
    presets: &[SizePreset],
    jpeg_quality: u8,
    placeholder_size: u32,
) -> Result<ProcessedImage, IngestError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| IngestError::ImageDecode(e.to_string()))?;

    let source_width = img.width();
    let source_height = img.height();

    let mut derivatives = Vec::with_capacity(presets.len());
    for preset in presets {
        // Clamp the bounding box to the source so presets larger than the
        // source never upscale.
        let max_width = preset.max_width.min(source_width);
        let max_height = preset.max_height.min(source_height);

        let resized = if max_width >= source_width && max_height >= source_height {
            img.clone()
        } else {
            img.resize(max_width, max_height, image::imageops::FilterType::Lanczos3)
        };

        derivatives.push(Derivative {
            preset: preset.name.clone(),
            width: resized.width(),
            height: resized.height(),
            bytes: encode_jpeg(&resized, jpeg_quality)?,
        });
    }

    let placeholder = make_placeholder(&img, placeholder_size)?;

    Ok(ProcessedImage {
        source_width,
        source_height,
        derivatives,
        placeholder,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, IngestError> {
    // JPEG has no alpha; flatten before encoding.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| IngestError::ImageDecode(format!("jpeg encode failed: {}", e)))?;

    Ok(buf.into_inner())
}

fn make_placeholder(img: &DynamicImage, max_dimension: u32) -> Result<String, IngestError> {
    let tiny = img.thumbnail(max_dimension, max_dimension);
    let encoded = encode_jpeg(&tiny, PLACEHOLDER_QUALITY)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(encoded)))
}
