use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tracing::{debug, info, warn};

use super::{replace_extension, ImageAsset};
use crate::error::{Error, Result};

/// Encode qualities tried in order, in percent. The last rung is the floor.
pub const QUALITY_LADDER: [u8; 8] = [80, 70, 60, 50, 40, 30, 20, 10];

const FLOOR_QUALITY: u8 = QUALITY_LADDER[QUALITY_LADDER.len() - 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionBudget {
    pub max_bytes: u64,
    /// Maximum length of the longer edge, in pixels.
    pub max_dimension: u32,
}

impl CompressionBudget {
    pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;
    pub const DEFAULT_MAX_DIMENSION: u32 = 1080;
}

impl Default for CompressionBudget {
    fn default() -> Self {
        Self {
            max_bytes: Self::DEFAULT_MAX_BYTES,
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Lossy target format used by the compressor.
pub trait QualityEncoder {
    fn media_type(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    /// Encode `image` at `quality` percent.
    fn encode(&self, image: &RgbImage, quality: u8) -> anyhow::Result<Vec<u8>>;
}

/// Baseline JPEG via the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegQuality;

impl QualityEncoder for JpegQuality {
    fn media_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn extension(&self) -> &'static str {
        "jpg"
    }

    fn encode(&self, image: &RgbImage, quality: u8) -> anyhow::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode_image(image)
            .context("JPEG encode")?;
        Ok(bytes)
    }
}

pub fn needs_compression(asset: &ImageAsset, budget: &CompressionBudget) -> bool {
    asset.size() > budget.max_bytes
}

/// Scale so the longer edge equals `max_dimension`, truncating the other
/// edge. Images already within bounds are returned unchanged.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let scale = |edge: u32, longer: u32| -> u32 {
        let scaled = (f64::from(edge) * f64::from(max_dimension)) / f64::from(longer);
        (scaled as u32).max(1)
    };

    if width > height && width > max_dimension {
        (max_dimension, scale(height, width))
    } else if height > max_dimension {
        (scale(width, height), max_dimension)
    } else {
        (width, height)
    }
}

/// Compress with the default JPEG encoder.
pub fn compress(asset: ImageAsset, budget: &CompressionBudget) -> Result<ImageAsset> {
    Compressor::new(*budget).compress(asset)
}

#[derive(Debug, Clone)]
pub struct Compressor<E = JpegQuality> {
    budget: CompressionBudget,
    encoder: E,
}

impl Compressor<JpegQuality> {
    pub fn new(budget: CompressionBudget) -> Self {
        Self {
            budget,
            encoder: JpegQuality,
        }
    }
}

impl<E: QualityEncoder> Compressor<E> {
    pub fn with_encoder(budget: CompressionBudget, encoder: E) -> Self {
        Self { budget, encoder }
    }

    pub fn budget(&self) -> &CompressionBudget {
        &self.budget
    }

    /// Re-encode `asset` under the byte budget.
    ///
    /// Assets already within budget are returned untouched. Otherwise the
    /// image is downscaled to `max_dimension` and walked down
    /// [`QUALITY_LADDER`]; the floor rung is accepted even when still over
    /// budget, so this always yields a file after at most eight encodes.
    pub fn compress(&self, asset: ImageAsset) -> Result<ImageAsset> {
        if !needs_compression(&asset, &self.budget) {
            return Ok(asset);
        }

        let decoded = image::load_from_memory(&asset.bytes).map_err(Error::Decode)?;
        let (source_width, source_height) = decoded.dimensions();
        let (width, height) =
            scaled_dimensions(source_width, source_height, self.budget.max_dimension);

        let mut pixels = flatten_onto_white(&decoded);
        if pixels.dimensions() != (width, height) {
            pixels = imageops::resize(&pixels, width, height, FilterType::Triangle);
        }

        let (bytes, quality) = self.encode_within_budget(&pixels)?;

        info!(
            name = %asset.name,
            original_size = asset.size(),
            compressed_size = bytes.len(),
            width,
            height,
            quality,
            "Image compressed"
        );

        Ok(ImageAsset {
            name: replace_extension(&asset.name, self.encoder.extension()),
            media_type: self.encoder.media_type().to_string(),
            bytes,
        })
    }

    fn encode_within_budget(&self, pixels: &RgbImage) -> Result<(Vec<u8>, u8)> {
        for quality in QUALITY_LADDER {
            let encoded = self
                .encoder
                .encode(pixels, quality)
                .map_err(|e| Error::Encode {
                    quality,
                    message: format!("{e:#}"),
                })?;
            let size = encoded.len() as u64;
            debug!(quality, size, max_bytes = self.budget.max_bytes, "Encoded candidate");

            if size <= self.budget.max_bytes {
                return Ok((encoded, quality));
            }
            if quality <= FLOOR_QUALITY {
                warn!(
                    size,
                    max_bytes = self.budget.max_bytes,
                    "Quality floor reached while still over budget"
                );
                return Ok((encoded, quality));
            }
        }

        Err(Error::Encode {
            quality: FLOOR_QUALITY,
            message: "quality ladder exhausted".to_string(),
        })
    }
}

/// Drop the alpha channel, compositing onto a white background.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let pixel = rgba.get_pixel(x, y);
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8 };
        Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])])
    })
}
