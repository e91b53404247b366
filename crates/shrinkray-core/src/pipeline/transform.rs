//! Resize and re-encode: raw image bytes in, JPEG bytes out.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageReader, Limits};
use std::io::Cursor;

use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::types::ImageBytes;

/// A pure bytes-to-bytes image conversion run by every worker.
///
/// Implementations are CPU-bound and are called from the blocking pool.
pub trait ImageTransform: Send + Sync {
    fn transform(&self, bytes: &[u8]) -> Result<ImageBytes, TransformError>;
}

/// Pure bytes-to-bytes image optimizer.
///
/// Output is always JPEG at the configured quality, whatever the input
/// format. Images wider than `target_width` are scaled down with Lanczos3
/// resampling, keeping the aspect ratio. Narrower images are never upscaled;
/// they keep their dimensions and are only re-encoded.
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    config: TransformConfig,
}

impl ImageTransformer {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Decode `bytes`, resize, and encode as JPEG.
    pub fn transform(&self, bytes: &[u8]) -> Result<ImageBytes, TransformError> {
        let image = self.decode(bytes)?;
        let resized = self.resize(image);
        self.encode(&resized)
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, TransformError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(format!("Cannot detect image format: {e}")))?;
        if reader.format().is_none() {
            return Err(TransformError::Decode("Unrecognized image format".into()));
        }

        // Dimensions are checked from the header, before pixel buffers exist.
        let max_dim = self.config.max_image_dimension;
        let mut limits = Limits::default();
        limits.max_image_width = Some(max_dim);
        limits.max_image_height = Some(max_dim);
        reader.limits(limits);

        reader.decode().map_err(|e| match e {
            ImageError::Limits(_) => {
                TransformError::Decode(format!("Image too large: exceeds {max_dim}px"))
            }
            other => TransformError::Decode(other.to_string()),
        })
    }

    fn resize(&self, image: DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        match target_dimensions(width, height, self.config.target_width) {
            Some((w, h)) => image.resize_exact(w, h, FilterType::Lanczos3),
            None => image,
        }
    }

    fn encode(&self, image: &DynamicImage) -> Result<ImageBytes, TransformError> {
        // JPEG has no alpha channel; flatten everything to RGB8 first.
        let rgb = image.to_rgb8();

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.config.quality)
            .encode_image(&rgb)
            .map_err(|e| TransformError::Encode(e.to_string()))?;

        Ok(ImageBytes::from(buffer))
    }
}

impl ImageTransform for ImageTransformer {
    fn transform(&self, bytes: &[u8]) -> Result<ImageBytes, TransformError> {
        ImageTransformer::transform(self, bytes)
    }
}

/// Output dimensions for a `width`x`height` source, or `None` when the
/// source is already no wider than `target_width`.
fn target_dimensions(width: u32, height: u32, target_width: u32) -> Option<(u32, u32)> {
    if width <= target_width {
        return None;
    }
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2)
        / u64::from(width);
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    Some((target_width, scaled))
}
