use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};

use crate::OcrError;

/// Encoded image bytes plus what is needed to send and rescale them
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// A downscaled copy prepared for region detection
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub payload: ImagePayload,
    /// Multiply coordinates in `payload` space by these to get source pixels
    pub scale_x: f64,
    pub scale_y: f64,
}

impl ImagePayload {
    /// Sniffs the format from the bytes; anything undecodable is rejected
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, OcrError> {
        let format = image::guess_format(&bytes)
            .map_err(|_| OcrError::UnsupportedImage("unrecognised image format".to_string()))?;

        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| OcrError::UnsupportedImage(e.to_string()))?;

        Ok(Self {
            mime_type: format.to_mime_type().to_string(),
            bytes,
            width,
            height,
        })
    }

    pub async fn from_path(path: &Path) -> Result<Self, OcrError> {
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!("Loaded {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(bytes)
    }

    /// Fits the image into `max_dimension` on both sides and re-encodes it as JPEG
    pub fn prepare_for_regions(
        &self,
        max_dimension: u32,
        quality: u8,
    ) -> Result<PreparedImage, OcrError> {
        let format = ImageFormat::from_mime_type(&self.mime_type)
            .ok_or_else(|| OcrError::UnsupportedImage(self.mime_type.clone()))?;
        let decoded = image::load_from_memory_with_format(&self.bytes, format)
            .map_err(|e| OcrError::UnsupportedImage(e.to_string()))?;

        let resized = if decoded.width() > max_dimension || decoded.height() > max_dimension {
            decoded.resize(max_dimension, max_dimension, FilterType::Triangle)
        } else {
            decoded
        };

        let rgb = resized.to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
            .encode_image(&rgb)
            .map_err(|e| OcrError::UnsupportedImage(e.to_string()))?;

        let (width, height) = (rgb.width().max(1), rgb.height().max(1));
        tracing::debug!(
            "Prepared {}x{} -> {}x{} JPEG ({} bytes)",
            self.width,
            self.height,
            width,
            height,
            bytes.len()
        );

        Ok(PreparedImage {
            scale_x: f64::from(self.width) / f64::from(width),
            scale_y: f64::from(self.height) / f64::from(height),
            payload: ImagePayload {
                bytes,
                mime_type: "image/jpeg".to_string(),
                width,
                height,
            },
        })
    }
}
