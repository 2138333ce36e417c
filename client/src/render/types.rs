//! Render-related types and error definitions

use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, ImageError, RgbaImage};
use thiserror::Error;

use crate::pipeline::{ErrorCause, Stage, StageFailure};

/// Errors that can occur while drawing annotations
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to open image {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image.")]
    Decode(#[source] ImageError),

    #[error("Render worker did not complete")]
    Worker(#[source] tokio::task::JoinError),
}

impl StageFailure for RenderError {
    const STAGE: Stage = Stage::Render;

    fn kind(&self) -> &'static str {
        match self {
            RenderError::Read { .. } => "Read",
            RenderError::Decode(_) => "Decode",
            RenderError::Worker(_) => "Worker",
        }
    }

    fn fault(&self) -> Option<ErrorCause> {
        match self {
            RenderError::Read { source, .. } => Some(ErrorCause::io(source)),
            RenderError::Decode(source) => Some(image_cause(source)),
            RenderError::Worker(source) => {
                let kind = if source.is_panic() {
                    "task/panic"
                } else {
                    "task/cancelled"
                };
                Some(ErrorCause::new(kind, source))
            }
        }
    }
}

fn image_cause(error: &ImageError) -> ErrorCause {
    let kind = match error {
        ImageError::Decoding(_) => "image/decoding",
        ImageError::Encoding(_) => "image/encoding",
        ImageError::Parameter(_) => "image/parameter",
        ImageError::Limits(_) => "image/limits",
        ImageError::Unsupported(_) => "image/unsupported",
        ImageError::IoError(_) => "image/io",
    };
    ErrorCause::new(kind, error)
}

/// Annotated RGBA frame handed to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    image: RgbaImage,
}

impl RenderedImage {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    /// Encode as PNG, keeping the alpha channel
    pub fn encode_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer).write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(buffer)
    }

    /// Save to disk, format chosen by extension
    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "jpg" | "jpeg"))
            .unwrap_or(false);

        if is_jpeg {
            // JPEG doesn't support alpha
            let rgb = DynamicImage::ImageRgba8(self.image.clone()).into_rgb8();
            rgb.save(path)
        } else {
            self.image.save(path)
        }
    }
}
