//! Draws star annotations onto a copy of the photo

use image::{ImageReader, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_circle_mut;
use tracing::debug;

use crate::annotation::AnnotationSet;
use crate::source::LocalImageFile;

use super::glyphs::draw_label;
use super::types::{RenderError, RenderedImage};

/// Radius of the marker ring, in pixels
pub const CIRCLE_RADIUS: f32 = 20.0;

/// Thickness of the marker ring, in pixels
pub const STROKE_WIDTH: f32 = 5.0;

/// Label baseline offset from the star: right and up
pub const LABEL_OFFSET: (i32, i32) = (25, 25);

/// Each font cell pixel becomes a `LABEL_SCALE`×`LABEL_SCALE` block (24 px text)
pub const LABEL_SCALE: u32 = 3;

/// Drop shadow offset behind label text
pub const SHADOW_OFFSET: (i32, i32) = (2, 2);

pub const CIRCLE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Renders annotation sets onto decoded images
#[derive(Debug, Default, Clone, Copy)]
pub struct Annotator;

impl Annotator {
    pub fn new() -> Self {
        Self
    }

    /// Decode the file and draw every annotation onto an RGBA copy
    ///
    /// The file on disk is only read. The decoded frame is consumed by the
    /// RGBA conversion, so at most two frames are alive at once.
    pub fn render(
        &self,
        file: &LocalImageFile,
        annotations: &AnnotationSet,
    ) -> Result<RenderedImage, RenderError> {
        let decoded = ImageReader::open(file.path())
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|source| RenderError::Read {
                path: file.path().to_path_buf(),
                source,
            })?
            .decode()
            .map_err(RenderError::Decode)?;

        debug!(
            "Decoded {:?}: {}x{} {:?}",
            file.path(),
            decoded.width(),
            decoded.height(),
            decoded.color()
        );

        let mut canvas = decoded.into_rgba8();
        self.annotate(&mut canvas, annotations);
        Ok(RenderedImage::new(canvas))
    }

    /// Draw annotations in set order; later ones may cover earlier ones
    pub fn annotate(&self, canvas: &mut RgbaImage, annotations: &AnnotationSet) {
        for record in annotations {
            draw_ring(canvas, record.x, record.y, CIRCLE_RADIUS, STROKE_WIDTH, CIRCLE_COLOR);

            let left = (record.x as i32).saturating_add(LABEL_OFFSET.0);
            let baseline = (record.y as i32).saturating_sub(LABEL_OFFSET.1);
            draw_label(
                canvas,
                left.saturating_add(SHADOW_OFFSET.0),
                baseline.saturating_add(SHADOW_OFFSET.1),
                &record.label,
                LABEL_SCALE,
                SHADOW_COLOR,
            );
            draw_label(canvas, left, baseline, &record.label, LABEL_SCALE, TEXT_COLOR);
        }
    }
}

/// Unfilled circle of the given stroke width centered at `(cx, cy)`
///
/// Drawn as concentric one-pixel circles spanning the stroke. Rings that miss
/// the canvas entirely are skipped, which also keeps the integer circle math
/// in range for huge coordinates.
fn draw_ring(canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32, stroke: f32, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    let outer = radius + stroke / 2.0;
    if !cx.is_finite()
        || !cy.is_finite()
        || cx + outer < 0.0
        || cy + outer < 0.0
        || cx - outer >= width as f32
        || cy - outer >= height as f32
    {
        return;
    }

    let center = (cx.round() as i32, cy.round() as i32);
    let inner = (radius - stroke / 2.0).max(0.0).ceil() as i32;
    for r in inner..=outer.floor() as i32 {
        draw_hollow_circle_mut(canvas, center, r, color);
    }
}
