//! Bitmap label text built on the 8×8 `font8x8` tables

use font8x8::{BASIC_FONTS, GREEK_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Font cell size in unscaled pixels
const CELL: i32 = 8;

/// Rows of the cell that sit above the baseline
const ASCENT: i32 = 7;

/// Bitmap for a character, falling back to `?`
pub(crate) fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| GREEK_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Draw `text` with its baseline at `baseline`, starting at `left`
///
/// Each lit font bit becomes a `scale`×`scale` block. Anything outside the
/// canvas is clipped.
pub(crate) fn draw_label(
    canvas: &mut RgbaImage,
    left: i32,
    baseline: i32,
    text: &str,
    scale: u32,
    color: Rgba<u8>,
) {
    let scale_i = scale.max(1) as i32;
    let top = baseline.saturating_sub(ASCENT.saturating_mul(scale_i));
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);

    if top >= height || top.saturating_add(CELL * scale_i) <= 0 {
        return;
    }

    let mut cursor = left;
    for ch in text.chars() {
        if cursor >= width {
            break;
        }
        let advance = cursor.saturating_add(CELL * scale_i);
        if advance > 0 {
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..CELL {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    let x = cursor + col * scale_i;
                    let y = top + row as i32 * scale_i;
                    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(scale, scale), color);
                }
            }
        }
        cursor = advance;
    }
}
