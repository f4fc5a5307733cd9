//! Built-in 3×5 pixel font: digits, upper-case letters and a few symbols.
//!
//! Lower-case input is drawn upper-case. Characters without a glyph draw as
//! blank cells of the normal advance.

use crate::raster::{Canvas, Color};

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;
/// Horizontal distance between glyph origins, in font pixels.
pub const ADVANCE: i32 = GLYPH_WIDTH + 1;

/// Rows top to bottom; bit 2 is the left column.
pub fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '[' => [0b110, 0b100, 0b100, 0b100, 0b110],
        ']' => [0b011, 0b001, 0b001, 0b001, 0b011],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        // Degree sign.
        '°' => [0b111, 0b101, 0b111, 0b000, 0b000],
        ' ' => [0; 5],
        _ => return None,
    };
    Some(rows)
}

/// Width in pixels of `text` drawn at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    let n = text.chars().count() as i32;
    if n == 0 {
        return 0;
    }
    (n * ADVANCE - 1) * scale
}

pub fn text_height(scale: i32) -> i32 {
    GLYPH_HEIGHT * scale
}

/// Draw `text` with its top-left corner at `(x, y)`. Each font pixel is a `scale`² block.
pub fn draw_text(canvas: &mut Canvas, x: i32, y: i32, scale: i32, text: &str, color: Color) {
    let scale = scale.max(1);
    let mut pen = x;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (0b100 >> col) != 0 {
                        canvas.fill_rect(
                            pen + col * scale,
                            y + row as i32 * scale,
                            scale,
                            scale,
                            color,
                        );
                    }
                }
            }
        }
        pen += ADVANCE * scale;
    }
}

/// Draw `text` centered on `(cx, cy)`.
pub fn draw_text_centered(canvas: &mut Canvas, cx: i32, cy: i32, scale: i32, text: &str, color: Color) {
    let x = cx - text_width(text, scale) / 2;
    let y = cy - text_height(scale) / 2;
    draw_text(canvas, x, y, scale, text, color);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{TRANSPARENT, WHITE_SMOKE};

    #[test]
    fn test_every_digit_has_a_glyph() {
        for c in '0'..='9' {
            assert!(glyph(c).is_some(), "{c}");
        }
        assert_eq!(glyph('a'), glyph('A'));
        assert!(glyph('~').is_none());
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("1", 1), 3);
        assert_eq!(text_width("12", 2), 14);
    }

    #[test]
    fn test_draw_one() {
        let mut canvas = Canvas::new(8, 8);
        draw_text(&mut canvas, 0, 0, 1, "1", WHITE_SMOKE);
        // Top row of '1' is the middle column only.
        assert_eq!(canvas.pixel(0, 0), Some(TRANSPARENT));
        assert_eq!(canvas.pixel(1, 0), Some(WHITE_SMOKE));
        // Bottom row is full.
        for x in 0..3 {
            assert_eq!(canvas.pixel(x, 4), Some(WHITE_SMOKE));
        }
    }

    #[test]
    fn test_scaled_glyph_fills_blocks() {
        let mut canvas = Canvas::new(12, 20);
        draw_text(&mut canvas, 0, 0, 2, "-", WHITE_SMOKE);
        assert_eq!(canvas.pixel(0, 4), Some(WHITE_SMOKE));
        assert_eq!(canvas.pixel(5, 5), Some(WHITE_SMOKE));
        assert_eq!(canvas.pixel(0, 3), Some(TRANSPARENT));
    }
}
