//! Software drawing onto an RGBA bitmap.
//!
//! Coordinates are pixels with the origin at the top left. Everything clips to
//! the bitmap; out-of-range primitives draw nothing rather than failing.

use image::{Rgba, RgbaImage};

pub type Color = Rgba<u8>;

pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);
pub const WHITE_SMOKE: Color = Rgba([245, 245, 245, 255]);
pub const DARK_GRAY: Color = Rgba([169, 169, 169, 255]);

/// Scale the color channels of `color` by `factor`, keeping alpha.
pub fn shade(color: Color, factor: f32) -> Color {
    let [r, g, b, a] = color.0;
    let f = |c: u8| (c as f32 * factor).min(255.0) as u8;
    Rgba([f(r), f(g), f(b), a])
}

/// Bitmap with drawing primitives.
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.width() && y < self.height()).then(|| *self.image.get_pixel(x, y))
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Source-over blend of `color` onto one pixel.
    pub fn blend(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        let sa = color[3] as u32;
        if sa == 255 {
            *dst = color;
            return;
        }
        if sa == 0 {
            return;
        }
        let da = dst[3] as u32;
        let out_a = sa + da * (255 - sa) / 255;
        if out_a == 0 {
            return;
        }
        for c in 0..3 {
            let src = color[c] as u32 * sa;
            let dst_c = dst[c] as u32 * da * (255 - sa) / 255;
            dst[c] = ((src + dst_c) / out_a).min(255) as u8;
        }
        dst[3] = out_a as u8;
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width() as i32);
        let y1 = (y + h).min(self.height() as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color);
            }
        }
    }

    /// One pixel wide rectangle outline.
    pub fn stroke_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y + 1, 1, h - 2, color);
        self.fill_rect(x + w - 1, y + 1, 1, h - 2, color);
    }

    /// Bresenham line, `thickness` pixels wide.
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, thickness: i32, color: Color) {
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let half = thickness.max(1) / 2;
        loop {
            self.fill_rect(x - half, y - half, thickness.max(1), thickness.max(1), color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Midpoint circle outline around `(cx, cy)`.
    pub fn circle(&mut self, cx: i32, cy: i32, radius: i32, thickness: i32, color: Color) {
        if radius <= 0 {
            return;
        }
        let t = thickness.max(1);
        let half = t / 2;
        let (mut x, mut y) = (radius, 0);
        let mut err = 1 - radius;
        while x >= y {
            for (px, py) in [
                (x, y),
                (y, x),
                (-y, x),
                (-x, y),
                (-x, -y),
                (-y, -x),
                (y, -x),
                (x, -y),
            ] {
                self.fill_rect(cx + px - half, cy + py - half, t, t, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_rect(-4, -4, 6, 6, WHITE_SMOKE);
        assert_eq!(canvas.pixel(1, 1), Some(WHITE_SMOKE));
        assert_eq!(canvas.pixel(2, 2), Some(TRANSPARENT));
        assert_eq!(canvas.pixel(8, 0), None);
    }

    #[test]
    fn test_line_hits_both_ends() {
        let mut canvas = Canvas::new(16, 16);
        canvas.line(1, 2, 12, 9, 1, WHITE_SMOKE);
        assert_eq!(canvas.pixel(1, 2), Some(WHITE_SMOKE));
        assert_eq!(canvas.pixel(12, 9), Some(WHITE_SMOKE));
    }

    #[test]
    fn test_circle_radius() {
        let mut canvas = Canvas::new(32, 32);
        canvas.circle(16, 16, 10, 1, WHITE_SMOKE);
        assert_eq!(canvas.pixel(26, 16), Some(WHITE_SMOKE));
        assert_eq!(canvas.pixel(16, 6), Some(WHITE_SMOKE));
        assert_eq!(canvas.pixel(16, 16), Some(TRANSPARENT));
    }

    #[test]
    fn test_blend_half_alpha_over_opaque() {
        let mut canvas = Canvas::new(1, 1);
        canvas.blend(0, 0, Rgba([0, 0, 0, 255]));
        canvas.blend(0, 0, Rgba([255, 255, 255, 128]));
        let p = canvas.pixel(0, 0).unwrap();
        assert_eq!(p[3], 255);
        assert!((127..=129).contains(&p[0]));
    }

    #[test]
    fn test_shade_keeps_alpha() {
        assert_eq!(shade(Rgba([100, 200, 250, 77]), 0.5), Rgba([50, 100, 125, 77]));
        assert_eq!(shade(Rgba([200, 0, 0, 255]), 1.5)[0], 255);
    }
}
