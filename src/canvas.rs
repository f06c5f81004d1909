use crate::color::Rgba;

/// Drawing surface the growth field renders into.
///
/// Mirrors a retained canvas: stroke state is set first, then `line` draws
/// with it. `pixels()` exposes the RGBA readback taken by the last
/// `load_pixels()` call, not the live drawing buffer.
pub trait Surface {
    /// Logical width in pixels
    fn width(&self) -> usize;
    /// Logical height in pixels
    fn height(&self) -> usize;
    /// Physical pixels per logical pixel along each axis
    fn pixel_density(&self) -> usize;

    fn stroke(&mut self, color: Rgba);
    fn stroke_weight(&mut self, px: f32);
    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32);
    fn clear(&mut self);

    /// Refresh the readback buffer from what has been drawn so far
    fn load_pixels(&mut self);
    /// RGBA readback, `width * density` by `height * density` pixels
    fn pixels(&self) -> &[u8];
}

/// Byte offset of the alpha channel for logical pixel `(x, y)`
pub fn alpha_offset(x: usize, y: usize, width: usize, density: usize) -> usize {
    ((y * density) * (width * density) + x * density) * 4 + 3
}

/// Occupancy oracle: true when the pixel's alpha is below `threshold`.
/// Coordinates outside the buffer are never blank.
pub fn is_blank(pixels: &[u8], width: usize, density: usize, x: f32, y: f32, threshold: u8) -> bool {
    if x < 0.0 || y < 0.0 || x >= width as f32 {
        return false;
    }
    pixels
        .get(alpha_offset(x as usize, y as usize, width, density))
        .is_some_and(|&alpha| alpha < threshold)
}

/// Alpha blend a single channel
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Software RGBA raster implementing [`Surface`]
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: usize,
    height: usize,
    density: usize,
    /// Live drawing buffer
    buffer: Vec<u8>,
    /// Snapshot returned by `pixels()`
    readback: Vec<u8>,
    stroke: Rgba,
    weight: f32,
}

impl PixelCanvas {
    pub fn new(width: usize, height: usize, density: usize) -> Self {
        let density = density.max(1);
        let len = width * density * height * density * 4;
        Self {
            width,
            height,
            density,
            buffer: vec![0; len],
            readback: vec![0; len],
            stroke: Rgba::rgb(255, 255, 255),
            weight: 1.0,
        }
    }

    pub fn physical_width(&self) -> usize {
        self.width * self.density
    }

    pub fn physical_height(&self) -> usize {
        self.height * self.density
    }

    /// Live drawing buffer (what the next `load_pixels` will publish)
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Live color at logical pixel `(x, y)`
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = alpha_offset(x, y, self.width, self.density) - 3;
        Some(Rgba {
            r: self.buffer[idx],
            g: self.buffer[idx + 1],
            b: self.buffer[idx + 2],
            a: self.buffer[idx + 3],
        })
    }

    /// Source-over blend of one physical pixel
    fn blend_pixel(&mut self, px: i64, py: i64, color: Rgba) {
        if px < 0 || py < 0 {
            return;
        }
        let (px, py) = (px as usize, py as usize);
        if px >= self.physical_width() || py >= self.physical_height() {
            return;
        }
        let idx = (py * self.physical_width() + px) * 4;
        let alpha = color.a as u16;
        let dst = &mut self.buffer[idx..idx + 4];
        dst[0] = blend_channel(color.r, dst[0], alpha);
        dst[1] = blend_channel(color.g, dst[1], alpha);
        dst[2] = blend_channel(color.b, dst[2], alpha);
        dst[3] = blend_channel(255, dst[3], alpha);
    }

    /// Stamp a filled disc of the current weight, in physical pixels
    fn stamp(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        if radius <= 0.5 {
            self.blend_pixel(cx.floor() as i64, cy.floor() as i64, color);
            return;
        }
        let r2 = radius * radius;
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }
}

impl Surface for PixelCanvas {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_density(&self) -> usize {
        self.density
    }

    fn stroke(&mut self, color: Rgba) {
        self.stroke = color;
    }

    fn stroke_weight(&mut self, px: f32) {
        self.weight = px.max(0.0);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let d = self.density as f32;
        let (x1, y1, x2, y2) = (x1 * d, y1 * d, x2 * d, y2 * d);
        let radius = self.weight * d / 2.0;
        let color = self.stroke;

        // Half-pixel spacing so consecutive stamps overlap; the end point is
        // left to the next segment to avoid double-blending joints
        let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        let steps = (len * 2.0).ceil().max(1.0) as usize;
        let mut last = (i64::MIN, i64::MIN);
        for i in 0..steps {
            let t = i as f32 / steps as f32;
            let cx = x1 + (x2 - x1) * t;
            let cy = y1 + (y2 - y1) * t;
            let cell = (cx.floor() as i64, cy.floor() as i64);
            if radius <= 0.5 && cell == last {
                continue;
            }
            last = cell;
            self.stamp(cx, cy, radius, color);
        }
    }

    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    fn load_pixels(&mut self) {
        self.readback.copy_from_slice(&self.buffer);
    }

    fn pixels(&self) -> &[u8] {
        &self.readback
    }
}
