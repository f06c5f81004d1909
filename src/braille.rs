use crate::canvas::{PixelCanvas, Surface};
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// A single rendered Braille cell with position and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Render the canvas to Braille characters.
///
/// A dot is lit when its pixel's alpha reaches `min_alpha`; the cell takes
/// the average color of its lit dots.
pub fn render_to_braille(canvas: &PixelCanvas, canvas_width: u16, canvas_height: u16, min_alpha: u8) -> Vec<BrailleCell> {
    let width = canvas.physical_width();
    let height = canvas.physical_height();
    let density = canvas.pixel_density();

    // Braille effective resolution
    let braille_width = canvas_width as usize * 2;
    let braille_height = canvas_height as usize * 4;
    let scale_x = canvas.width() as f32 / braille_width.max(1) as f32;
    let scale_y = canvas.height() as f32 / braille_height.max(1) as f32;
    let min_alpha = min_alpha.max(1);

    let mut cells = Vec::new();
    if width == 0 || height == 0 || density == 0 {
        return cells;
    }

    for cy in 0..canvas_height {
        for cx in 0..canvas_width {
            let mut pattern: u8 = 0;
            let mut sum = [0u32; 3];
            let mut dot_count = 0u32;

            let base_bx = cx as usize * 2;
            let base_by = cy as usize * 4;

            for dx in 0..2 {
                for dy in 0..4 {
                    let x = ((base_bx + dx) as f32 * scale_x) as usize;
                    let y = ((base_by + dy) as f32 * scale_y) as usize;
                    let Some(pixel) = canvas.get_pixel(x, y) else {
                        continue;
                    };
                    if pixel.a >= min_alpha {
                        pattern |= BRAILLE_DOTS[dx][dy];
                        dot_count += 1;
                        sum[0] += pixel.r as u32;
                        sum[1] += pixel.g as u32;
                        sum[2] += pixel.b as u32;
                    }
                }
            }

            // Only emit cells that have at least one dot
            if pattern != 0 {
                let braille_char = char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' ');
                let avg = |c: u32| (c / dot_count) as u8;
                cells.push(BrailleCell {
                    x: cx,
                    y: cy,
                    char: braille_char,
                    color: Color::Rgb(avg(sum[0]), avg(sum[1]), avg(sum[2])),
                });
            }
        }
    }

    cells
}

/// Canvas size (in logical pixels) that maps one pixel to one braille dot
pub fn calculate_canvas_size(canvas_width: u16, canvas_height: u16) -> (usize, usize) {
    let width = (canvas_width as usize * 2).max(64);
    let height = (canvas_height as usize * 4).max(64);
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn test_braille_pattern() {
        assert_eq!(BRAILLE_DOTS[0][0], 0x01); // Top-left
        assert_eq!(BRAILLE_DOTS[1][0], 0x08); // Top-right
        assert_eq!(BRAILLE_DOTS[0][3], 0x40); // Bottom-left
        assert_eq!(BRAILLE_DOTS[1][3], 0x80); // Bottom-right

        let all_dots: u8 = BRAILLE_DOTS[0].iter().sum::<u8>() + BRAILLE_DOTS[1].iter().sum::<u8>();
        assert_eq!(all_dots, 0xFF);
    }

    #[test]
    fn test_blank_canvas_renders_nothing() {
        let canvas = PixelCanvas::new(64, 64, 1);
        assert!(render_to_braille(&canvas, 32, 16, 10).is_empty());
    }

    #[test]
    fn test_drawn_pixels_light_dots() {
        let mut canvas = PixelCanvas::new(64, 64, 1);
        canvas.stroke(Rgba::rgb(200, 100, 0));
        // Top row of the first cell only
        canvas.line(0.0, 0.0, 2.0, 0.0);

        let cells = render_to_braille(&canvas, 32, 16, 10);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].x, 0);
        assert_eq!(cells[0].y, 0);
        assert_eq!(cells[0].char, char::from_u32(BRAILLE_BASE + 0x09).unwrap());
        assert_eq!(cells[0].color, Color::Rgb(200, 100, 0));
    }

    #[test]
    fn test_faint_pixels_are_ignored() {
        let mut canvas = PixelCanvas::new(64, 64, 1);
        canvas.stroke(Rgba::rgb(255, 255, 255).with_alpha(4));
        canvas.line(0.0, 10.0, 60.0, 10.0);
        assert!(render_to_braille(&canvas, 32, 16, 10).is_empty());
    }

    #[test]
    fn test_canvas_size_has_floor() {
        assert_eq!(calculate_canvas_size(100, 40), (200, 160));
        assert_eq!(calculate_canvas_size(10, 5), (64, 64));
    }
}
