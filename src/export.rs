//! Canvas snapshots: PNG stills, GIF recordings and JSON state dumps.

use crate::canvas::PixelCanvas;
use crate::color::Rgba;
use crate::field::StateView;
use anyhow::{bail, Context, Result};
use image::{ImageFormat, RgbaImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Background GIF frames are flattened onto
pub const GIF_BACKGROUND: Rgba = Rgba::rgb(12, 12, 16);

/// `<dir>/<prefix>-<unix seconds>.<ext>`
pub fn timestamped_path(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    dir.join(format!("{}-{}.{}", prefix, secs, ext))
}

/// Copy the live drawing buffer into an image at physical resolution
pub fn canvas_to_image(canvas: &PixelCanvas) -> Result<RgbaImage> {
    let (w, h) = (canvas.physical_width() as u32, canvas.physical_height() as u32);
    RgbaImage::from_raw(w, h, canvas.buffer().to_vec()).context("Canvas buffer does not match its dimensions")
}

/// Save the canvas as a PNG, keeping transparency
pub fn save_png(canvas: &PixelCanvas, path: &Path) -> Result<()> {
    let image = canvas_to_image(canvas)?;
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write PNG {}", path.display()))?;
    tracing::info!(path = %path.display(), "saved png");
    Ok(())
}

/// Write a `StateView` as pretty JSON
pub fn dump_state(view: &StateView, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(view).context("Failed to serialize state")?;
    fs::write(path, json).with_context(|| format!("Failed to write state dump {}", path.display()))?;
    tracing::info!(path = %path.display(), "dumped state");
    Ok(())
}

/// Flatten straight-alpha RGBA onto an opaque background
fn flatten(buffer: &[u8], background: Rgba) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len());
    for px in buffer.chunks_exact(4) {
        let a = px[3] as u32;
        let over = |src: u8, dst: u8| ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8;
        out.extend_from_slice(&[
            over(px[0], background.r),
            over(px[1], background.g),
            over(px[2], background.b),
            255,
        ]);
    }
    out
}

/// Records every `frame_every`-th captured canvas as a looping GIF frame
pub struct GifRecorder<W: Write> {
    encoder: gif::Encoder<W>,
    width: u16,
    height: u16,
    frame_every: usize,
    /// Centiseconds each frame is shown
    delay: u16,
    captures: usize,
    frames: usize,
}

impl GifRecorder<BufWriter<File>> {
    /// Start a recording at `path` sized for `canvas`
    pub fn create(path: &Path, canvas: &PixelCanvas, frame_every: usize) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("Failed to create GIF {}", path.display()))?;
        tracing::info!(path = %path.display(), "recording gif");
        Self::new(BufWriter::new(file), canvas.physical_width(), canvas.physical_height(), frame_every)
    }
}

impl<W: Write> GifRecorder<W> {
    pub fn new(writer: W, width: usize, height: usize, frame_every: usize) -> Result<Self> {
        let (Ok(width), Ok(height)) = (u16::try_from(width), u16::try_from(height)) else {
            bail!("Canvas {}x{} is too large for GIF", width, height);
        };
        let mut encoder = gif::Encoder::new(writer, width, height, &[]).context("Failed to start GIF")?;
        encoder.set_repeat(gif::Repeat::Infinite).context("Failed to write GIF header")?;
        Ok(Self {
            encoder,
            width,
            height,
            frame_every: frame_every.max(1),
            delay: 4,
            captures: 0,
            frames: 0,
        })
    }

    /// Count one update and write a frame when it lands on the cadence.
    /// Returns whether a frame was written.
    pub fn capture(&mut self, canvas: &PixelCanvas) -> Result<bool> {
        self.captures += 1;
        if (self.captures - 1) % self.frame_every != 0 {
            return Ok(false);
        }
        self.add_frame(canvas)?;
        Ok(true)
    }

    /// Unconditionally append the canvas as a frame
    pub fn add_frame(&mut self, canvas: &PixelCanvas) -> Result<()> {
        if canvas.physical_width() != self.width as usize || canvas.physical_height() != self.height as usize {
            bail!("Canvas size changed during GIF recording");
        }
        let mut pixels = flatten(canvas.buffer(), GIF_BACKGROUND);
        let mut frame = gif::Frame::from_rgba_speed(self.width, self.height, &mut pixels, 10);
        frame.delay = self.delay;
        self.encoder.write_frame(&frame).context("Failed to write GIF frame")?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Write the trailer and hand back the writer
    pub fn finish(self) -> Result<W> {
        let frames = self.frames;
        let writer = self.encoder.into_inner().context("Failed to finish GIF")?;
        tracing::info!(frames, "gif recording finished");
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Surface;
    use crate::field::GrowthField;
    use crate::settings::GrowthSettings;
    use tempfile::TempDir;

    fn drawn_canvas() -> PixelCanvas {
        let mut canvas = PixelCanvas::new(32, 24, 1);
        canvas.stroke(Rgba::rgb(250, 20, 20));
        canvas.line(2.0, 2.0, 30.0, 20.0);
        canvas
    }

    #[test]
    fn test_png_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.png");
        save_png(&drawn_canvas(), &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (32, 24));
        assert_eq!(loaded.get_pixel(2, 2).0, [250, 20, 20, 255]);
        assert_eq!(loaded.get_pixel(30, 2).0[3], 0);
    }

    #[test]
    fn test_flatten_over_background() {
        let bg = Rgba::rgb(10, 20, 30);
        let out = flatten(&[0, 0, 0, 0, 255, 255, 255, 255], bg);
        assert_eq!(out, vec![10, 20, 30, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn test_gif_records_on_cadence() {
        let canvas = drawn_canvas();
        let mut recorder = GifRecorder::new(Vec::new(), 32, 24, 3).unwrap();
        let written: Vec<bool> = (0..7).map(|_| recorder.capture(&canvas).unwrap()).collect();
        assert_eq!(written, vec![true, false, false, true, false, false, true]);
        assert_eq!(recorder.frames(), 3);

        let bytes = recorder.finish().unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(bytes.last(), Some(&0x3B));
    }

    #[test]
    fn test_gif_rejects_resized_canvas() {
        let mut recorder = GifRecorder::new(Vec::new(), 10, 10, 1).unwrap();
        assert!(recorder.add_frame(&drawn_canvas()).is_err());
    }

    #[test]
    fn test_gif_rejects_oversized_canvas() {
        assert!(GifRecorder::new(Vec::new(), 70_000, 10, 1).is_err());
    }

    #[test]
    fn test_state_dump_is_json() {
        let dir = TempDir::new().unwrap();
        let path = timestamped_path(dir.path(), "state", "json");
        let field = GrowthField::new(PixelCanvas::new(40, 40, 1), GrowthSettings::default(), 2, Vec::new(), 3);
        dump_state(&field.snapshot(), &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["width"], 40);
        assert_eq!(value["lanes"].as_array().map(|l| l.len()), Some(2));
        assert_eq!(value["anchor_policy"], "PerLane");
    }
}
