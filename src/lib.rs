//! Generative line growth: random-walk lines packed onto a canvas until
//! no blank room is left.

pub mod braille;
pub mod canvas;
pub mod color;
pub mod config;
pub mod export;
pub mod field;
pub mod geometry;
pub mod presets;
pub mod settings;
pub mod walk;

pub use canvas::{PixelCanvas, Surface};
pub use color::{ColorScheme, MixSpace, PaletteSort, Rgba};
pub use field::{AnchorPolicy, GrowthField, StateView};
pub use settings::GrowthSettings;
