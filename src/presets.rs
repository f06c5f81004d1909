use crate::color::{ColorScheme, MixSpace, PaletteSort};
use crate::config::AppConfig;
use crate::settings::{
    ColorPattern, ColorSettings, GrowthSettings, LengthSettings, NewPixelMethod, RedrawSettings,
    ShadowSettings, WiggleDir, WiggleSettings,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named preset containing growth settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub settings: GrowthSettings,
    pub color_scheme: ColorScheme,
    pub parallel: usize,
}

impl Preset {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        settings: GrowthSettings,
        color_scheme: ColorScheme,
        parallel: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            settings,
            color_scheme,
            parallel,
        }
    }

    /// Config that runs this preset, keeping `seed`
    pub fn to_config(&self, seed: Option<u64>) -> AppConfig {
        AppConfig {
            version: 1,
            settings: self.settings.clone(),
            color_scheme: self.color_scheme,
            parallel: self.parallel,
            seed,
        }
    }
}

/// Keep only characters that are safe in a file name
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Manager for loading and saving presets
pub struct PresetManager {
    /// Built-in presets that ship with the app
    pub builtin: Vec<Preset>,
    /// User-created presets loaded from disk
    pub user: Vec<Preset>,
    dir: Option<PathBuf>,
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetManager {
    /// Built-ins plus user presets from the platform config directory
    pub fn new() -> Self {
        Self::with_dir(Self::default_dir())
    }

    /// Built-ins plus user presets from `dir`
    pub fn with_dir(dir: Option<PathBuf>) -> Self {
        let mut manager = Self {
            builtin: builtin_presets(),
            user: Vec::new(),
            dir,
        };
        manager.load_user_presets();
        manager
    }

    fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("line-growth").join("presets"))
    }

    fn load_user_presets(&mut self) {
        let Some(dir) = self.dir.as_deref() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match Self::read_preset(&path) {
                Ok(preset) => self.user.push(preset),
                Err(err) => tracing::warn!(path = %path.display(), "skipping preset: {:#}", err),
            }
        }
        self.user.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn read_preset(path: &Path) -> Result<Preset> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a preset to disk
    pub fn save_preset(&mut self, preset: Preset) -> Result<PathBuf> {
        let dir = self.dir.as_deref().context("Could not determine config directory")?;
        fs::create_dir_all(dir).context("Failed to create presets directory")?;

        let path = dir.join(format!("{}.json", sanitize_filename(&preset.name)));
        let json = serde_json::to_string_pretty(&preset).context("Failed to serialize preset")?;
        fs::write(&path, json).with_context(|| format!("Failed to write preset file {}", path.display()))?;

        match self.user.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.user.push(preset),
        }
        Ok(path)
    }

    /// Delete a user preset
    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        let dir = self.dir.as_deref().context("Could not determine config directory")?;
        self.user.retain(|p| p.name != name);

        let path = dir.join(format!("{}.json", sanitize_filename(name)));
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to delete preset file {}", path.display()))?;
        }
        Ok(())
    }

    /// Get all presets (builtin + user)
    pub fn all_presets(&self) -> impl Iterator<Item = &Preset> {
        self.builtin.iter().chain(self.user.iter())
    }

    /// Find a preset by name
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.all_presets().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Get preset names for display
    pub fn preset_names(&self) -> Vec<&str> {
        self.all_presets().map(|p| p.name.as_str()).collect()
    }
}

fn builtin_presets() -> Vec<Preset> {
    let base = GrowthSettings::default();
    vec![
        Preset::new("Classic", "Default settings", base.clone(), ColorScheme::Ink, 3),
        // Long, nearly straight strands that all lean the same way
        Preset::new(
            "Combed",
            "Long parallel strands with a slow clockwise turn",
            GrowthSettings {
                wiggle: WiggleSettings {
                    within_line: 0.05,
                    max: Some(0.15),
                    between_line: 0.15,
                    n_lines: 40,
                    dir: WiggleDir::Clockwise,
                },
                len: LengthSettings {
                    max: 800,
                    min_start: 120,
                    ..base.len
                },
                ..base.clone()
            },
            ColorScheme::Ocean,
            4,
        ),
        Preset::new(
            "Scribble",
            "Short nervous lines packed tightly",
            GrowthSettings {
                wiggle: WiggleSettings {
                    within_line: 0.6,
                    between_line: 1.2,
                    n_lines: 5,
                    ..base.wiggle
                },
                len: LengthSettings {
                    max: 120,
                    min_start: 25,
                    min_end: 4,
                    ..base.len
                },
                new_pixel_method: NewPixelMethod::Anywhere,
                ..base.clone()
            },
            ColorScheme::Neon,
            6,
        ),
        Preset::new(
            "Ember Flow",
            "Length-colored lines with redraws of the longest strands",
            GrowthSettings {
                colors: ColorSettings {
                    pattern: ColorPattern::Length,
                    sort: PaletteSort::Lightness,
                    ..base.colors
                },
                redraw: Some(RedrawSettings::default()),
                ..base.clone()
            },
            ColorScheme::Ember,
            3,
        ),
        Preset::new(
            "Woven",
            "Shared anchor with square seeding and drop shadows",
            GrowthSettings {
                new_pixel_method: NewPixelMethod::Square,
                new_pixel_radius: 25.0,
                look_point_share: true,
                shadow: Some(ShadowSettings::default()),
                stroke_weight: 1.5,
                ..base.clone()
            },
            ColorScheme::Forest,
            5,
        ),
        Preset::new(
            "Graphite",
            "Single lane, fast color steps mixed in RGB",
            GrowthSettings {
                step_rate: 1200.0,
                colors: ColorSettings {
                    step_move: 0.1,
                    mix_space: MixSpace::Rgb,
                    ..base.colors
                },
                ..base
            },
            ColorScheme::Mono,
            1,
        ),
    ]
}
