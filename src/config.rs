use crate::color::ColorScheme;
use crate::settings::GrowthSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// All growth settings
    pub settings: GrowthSettings,
    /// Palette (app-level)
    pub color_scheme: ColorScheme,
    /// Concurrent lanes
    pub parallel: usize,
    /// RNG seed; `None` picks a fresh one per run
    #[serde(default)]
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Import config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            settings: GrowthSettings::default(),
            color_scheme: ColorScheme::default(),
            parallel: 3,
            seed: None,
        }
    }
}
