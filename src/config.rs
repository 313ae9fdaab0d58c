use std::fs;
use std::path::{Path, PathBuf};

use egui::Color32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or saving the board configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Everything the host may tune. Missing fields fall back to their
/// defaults so older config files keep loading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub storage: StorageConfig,
    pub tools: ToolConfig,
    pub surface: SurfaceConfig,
    pub gallery: GalleryConfig,
}

impl BoardConfig {
    /// Loads a config file, or the defaults when there is none yet.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where saved drawings and the history index live
    pub directory: PathBuf,
    /// Name of the preferences file holding the index
    pub namespace: String,
    /// Key of the id set inside the preferences file
    pub index_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let directory = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(env!("CARGO_PKG_NAME"));
        Self {
            directory,
            namespace: "drawing_history".to_owned(),
            index_key: "history".to_owned(),
        }
    }
}

/// Range of a width slider and how its progress maps to a stroke width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthSliderConfig {
    pub min: i32,
    pub max: i32,
    /// Added to the slider progress to get the width in pixels
    pub width_offset: i32,
}

impl WidthSliderConfig {
    pub fn width_for(&self, progress: i32) -> f32 {
        (progress + self.width_offset) as f32
    }

    pub fn progress_for(&self, width: f32) -> i32 {
        (width.round() as i32 - self.width_offset).clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub brush_width: f32,
    /// Unmultiplied RGBA
    pub brush_color: [u8; 4],
    pub eraser_width: f32,
    pub brush_slider: WidthSliderConfig,
    pub eraser_slider: WidthSliderConfig,
    /// Unmultiplied RGBA presets offered by the color picker
    pub palette: Vec<[u8; 4]>,
}

impl ToolConfig {
    pub fn brush_color(&self) -> Color32 {
        let [r, g, b, a] = self.brush_color;
        Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    pub fn palette(&self) -> Vec<Color32> {
        self.palette
            .iter()
            .map(|&[r, g, b, a]| Color32::from_rgba_unmultiplied(r, g, b, a))
            .collect()
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            brush_width: 10.0,
            brush_color: [0, 0, 0, 255],
            eraser_width: 20.0,
            brush_slider: WidthSliderConfig {
                min: 0,
                max: 50,
                width_offset: 1,
            },
            eraser_slider: WidthSliderConfig {
                min: 0,
                max: 100,
                width_offset: 5,
            },
            palette: default_palette(),
        }
    }
}

fn default_palette() -> Vec<[u8; 4]> {
    [
        0x000000, 0xFF0000, 0x0000FF, 0x00FF00, 0xFFFF00, 0xFF00FF, 0x00FFFF, 0x888888, 0xFFFFFF,
        0xFF9800, 0x9C27B0, 0x4CAF50, 0xF44336, 0x2196F3, 0xFF5722, 0x607D8B, 0x795548, 0x9E9E9E,
    ]
    .into_iter()
    .map(|rgb: u32| {
        let [_, r, g, b] = rgb.to_be_bytes();
        [r, g, b, 255]
    })
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub anti_alias: bool,
    /// Canvases above this many pixels are refused instead of allocated
    pub max_pixels: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            anti_alias: true,
            max_pixels: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            thumbnail_width: 200,
            thumbnail_height: 200,
        }
    }
}
