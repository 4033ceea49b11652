//! Preferences document
//!
//! JSON file shared with the preferences subsystem. Only the fields the
//! window engine needs are modelled here; saving geometry rewrites the
//! `window` record alone (see [`crate::geometry::GeometryStore`]).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::geometry::{lenient_record, GeometryRecord};
use crate::interaction::{InteractionConfig, OpacityLevel};
use crate::types::Size;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_always_on_top")]
    pub always_on_top: bool,

    /// Border width (pixels) that starts a resize instead of a drag
    #[serde(default = "default_edge_margin")]
    pub edge_margin: i32,

    #[serde(default = "default_min_width")]
    pub min_width: i32,
    #[serde(default = "default_min_height")]
    pub min_height: i32,

    /// Size used when no geometry is stored
    #[serde(default = "default_width")]
    pub default_width: i32,
    #[serde(default = "default_height")]
    pub default_height: i32,

    /// Window background, `RRGGBB` with optional `#`
    #[serde(default = "default_background_color")]
    pub background_color: String,

    #[serde(default)]
    pub opacity: OpacitySettings,

    #[serde(default, deserialize_with = "lenient_record")]
    pub window: GeometryRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpacitySettings {
    #[serde(default = "default_normal_percent")]
    pub normal_percent: u8,
    #[serde(default = "default_hover_percent")]
    pub hover_percent: u8,
    #[serde(default = "default_active_percent")]
    pub active_percent: u8,
}

fn default_always_on_top() -> bool {
    true
}

fn default_edge_margin() -> i32 {
    6
}

fn default_min_width() -> i32 {
    220
}

fn default_min_height() -> i32 {
    120
}

fn default_width() -> i32 {
    420
}

fn default_height() -> i32 {
    300
}

fn default_background_color() -> String {
    "#202124".to_string()
}

fn default_normal_percent() -> u8 {
    85
}

fn default_hover_percent() -> u8 {
    95
}

fn default_active_percent() -> u8 {
    100
}

impl Default for OpacitySettings {
    fn default() -> Self {
        Self {
            normal_percent: default_normal_percent(),
            hover_percent: default_hover_percent(),
            active_percent: default_active_percent(),
        }
    }
}

impl OpacitySettings {
    pub fn percent(&self, level: OpacityLevel) -> u8 {
        match level {
            OpacityLevel::Normal => self.normal_percent,
            OpacityLevel::Hover => self.hover_percent,
            OpacityLevel::Active => self.active_percent,
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            always_on_top: default_always_on_top(),
            edge_margin: default_edge_margin(),
            min_width: default_min_width(),
            min_height: default_min_height(),
            default_width: default_width(),
            default_height: default_height(),
            background_color: default_background_color(),
            opacity: OpacitySettings::default(),
            window: GeometryRecord::default(),
        }
    }
}

impl Preferences {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load from `path`. A missing or unparseable document yields defaults.
    pub fn load(path: &Path) -> Self {
        let mut prefs = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Preferences>(&contents) {
                Ok(prefs) => {
                    info!(path = %path.display(), "Loaded preferences");
                    prefs
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to parse preferences, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                info!(path = %path.display(), error = %e, "No preferences file, using defaults");
                Self::default()
            }
        };
        prefs.validate_and_clamp();
        prefs
    }

    /// Clamp values to safe ranges, warning about every correction
    fn validate_and_clamp(&mut self) {
        use crate::constants::config::*;

        for (name, percent) in [
            ("normal_percent", &mut self.opacity.normal_percent),
            ("hover_percent", &mut self.opacity.hover_percent),
            ("active_percent", &mut self.opacity.active_percent),
        ] {
            if *percent > MAX_PERCENT {
                warn!(field = name, value = *percent, "Opacity exceeds 100, clamping");
                *percent = MAX_PERCENT;
            }
        }

        if !(MIN_EDGE_MARGIN..=MAX_EDGE_MARGIN).contains(&self.edge_margin) {
            let clamped = self.edge_margin.clamp(MIN_EDGE_MARGIN, MAX_EDGE_MARGIN);
            warn!(edge_margin = self.edge_margin, using = clamped, "edge_margin out of range, clamping");
            self.edge_margin = clamped;
        }

        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&self.min_width) {
            let clamped = self.min_width.clamp(MIN_DIMENSION, MAX_DIMENSION);
            warn!(min_width = self.min_width, using = clamped, "min_width out of range, clamping");
            self.min_width = clamped;
        }

        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&self.min_height) {
            let clamped = self.min_height.clamp(MIN_DIMENSION, MAX_DIMENSION);
            warn!(min_height = self.min_height, using = clamped, "min_height out of range, clamping");
            self.min_height = clamped;
        }

        if self.default_width < self.min_width {
            warn!(default_width = self.default_width, min = self.min_width, "default_width below minimum, raising");
            self.default_width = self.min_width;
        } else if self.default_width > MAX_DIMENSION {
            warn!(default_width = self.default_width, max = MAX_DIMENSION, "default_width exceeds maximum, clamping");
            self.default_width = MAX_DIMENSION;
        }

        if self.default_height < self.min_height {
            warn!(default_height = self.default_height, min = self.min_height, "default_height below minimum, raising");
            self.default_height = self.min_height;
        } else if self.default_height > MAX_DIMENSION {
            warn!(default_height = self.default_height, max = MAX_DIMENSION, "default_height exceeds maximum, clamping");
            self.default_height = MAX_DIMENSION;
        }

        if parse_rgb(&self.background_color).is_none() {
            error!(background_color = %self.background_color, "Invalid background_color hex, using default");
            self.background_color = default_background_color();
        }
    }

    pub fn min_size(&self) -> Size {
        Size::new(self.min_width, self.min_height)
    }

    pub fn default_size(&self) -> Size {
        Size::new(self.default_width, self.default_height)
    }

    pub fn interaction_config(&self) -> InteractionConfig {
        InteractionConfig {
            edge_margin: self.edge_margin,
            min_size: self.min_size(),
        }
    }

    /// Background as a 24-bit `0xRRGGBB` pixel value
    pub fn background_pixel(&self) -> u32 {
        parse_rgb(&self.background_color).unwrap_or(0x20_21_24)
    }
}

/// Parse `RRGGBB` (optional leading `#`)
fn parse_rgb(hex: &str) -> Option<u32> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
