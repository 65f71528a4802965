//! Subtitle styling and editor settings.

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::timeline::ChunkTiming;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl RgbaColor {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// `rgba(r,g,b,a)` with alpha clamped to `[0, 1]`.
    pub fn css(&self) -> String {
        let alpha = if self.a.is_finite() {
            self.a.clamp(0.0, 1.0)
        } else {
            1.0
        };
        format!("rgba({},{},{},{})", self.r, self.g, self.b, alpha)
    }
}

/// Accepts `r,g,b`, `r,g,b,a` or the same list wrapped in `rgba(...)`.
impl FromStr for RgbaColor {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let inner = trimmed
            .strip_prefix("rgba(")
            .or_else(|| trimmed.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if !(3..=4).contains(&parts.len()) {
            bail!("expected r,g,b or r,g,b,a but got '{}'", value);
        }

        let channel = |part: &str| {
            part.parse::<u8>()
                .with_context(|| format!("invalid color channel '{}' in '{}'", part, value))
        };
        let a = match parts.get(3) {
            Some(alpha) => alpha
                .parse::<f32>()
                .ok()
                .filter(|a| (0.0..=1.0).contains(a))
                .with_context(|| format!("alpha must be between 0 and 1 in '{}'", value))?,
            None => 1.0,
        };
        Ok(Self::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, a))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl std::fmt::Display for TextAlign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextAlign::Left => write!(f, "left"),
            TextAlign::Center => write!(f, "center"),
            TextAlign::Right => write!(f, "right"),
        }
    }
}

impl FromStr for TextAlign {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(TextAlign::Left),
            "center" => Ok(TextAlign::Center),
            "right" => Ok(TextAlign::Right),
            other => bail!("unknown text alignment '{}' (left, center or right)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub color: RgbaColor,
    pub text_align: TextAlign,
    pub background_color: Option<RgbaColor>,
    pub border_radius: Option<u32>,
    pub padding: Option<u32>,
    pub margin: Option<u32>,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            font_family: "Inter".to_string(),
            font_size: "16".to_string(),
            font_weight: "500".to_string(),
            color: RgbaColor::new(255, 255, 255, 1.0),
            text_align: TextAlign::Center,
            background_color: Some(RgbaColor::new(0, 0, 0, 0.8)),
            border_radius: Some(8),
            padding: Some(12),
            margin: Some(4),
        }
    }
}

impl StyleSettings {
    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(font_family) = &patch.font_family {
            self.font_family = font_family.clone();
        }
        if let Some(font_size) = &patch.font_size {
            self.font_size = font_size.clone();
        }
        if let Some(font_weight) = &patch.font_weight {
            self.font_weight = font_weight.clone();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(text_align) = patch.text_align {
            self.text_align = text_align;
        }
        if let Some(background_color) = patch.background_color {
            self.background_color = Some(background_color);
        }
        if let Some(border_radius) = patch.border_radius {
            self.border_radius = Some(border_radius);
        }
        if let Some(padding) = patch.padding {
            self.padding = Some(padding);
        }
        if let Some(margin) = patch.margin {
            self.margin = Some(margin);
        }
    }

    pub fn patched(&self, patch: &StylePatch) -> Self {
        let mut style = self.clone();
        style.apply(patch);
        style
    }
}

/// Partial style update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub color: Option<RgbaColor>,
    pub text_align: Option<TextAlign>,
    pub background_color: Option<RgbaColor>,
    pub border_radius: Option<u32>,
    pub padding: Option<u32>,
    pub margin: Option<u32>,
}

pub const DEFAULT_WORDS_PER_SUBTITLE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub words_per_subtitle: usize,
    pub chunk_timing: ChunkTiming,
    pub auto_save: bool,
    pub preview_mode: bool,
    pub show_timestamps: bool,
    pub snap_to_grid: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            words_per_subtitle: DEFAULT_WORDS_PER_SUBTITLE,
            chunk_timing: ChunkTiming::Uniform,
            auto_save: true,
            preview_mode: false,
            show_timestamps: true,
            snap_to_grid: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub words_per_subtitle: Option<usize>,
    pub chunk_timing: Option<ChunkTiming>,
    pub auto_save: Option<bool>,
    pub preview_mode: Option<bool>,
    pub show_timestamps: Option<bool>,
    pub snap_to_grid: Option<bool>,
}

impl SettingsPatch {
    pub fn words(words_per_subtitle: usize) -> Self {
        Self {
            words_per_subtitle: Some(words_per_subtitle),
            ..Self::default()
        }
    }
}
