//! Widget configuration, as supplied by integrators in JSON.

use crate::error::{ConfigError, ConfigResult};
use crate::shapes::SerializableColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names of the brushes every widget knows about.
pub const BUILTIN_BRUSHES: [&str; 9] = [
    "bitmap",
    "bitmap-eraser",
    "circle",
    "eraser",
    "marker",
    "pattern",
    "pencil",
    "spray",
    "fill",
];

pub fn is_builtin_brush(name: &str) -> bool {
    BUILTIN_BRUSHES.contains(&name)
}

/// Top-level widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerbookConfig {
    pub brush: BrushSettings,
    pub stickers: StickerSettings,
    #[serde(default)]
    pub background: BackgroundSettings,
    #[serde(default = "default_true")]
    pub mobile_enabled: bool,
    #[serde(default)]
    pub use_default_event_handlers: bool,
    /// CSS color of the element hosting the canvas; seen through transparent
    /// background pixels.
    #[serde(default)]
    pub container_background: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Allow-lists for brush selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushSettings {
    pub enabled: Vec<String>,
    pub widths: Vec<f64>,
    /// Hex colors.
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerSettings {
    /// Sticker image URLs.
    pub enabled: Vec<String>,
    #[serde(default)]
    pub controls: Option<StickerControls>,
    #[serde(default)]
    pub defaults: Option<StickerDefaults>,
}

/// Handle styling applied to placed stickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerControls {
    pub corner_color: String,
    pub corner_size: f64,
    #[serde(default = "default_true")]
    pub has_borders: bool,
}

/// Fallbacks for options omitted from a sticker placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerDefaults {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub x_scale: Option<f64>,
    pub y_scale: Option<f64>,
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSettings {
    /// Background image URLs.
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub positioning: BackgroundPositioning,
}

/// How the background image is fitted into the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundPositioning {
    /// Natural size at the top-left corner.
    #[default]
    Default,
    FitWidth,
    /// Like `FitWidth`, but frozen after the first render.
    FitWidthNoRescale,
    FitHeight,
    /// Like `FitHeight`, but frozen after the first render.
    FitHeightNoRescale,
}

impl BackgroundPositioning {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundPositioning::Default => "default",
            BackgroundPositioning::FitWidth => "fit-width",
            BackgroundPositioning::FitWidthNoRescale => "fit-width-no-rescale",
            BackgroundPositioning::FitHeight => "fit-height",
            BackgroundPositioning::FitHeightNoRescale => "fit-height-no-rescale",
        }
    }

    /// Whether the placement from the first render is kept across resizes.
    pub fn is_frozen(&self) -> bool {
        matches!(
            self,
            BackgroundPositioning::FitWidthNoRescale | BackgroundPositioning::FitHeightNoRescale
        )
    }
}

impl fmt::Display for BackgroundPositioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackgroundPositioning {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(BackgroundPositioning::Default),
            "fit-width" => Ok(BackgroundPositioning::FitWidth),
            "fit-width-no-rescale" => Ok(BackgroundPositioning::FitWidthNoRescale),
            "fit-height" => Ok(BackgroundPositioning::FitHeight),
            "fit-height-no-rescale" => Ok(BackgroundPositioning::FitHeightNoRescale),
            other => Err(ConfigError::invalid("background positioning", other)),
        }
    }
}

impl StickerbookConfig {
    /// Parse a JSON configuration and check it against the built-in brushes.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Self::from_json_with_custom(json, &[])
    }

    /// Parse, accepting `custom_brushes` in `brush.enabled`.
    pub fn from_json_with_custom(json: &str, custom_brushes: &[&str]) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate_with_custom(custom_brushes)?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate against the built-in brushes only.
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_with_custom(&[])
    }

    /// Validate, treating `custom_brushes` as known brush names too.
    pub fn validate_with_custom(&self, custom_brushes: &[&str]) -> ConfigResult<()> {
        let brush = &self.brush;
        if brush.enabled.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "brush.enabled",
                reason: "must not be empty".to_string(),
            });
        }
        if brush.widths.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "brush.widths",
                reason: "must not be empty".to_string(),
            });
        }
        if brush.colors.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "brush.colors",
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(name) = brush
            .enabled
            .iter()
            .find(|name| !is_builtin_brush(name) && !custom_brushes.contains(&name.as_str()))
        {
            return Err(ConfigError::UnknownBrush(name.clone()));
        }
        if let Some(width) = brush.widths.iter().find(|w| !w.is_finite() || **w <= 0.0) {
            return Err(ConfigError::invalid("brush width", width));
        }
        if let Some(color) = brush.colors.iter().find(|c| SerializableColor::from_hex(c).is_none()) {
            return Err(ConfigError::invalid("color", color));
        }

        if let Some(controls) = &self.stickers.controls {
            if controls.corner_size < 0.0 {
                return Err(ConfigError::InvalidField {
                    field: "stickers.controls.cornerSize",
                    reason: format!("must not be negative, got {}", controls.corner_size),
                });
            }
            if SerializableColor::from_hex(&controls.corner_color).is_none() {
                return Err(ConfigError::invalid("corner color", &controls.corner_color));
            }
        }

        if let Some(default) = &self.background.default {
            if !self.background.enabled.contains(default) {
                return Err(ConfigError::invalid("background", default));
            }
        }
        Ok(())
    }
}

/// Per-brush options passed along with a brush selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushConfig {
    /// Stamp images for the pattern brush, cycled in order.
    #[serde(default)]
    pub images: Vec<String>,
    /// Source image for the bitmap brushes.
    #[serde(default)]
    pub image: Option<String>,
    /// Compute fills across animation frames instead of at once.
    #[serde(default)]
    pub is_async: bool,
    #[serde(default = "default_steps_per_frame")]
    pub steps_per_frame: usize,
    /// Commit a partially computed fill on release instead of waiting.
    #[serde(default = "default_true")]
    pub partial_fill: bool,
}

fn default_steps_per_frame() -> usize {
    5
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            image: None,
            is_async: false,
            steps_per_frame: default_steps_per_frame(),
            partial_fill: true,
        }
    }
}

impl BrushConfig {
    pub fn pattern(images: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            images: images.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn bitmap(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            ..Self::default()
        }
    }

    pub fn fill(is_async: bool, steps_per_frame: usize, partial_fill: bool) -> Self {
        Self {
            is_async,
            steps_per_frame,
            partial_fill,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the options required by `brush`.
    pub fn validate_for(&self, brush: &str) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidBrushConfig {
            brush: brush.to_string(),
            reason: reason.to_string(),
        };
        match brush {
            "pattern" if self.images.is_empty() => Err(invalid("images must not be empty")),
            "pattern" if self.images.iter().any(|url| url.is_empty()) => {
                Err(invalid("images must be non-empty URLs"))
            }
            "bitmap" | "bitmap-eraser" if self.image.as_deref().is_none_or(str::is_empty) => {
                Err(invalid("image is required"))
            }
            "fill" if self.steps_per_frame == 0 => Err(invalid("stepsPerFrame must be at least 1")),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r##"{
        "brush": {
            "enabled": ["pencil", "fill"],
            "widths": [1, 5, 10],
            "colors": ["#0000FF", "#FF0000"]
        },
        "stickers": { "enabled": ["sticker.png"] }
    }"##;

    #[test]
    fn test_defaults_applied() {
        let config = StickerbookConfig::from_json(MINIMAL).unwrap();
        assert!(config.mobile_enabled);
        assert!(!config.use_default_event_handlers);
        assert!(config.background.enabled.is_empty());
        assert_eq!(config.background.default, None);
        assert_eq!(config.background.positioning, BackgroundPositioning::Default);
        assert_eq!(config.brush.widths, vec![1.0, 5.0, 10.0]);
    }

    #[test]
    fn test_full_config() {
        let json = r##"{
            "brush": { "enabled": ["marker"], "widths": [3], "colors": ["#000"] },
            "stickers": {
                "enabled": ["a.png"],
                "controls": { "cornerColor": "#ff00ff", "cornerSize": 20 },
                "defaults": { "x": 10, "y": 20, "xScale": 0.5 }
            },
            "background": {
                "enabled": ["bg.png"],
                "default": "bg.png",
                "positioning": "fit-height-no-rescale"
            },
            "mobileEnabled": false,
            "useDefaultEventHandlers": true,
            "containerBackground": "rgba(0, 0, 0, 0.5)"
        }"##;
        let config = StickerbookConfig::from_json(json).unwrap();
        let controls = config.stickers.controls.as_ref().unwrap();
        assert!(controls.has_borders);
        assert_eq!(controls.corner_size, 20.0);
        let defaults = config.stickers.defaults.as_ref().unwrap();
        assert_eq!(defaults.x_scale, Some(0.5));
        assert_eq!(defaults.rotation, None);
        assert_eq!(config.background.positioning, BackgroundPositioning::FitHeightNoRescale);
        assert!(!config.mobile_enabled);
        assert!(config.use_default_event_handlers);
    }

    #[test]
    fn test_missing_section_is_malformed() {
        let err = StickerbookConfig::from_json(r#"{ "stickers": { "enabled": [] } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_unknown_brush_rejected() {
        let mut config = StickerbookConfig::from_json(MINIMAL).unwrap();
        config.brush.enabled.push("crayon".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::UnknownBrush(name)) if name == "crayon"));
        assert!(config.validate_with_custom(&["crayon"]).is_ok());
    }

    #[test]
    fn test_custom_brush_accepted_when_parsing() {
        let json = MINIMAL.replace(r#"["pencil", "fill"]"#, r#"["pencil", "crayon"]"#);
        assert!(matches!(StickerbookConfig::from_json(&json), Err(ConfigError::UnknownBrush(_))));
        let config = StickerbookConfig::from_json_with_custom(&json, &["crayon"]).unwrap();
        assert_eq!(config.brush.enabled, ["pencil", "crayon"]);
    }

    #[test]
    fn test_invalid_values_are_named() {
        let mut config = StickerbookConfig::from_json(MINIMAL).unwrap();
        config.brush.colors.push("blue".to_string());
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "blue is not a permitted color");

        let mut config = StickerbookConfig::from_json(MINIMAL).unwrap();
        config.brush.widths.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField { field: "brush.widths", .. })
        ));

        let mut config = StickerbookConfig::from_json(MINIMAL).unwrap();
        config.background.default = Some("missing.png".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_positioning_parse() {
        assert_eq!(
            "fit-width-no-rescale".parse::<BackgroundPositioning>().unwrap(),
            BackgroundPositioning::FitWidthNoRescale
        );
        assert!(BackgroundPositioning::FitHeightNoRescale.is_frozen());
        assert!(!BackgroundPositioning::FitHeight.is_frozen());
        let err = "stretch".parse::<BackgroundPositioning>().unwrap_err();
        assert_eq!(err.to_string(), "stretch is not a permitted background positioning");
    }

    #[test]
    fn test_brush_config_validation() {
        assert!(BrushConfig::default().validate_for("pattern").is_err());
        assert!(BrushConfig::pattern(["a.png"]).validate_for("pattern").is_ok());
        assert!(BrushConfig::default().validate_for("bitmap-eraser").is_err());
        assert!(BrushConfig::bitmap("b.png").validate_for("bitmap").is_ok());
        assert!(BrushConfig::fill(true, 0, true).validate_for("fill").is_err());
        assert!(BrushConfig::default().validate_for("pencil").is_ok());
    }

    #[test]
    fn test_brush_config_json_defaults() {
        let config = BrushConfig::from_json(r#"{ "isAsync": true }"#).unwrap();
        assert!(config.is_async);
        assert_eq!(config.steps_per_frame, 5);
        assert!(config.partial_fill);
    }
}
