//! Brush strategies: turn pointer input into previews and committed objects.

mod bitmap;
mod fill;
mod marker;
mod pattern;
mod pencil;
mod primitive;

pub use bitmap::BitmapBrush;
pub use fill::FillBrush;
pub use marker::MarkerBrush;
pub use pattern::PatternBrush;
pub use pencil::{ErasingRenderer, PencilBrush, SolidRenderer, StrokeRenderer};
pub use primitive::{CircleBrush, SprayBrush};

use crate::runtime::Assets;
use kurbo::Point;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stickerbook_core::config::is_builtin_brush;
use stickerbook_core::shapes::{ImageFormat, ImageShape, ObjectKind};
use stickerbook_core::{BrushConfig, CompositeMode, ConfigError, ConfigResult, DisplayObject, SerializableColor};
use stickerbook_render::{DrawingCanvas, RasterImage, Surface};

/// Everything a brush may touch while handling input.
pub struct BrushContext<'a> {
    pub canvas: &'a mut DrawingCanvas,
    pub assets: &'a mut Assets,
    /// The background as the user sees it, for erase previews.
    pub backdrop: &'a Surface,
}

/// Color and width set from outside the brush.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushStyle {
    pub color: SerializableColor,
    pub width: f64,
}

impl Default for BrushStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            width: 1.0,
        }
    }
}

/// A drawing tool driven by the pointer lifecycle.
///
/// `on_move` before `on_press` must be a no-op, and a second `on_press`
/// without a release starts a fresh stroke.
pub trait Strokeable {
    fn name(&self) -> &str;

    fn style(&self) -> BrushStyle;

    fn set_color(&mut self, color: SerializableColor);

    fn set_width(&mut self, width: f64);

    fn on_press(&mut self, ctx: &mut BrushContext<'_>, point: Point);

    fn on_move(&mut self, ctx: &mut BrushContext<'_>, point: Point);

    fn on_release(&mut self, ctx: &mut BrushContext<'_>);

    /// Called once per animation frame while [`Strokeable::wants_frame`] holds.
    fn on_frame(&mut self, _ctx: &mut BrushContext<'_>) {}

    fn wants_frame(&self) -> bool {
        false
    }

    /// Called after the host delivered images this brush may be waiting on.
    fn on_assets_ready(&mut self, _ctx: &mut BrushContext<'_>) {}

    /// Abandon any in-progress work; the brush is being replaced or a new
    /// stroke is starting elsewhere.
    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        ctx.canvas.clear_upper();
    }
}

impl fmt::Debug for dyn Strokeable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strokeable")
            .field("name", &self.name())
            .field("style", &self.style())
            .finish()
    }
}

/// Builds a brush from its configuration, requesting any images it needs.
pub type BrushFactory = Box<dyn Fn(&BrushConfig, &mut Assets) -> Box<dyn Strokeable>>;

/// Built-in brushes plus integrator-registered ones.
#[derive(Default)]
pub struct BrushRegistry {
    custom: HashMap<String, BrushFactory>,
}

impl fmt::Debug for BrushRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrushRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BrushRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named brush. Built-in names and the empty name are rejected.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn(&BrushConfig, &mut Assets) -> Box<dyn Strokeable> + 'static,
    ) -> ConfigResult<()> {
        if name.is_empty() || is_builtin_brush(name) {
            return Err(ConfigError::InvalidCustomBrush(name.to_string()));
        }
        self.custom.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        is_builtin_brush(name) || self.custom.contains_key(name)
    }

    pub fn custom_names(&self) -> Vec<&str> {
        self.custom.keys().map(String::as_str).collect()
    }

    /// Validate `config` for `name` and build the brush.
    pub fn create(&self, name: &str, config: &BrushConfig, assets: &mut Assets) -> ConfigResult<Box<dyn Strokeable>> {
        config.validate_for(name)?;
        let brush: Box<dyn Strokeable> = match name {
            "pencil" => Box::new(PencilBrush::pencil()),
            "eraser" => Box::new(PencilBrush::eraser()),
            "marker" => Box::new(MarkerBrush::new()),
            "circle" => Box::new(CircleBrush::new()),
            "spray" => Box::new(SprayBrush::new()),
            "pattern" => Box::new(PatternBrush::new(&config.images, assets)),
            "bitmap" | "bitmap-eraser" => {
                let url = config.image.as_deref().unwrap_or_default();
                Box::new(BitmapBrush::new(url, name == "bitmap-eraser", assets))
            }
            "fill" => Box::new(FillBrush::new(config)),
            other => match self.custom.get(other) {
                Some(factory) => factory(config, assets),
                None => return Err(ConfigError::UnknownBrush(other.to_string())),
            },
        };
        Ok(brush)
    }
}

/// Add a finished stroke to the display list and clear the preview.
pub(crate) fn commit(ctx: &mut BrushContext<'_>, object: DisplayObject) -> usize {
    ctx.canvas.clear_upper();
    let index = ctx.canvas.add(object);
    log::debug!("Committed stroke as object {index}");
    index
}

/// Commit a raster as a full-canvas, non-selectable image object.
pub(crate) fn commit_raster(ctx: &mut BrushContext<'_>, raster: RasterImage, mode: CompositeMode) -> Option<usize> {
    let png = match stickerbook_render::encode_png(&raster.to_rgba(), raster.width(), raster.height()) {
        Ok(png) => png,
        Err(e) => {
            log::error!("Dropping stroke that could not be encoded: {e}");
            ctx.canvas.clear_upper();
            return None;
        }
    };
    let shape = ImageShape::new(&png, raster.width(), raster.height(), ImageFormat::Png);
    ctx.canvas.cache_image(&shape, Arc::new(raster));

    let mut object = DisplayObject::new(ObjectKind::Image(shape));
    object.lock();
    object.presentation_mut().composite = mode;
    Some(commit(ctx, object))
}


#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(BrushStyle);

    impl Strokeable for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        fn style(&self) -> BrushStyle {
            self.0
        }
        fn set_color(&mut self, color: SerializableColor) {
            self.0.color = color;
        }
        fn set_width(&mut self, width: f64) {
            self.0.width = width;
        }
        fn on_press(&mut self, _ctx: &mut BrushContext<'_>, _point: Point) {}
        fn on_move(&mut self, _ctx: &mut BrushContext<'_>, _point: Point) {}
        fn on_release(&mut self, _ctx: &mut BrushContext<'_>) {}
    }

    #[test]
    fn test_registry_builtins() {
        let registry = BrushRegistry::new();
        let mut assets = Assets::new();
        for name in stickerbook_core::BUILTIN_BRUSHES {
            let config = match name {
                "pattern" => BrushConfig::pattern(["p.png"]),
                "bitmap" | "bitmap-eraser" => BrushConfig::bitmap("b.png"),
                _ => BrushConfig::default(),
            };
            let brush = registry.create(name, &config, &mut assets).unwrap();
            assert_eq!(brush.name(), name);
        }
        assert!(matches!(
            registry.create("crayon", &BrushConfig::default(), &mut assets),
            Err(ConfigError::UnknownBrush(_))
        ));
    }

    #[test]
    fn test_registry_rejects_bad_config() {
        let registry = BrushRegistry::new();
        let mut assets = Assets::new();
        assert!(matches!(
            registry.create("pattern", &BrushConfig::default(), &mut assets),
            Err(ConfigError::InvalidBrushConfig { .. })
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = BrushRegistry::new();
        registry
            .register("noop", |_, _| Box::new(Noop(BrushStyle::default())))
            .unwrap();
        assert!(registry.contains("noop"));
        let clash = registry.register("pencil", |_, _| Box::new(Noop(BrushStyle::default())));
        assert!(matches!(clash, Err(ConfigError::InvalidCustomBrush(_))));
        assert!(registry.register("", |_, _| Box::new(Noop(BrushStyle::default()))).is_err());

        let mut assets = Assets::new();
        let brush = registry.create("noop", &BrushConfig::default(), &mut assets).unwrap();
        assert_eq!(brush.name(), "noop");
    }
}
