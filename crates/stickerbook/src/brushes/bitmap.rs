//! Bitmap brush and bitmap eraser: stamp a recolored image at every move.

use super::{BrushContext, BrushStyle, Strokeable, commit_raster};
use crate::runtime::{Assets, LoadedImage};
use kurbo::{Affine, Point};
use std::sync::Arc;
use stickerbook_core::{CompositeMode, SerializableColor};
use stickerbook_render::{RasterImage, Surface};
use tiny_skia::BlendMode;

#[derive(Debug, Clone)]
pub struct BitmapBrush {
    style: BrushStyle,
    url: String,
    erasing: bool,
    source: Option<Arc<LoadedImage>>,
    /// The source recolored for `bitmap_color`.
    bitmap: Option<RasterImage>,
    bitmap_color: Option<SerializableColor>,
    aspect_ratio: f64,
    /// Accumulated stamps for the eraser, drawn as a mask over the backdrop.
    mask: Option<Surface>,
    pressed: bool,
}

impl BitmapBrush {
    /// Create the brush and start loading its source image.
    pub fn new(url: &str, erasing: bool, assets: &mut Assets) -> Self {
        let mut brush = Self {
            style: BrushStyle::default(),
            url: url.to_string(),
            erasing,
            source: None,
            bitmap: None,
            bitmap_color: None,
            aspect_ratio: 1.0,
            mask: None,
            pressed: false,
        };
        brush.source = assets.request(url);
        brush.on_source_loaded();
        brush
    }

    /// Width over height of the loaded source image; 1 until it loads.
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn on_source_loaded(&mut self) {
        if let Some(source) = &self.source {
            self.aspect_ratio = source.raster.aspect_ratio();
        }
    }

    fn stamp_color(&self) -> SerializableColor {
        if self.erasing {
            SerializableColor::white()
        } else {
            self.style.color
        }
    }

    /// Recolor the source once per color change.
    fn ensure_bitmap(&mut self) -> bool {
        let Some(source) = &self.source else {
            return false;
        };
        let color = self.stamp_color();
        if self.bitmap_color != Some(color) {
            self.bitmap = Some(source.raster.recolored(color));
            self.bitmap_color = Some(color);
        }
        self.bitmap.is_some()
    }

    fn stamp_transform(&self, image: &RasterImage, point: Point) -> Affine {
        let draw_width = self.style.width * 2.0;
        let draw_height = self.style.width / self.aspect_ratio * 2.0;
        let x = point.x - draw_width / 2.0;
        let y = point.y - draw_height / 2.0;
        Affine::translate((x, y))
            * Affine::scale_non_uniform(
                draw_width / f64::from(image.width()),
                draw_height / f64::from(image.height()),
            )
    }

    fn stamp(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        if !self.ensure_bitmap() {
            return;
        }
        let Some(bitmap) = &self.bitmap else {
            return;
        };
        let transform = self.stamp_transform(bitmap, point);

        if !self.erasing {
            ctx.canvas
                .upper_mut()
                .draw_raster(bitmap, transform, CompositeMode::SourceOver);
            return;
        }

        let (width, height) = (ctx.canvas.width(), ctx.canvas.height());
        if self.mask.as_ref().map(|m| (m.width(), m.height())) != Some((width, height)) {
            match Surface::new(width, height) {
                Ok(mask) => self.mask = Some(mask),
                Err(e) => {
                    log::warn!("Bitmap eraser could not allocate its mask: {e}");
                    return;
                }
            }
        }
        let Some(mask) = self.mask.as_mut() else {
            return;
        };
        mask.draw_raster(bitmap, transform, CompositeMode::SourceOver);

        let upper = ctx.canvas.upper_mut();
        upper.clear();
        upper.draw_surface(ctx.backdrop, BlendMode::SourceOver);
        upper.draw_surface(mask, BlendMode::DestinationIn);
    }
}

impl Strokeable for BitmapBrush {
    fn name(&self) -> &str {
        if self.erasing { "bitmap-eraser" } else { "bitmap" }
    }

    fn style(&self) -> BrushStyle {
        self.style
    }

    fn set_color(&mut self, color: SerializableColor) {
        self.style.color = color;
    }

    fn set_width(&mut self, width: f64) {
        self.style.width = width;
    }

    fn on_press(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        ctx.canvas.clear_upper();
        if let Some(mask) = self.mask.as_mut() {
            mask.clear();
        }
        self.pressed = true;
        self.stamp(ctx, point);
    }

    fn on_move(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        if self.pressed {
            self.stamp(ctx, point);
        }
    }

    fn on_release(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.pressed {
            return;
        }
        self.pressed = false;

        let (raster, mode) = if self.erasing {
            match self.mask.as_mut() {
                Some(mask) => {
                    let raster = mask.to_raster();
                    mask.clear();
                    (raster, CompositeMode::DestinationOut)
                }
                None => {
                    ctx.canvas.clear_upper();
                    return;
                }
            }
        } else {
            (ctx.canvas.upper().to_raster(), CompositeMode::SourceOver)
        };

        if ctx.canvas.upper().is_blank() {
            return;
        }
        commit_raster(ctx, raster, mode);
    }

    fn on_assets_ready(&mut self, ctx: &mut BrushContext<'_>) {
        if self.source.is_none() {
            self.source = ctx.assets.get(&self.url);
            self.on_source_loaded();
        }
    }

    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        self.pressed = false;
        if let Some(mask) = self.mask.as_mut() {
            mask.clear();
        }
        ctx.canvas.clear_upper();
    }
}
