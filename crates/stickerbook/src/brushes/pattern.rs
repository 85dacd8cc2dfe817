//! Pattern brush: stamps a cycling list of images along the stroke.

use super::{BrushContext, BrushStyle, Strokeable, commit};
use crate::runtime::{Assets, LoadedImage};
use kurbo::Point;
use std::sync::Arc;
use stickerbook_core::{DisplayObject, ObjectKind, ObjectSnapshot, SerializableColor};

/// Minimum distance between stamp centers.
const DISTANCE_TOLERANCE: f64 = 100.0;

fn is_far_enough(current: Point, last: Point, tolerance: f64) -> bool {
    let dx = last.x - current.x;
    let dy = last.y - current.y;
    dx * dx + dy * dy > tolerance * tolerance
}

#[derive(Debug, Clone)]
pub struct PatternBrush {
    style: BrushStyle,
    urls: Vec<String>,
    /// Populated once every image has loaded.
    images: Vec<Arc<LoadedImage>>,
    img_index: usize,
    pressed: bool,
    last_image_point: Option<Point>,
    /// A press that arrived before the images finished loading.
    pending_press: Option<Point>,
    placed: Vec<ObjectSnapshot>,
}

impl PatternBrush {
    /// Create the brush and start loading its images.
    pub fn new(urls: &[String], assets: &mut Assets) -> Self {
        let mut brush = Self {
            style: BrushStyle::default(),
            urls: urls.to_vec(),
            images: Vec::new(),
            img_index: 0,
            pressed: false,
            last_image_point: None,
            pending_press: None,
            placed: Vec::new(),
        };
        for url in urls {
            assets.request(url);
        }
        brush.try_load(assets);
        brush
    }

    pub fn is_loaded(&self) -> bool {
        !self.images.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    fn try_load(&mut self, assets: &Assets) -> bool {
        if self.is_loaded() {
            return true;
        }
        let loaded: Option<Vec<_>> = self.urls.iter().map(|url| assets.get(url)).collect();
        if let Some(images) = loaded.filter(|images| !images.is_empty()) {
            log::debug!("Pattern brush loaded {} images", images.len());
            self.images = images;
        }
        self.is_loaded()
    }

    fn stamp(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        let Some(image) = self.images.get(self.img_index).cloned() else {
            return;
        };
        self.img_index = (self.img_index + 1) % self.images.len();

        let width = self.style.width;
        let scale = width / f64::from(image.width().max(1));
        let display_height = f64::from(image.height()) * scale;

        let mut snapshot = ObjectSnapshot::new(ObjectKind::Image(image.shape.clone()));
        let p = &mut snapshot.presentation;
        p.scale_x = scale;
        p.scale_y = scale;
        p.left = point.x - width / 2.0;
        p.top = point.y - display_height / 2.0;

        ctx.canvas.cache_image(&image.shape, Arc::clone(&image.raster));
        ctx.canvas.preview(&snapshot);
        self.placed.push(snapshot);
    }
}

impl Strokeable for PatternBrush {
    fn name(&self) -> &str {
        "pattern"
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
        self.placed.clear();
        self.pressed = true;
        self.last_image_point = Some(point);
        if self.try_load(ctx.assets) {
            self.pending_press = None;
            self.stamp(ctx, point);
        } else {
            self.pending_press = Some(point);
        }
    }

    fn on_move(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        if !self.pressed || !self.is_loaded() {
            return;
        }
        let Some(last) = self.last_image_point else {
            return;
        };
        if is_far_enough(point, last, DISTANCE_TOLERANCE) {
            self.stamp(ctx, point);
            self.last_image_point = Some(point);
        }
    }

    fn on_release(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.pressed {
            return;
        }
        self.pressed = false;
        self.pending_press = None;
        self.last_image_point = None;
        let placed = std::mem::take(&mut self.placed);
        if placed.is_empty() {
            ctx.canvas.clear_upper();
            return;
        }

        let mut group = DisplayObject::group_at(placed);
        group.lock();
        let index = commit(ctx, group);
        ctx.canvas.fire_path_created(index);
    }

    fn on_assets_ready(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.try_load(ctx.assets) {
            return;
        }
        if let Some(point) = self.pending_press.take() {
            self.stamp(ctx, point);
        }
    }

    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        self.pressed = false;
        self.pending_press = None;
        self.last_image_point = None;
        self.placed.clear();
        ctx.canvas.clear_upper();
    }
}
