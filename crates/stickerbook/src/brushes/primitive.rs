//! Circle and spray brushes: scatter filled primitives along the stroke.

use super::{BrushContext, BrushStyle, Strokeable, commit};
use kurbo::{Affine, Circle, Point, Rect, Shape};
use stickerbook_core::shapes::PathShape;
use stickerbook_core::{CompositeMode, DisplayObject, ObjectSnapshot, SerializableColor};
use stickerbook_render::Ink;

/// Dots sprayed per pointer event.
const SPRAY_DENSITY: usize = 20;
const SPRAY_DOT_WIDTH: f64 = 1.0;
const SPRAY_DOT_VARIANCE: f64 = 1.0;

fn dot_snapshot(shape: impl Shape, color: SerializableColor) -> ObjectSnapshot {
    DisplayObject::path_at(PathShape::filled(shape.to_path(0.1), color)).snapshot()
}

/// Commit accumulated primitives as one non-selectable group.
fn commit_dots(ctx: &mut BrushContext<'_>, dots: Vec<ObjectSnapshot>) {
    if dots.is_empty() {
        ctx.canvas.clear_upper();
        return;
    }
    let mut group = DisplayObject::group_at(dots);
    group.lock();
    let index = commit(ctx, group);
    ctx.canvas.fire_path_created(index);
}

/// Stamps a filled dot of radius `width / 2` at every pointer position.
#[derive(Debug, Clone, Default)]
pub struct CircleBrush {
    style: BrushStyle,
    dots: Vec<ObjectSnapshot>,
    pressed: bool,
}

impl CircleBrush {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_dot(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        let radius = self.style.width / 2.0;
        ctx.canvas.upper_mut().fill_circle(point, radius, self.style.color);
        self.dots
            .push(dot_snapshot(Circle::new(point, radius), self.style.color));
    }
}

impl Strokeable for CircleBrush {
    fn name(&self) -> &str {
        "circle"
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
        self.dots.clear();
        self.pressed = true;
        self.add_dot(ctx, point);
    }

    fn on_move(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        if self.pressed {
            self.add_dot(ctx, point);
        }
    }

    fn on_release(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.pressed {
            return;
        }
        self.pressed = false;
        commit_dots(ctx, std::mem::take(&mut self.dots));
    }

    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        self.pressed = false;
        self.dots.clear();
        ctx.canvas.clear_upper();
    }
}

/// Small deterministic generator for spray positions (splitmix32).
#[derive(Debug, Clone)]
struct SplitMix32(u32);

impl SplitMix32 {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(0x9E3779B9);
        let mut x = self.0;
        x ^= x >> 16;
        x = x.wrapping_mul(0x85EBCA6B);
        x ^= x >> 13;
        x = x.wrapping_mul(0xC2B2AE35);
        x ^= x >> 16;
        x
    }

    /// Uniform in `[min, max]`.
    fn range(&mut self, min: f64, max: f64) -> f64 {
        let unit = f64::from(self.next_u32()) / f64::from(u32::MAX);
        min + (max - min) * unit
    }
}

/// Scatters small square dots within `width / 2` of the pointer.
#[derive(Debug, Clone)]
pub struct SprayBrush {
    style: BrushStyle,
    rng: SplitMix32,
    dots: Vec<ObjectSnapshot>,
    pressed: bool,
}

impl Default for SprayBrush {
    fn default() -> Self {
        Self::new()
    }
}

impl SprayBrush {
    pub fn new() -> Self {
        Self::with_seed(1)
    }

    pub fn with_seed(seed: u32) -> Self {
        Self {
            style: BrushStyle::default(),
            rng: SplitMix32(seed),
            dots: Vec::new(),
            pressed: false,
        }
    }

    pub fn dot_count(&self) -> usize {
        self.dots.len()
    }

    fn spray(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        let radius = self.style.width / 2.0;
        let color = self.style.color;
        for _ in 0..SPRAY_DENSITY {
            let x = self.rng.range(point.x - radius, point.x + radius).round();
            let y = self.rng.range(point.y - radius, point.y + radius).round();
            let size = self
                .rng
                .range(
                    (SPRAY_DOT_WIDTH - SPRAY_DOT_VARIANCE).max(1.0),
                    SPRAY_DOT_WIDTH + SPRAY_DOT_VARIANCE,
                )
                .round();
            let rect = Rect::new(x, y, x + size, y + size);
            ctx.canvas.upper_mut().fill_path(
                &rect.to_path(0.1),
                Affine::IDENTITY,
                Ink::Solid(color),
                CompositeMode::SourceOver,
            );
            self.dots.push(dot_snapshot(rect, color));
        }
    }
}

impl Strokeable for SprayBrush {
    fn name(&self) -> &str {
        "spray"
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
        self.dots.clear();
        self.pressed = true;
        self.spray(ctx, point);
    }

    fn on_move(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        if self.pressed {
            self.spray(ctx, point);
        }
    }

    fn on_release(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.pressed {
            return;
        }
        self.pressed = false;
        commit_dots(ctx, std::mem::take(&mut self.dots));
    }

    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        self.pressed = false;
        self.dots.clear();
        ctx.canvas.clear_upper();
    }
}
