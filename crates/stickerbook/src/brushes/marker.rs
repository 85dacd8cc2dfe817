//! Marker brush: a broad nib simulated with several thin parallel strokes.

use super::{BrushContext, BrushStyle, Strokeable, commit};
use kurbo::{Affine, BezPath, Point};
use stickerbook_core::shapes::PathShape;
use stickerbook_core::{CompositeMode, DisplayObject, ObjectSnapshot, SerializableColor};
use stickerbook_render::Ink;

/// Width of each individual sub-stroke.
const LINE_WIDTH: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct MarkerBrush {
    style: BrushStyle,
    points: Vec<Point>,
    pressed: bool,
}

impl Default for MarkerBrush {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerBrush {
    pub fn new() -> Self {
        Self {
            style: BrushStyle::default(),
            points: Vec::new(),
            pressed: false,
        }
    }

    /// Offsets of the sub-strokes for the current width.
    pub fn offsets(&self) -> Vec<f64> {
        let limit = (self.style.width / LINE_WIDTH) / 2.0;
        (0u32..)
            .map(f64::from)
            .take_while(|factor| *factor < limit)
            .map(|factor| (LINE_WIDTH - 1.0) * factor)
            .collect()
    }
}

impl Strokeable for MarkerBrush {
    fn name(&self) -> &str {
        "marker"
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
        self.points.clear();
        self.points.push(point);
        self.pressed = true;
    }

    fn on_move(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        if !self.pressed {
            return;
        }
        let Some(&last) = self.points.last() else {
            return;
        };
        let upper = ctx.canvas.upper_mut();
        for offset in self.offsets() {
            let mut segment = BezPath::new();
            segment.move_to((last.x + offset, last.y + offset));
            segment.line_to((point.x + offset, point.y + offset));
            upper.stroke_path(
                &segment,
                Affine::IDENTITY,
                Ink::Solid(self.style.color),
                LINE_WIDTH,
                CompositeMode::SourceOver,
            );
        }
        self.points.push(point);
    }

    fn on_release(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.pressed {
            return;
        }
        self.pressed = false;
        let points = std::mem::take(&mut self.points);
        if points.len() < 2 {
            ctx.canvas.clear_upper();
            return;
        }

        let children: Vec<ObjectSnapshot> = self
            .offsets()
            .into_iter()
            .map(|offset| {
                let path = PathShape::smoothed(&points, offset);
                DisplayObject::path_at(PathShape::stroked(path, self.style.color, LINE_WIDTH)).snapshot()
            })
            .collect();
        if children.is_empty() {
            ctx.canvas.clear_upper();
            return;
        }

        let mut group = DisplayObject::group_at(children);
        group.presentation_mut().selectable = false;
        let index = commit(ctx, group);
        ctx.canvas.fire_path_created(index);
    }

    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        self.points.clear();
        self.pressed = false;
        ctx.canvas.clear_upper();
    }
}
