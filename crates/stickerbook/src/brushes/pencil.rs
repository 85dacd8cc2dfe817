//! Freehand path brush and its erasing variant.

use super::{BrushContext, BrushStyle, Strokeable, commit};
use kurbo::{Affine, BezPath, Point};
use stickerbook_core::shapes::PathShape;
use stickerbook_core::{CompositeMode, DisplayObject, SerializableColor};
use stickerbook_render::{Ink, Surface};

/// How a freehand stroke is previewed and what mode it commits with.
pub trait StrokeRenderer {
    fn preview(&self, upper: &mut Surface, path: &BezPath, style: BrushStyle, backdrop: &Surface);

    fn composite(&self) -> CompositeMode;
}

/// Paints the stroke in the brush color.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidRenderer;

impl StrokeRenderer for SolidRenderer {
    fn preview(&self, upper: &mut Surface, path: &BezPath, style: BrushStyle, _backdrop: &Surface) {
        upper.stroke_path(
            path,
            Affine::IDENTITY,
            Ink::Solid(style.color),
            style.width,
            CompositeMode::SourceOver,
        );
    }

    fn composite(&self) -> CompositeMode {
        CompositeMode::SourceOver
    }
}

/// Previews by revealing the backdrop under the stroke, and commits with
/// `destination-out` so the stroke removes everything beneath it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErasingRenderer;

impl StrokeRenderer for ErasingRenderer {
    fn preview(&self, upper: &mut Surface, path: &BezPath, style: BrushStyle, backdrop: &Surface) {
        upper.stroke_path(
            path,
            Affine::IDENTITY,
            Ink::Pattern(backdrop.pixmap()),
            style.width,
            CompositeMode::SourceOver,
        );
    }

    fn composite(&self) -> CompositeMode {
        CompositeMode::DestinationOut
    }
}

/// Accumulates pointer positions and commits one smoothed vector path.
#[derive(Debug, Clone)]
pub struct PencilBrush<R> {
    name: &'static str,
    style: BrushStyle,
    renderer: R,
    points: Vec<Point>,
    pressed: bool,
}

impl PencilBrush<SolidRenderer> {
    pub fn pencil() -> Self {
        Self::with_renderer("pencil", SolidRenderer)
    }
}

impl PencilBrush<ErasingRenderer> {
    pub fn eraser() -> Self {
        Self::with_renderer("eraser", ErasingRenderer)
    }
}

impl<R: StrokeRenderer> PencilBrush<R> {
    pub fn with_renderer(name: &'static str, renderer: R) -> Self {
        Self {
            name,
            style: BrushStyle::default(),
            renderer,
            points: Vec::new(),
            pressed: false,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Path through the recorded points. A lone point becomes a one-pixel
    /// segment so it still renders as a dot.
    fn current_path(&self) -> BezPath {
        match self.points.as_slice() {
            [p] => PathShape::smoothed(&[Point::new(p.x - 0.5, p.y), Point::new(p.x + 0.5, p.y)], 0.0),
            points => PathShape::smoothed(points, 0.0),
        }
    }

    fn redraw(&self, ctx: &mut BrushContext<'_>) {
        let upper = ctx.canvas.upper_mut();
        upper.clear();
        self.renderer
            .preview(upper, &self.current_path(), self.style, ctx.backdrop);
    }
}

impl<R: StrokeRenderer> Strokeable for PencilBrush<R> {
    fn name(&self) -> &str {
        self.name
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
        self.points.clear();
        self.points.push(point);
        self.pressed = true;
        self.redraw(ctx);
    }

    fn on_move(&mut self, ctx: &mut BrushContext<'_>, point: Point) {
        if !self.pressed {
            return;
        }
        if self.points.last() == Some(&point) {
            return;
        }
        self.points.push(point);
        self.redraw(ctx);
    }

    fn on_release(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.pressed {
            return;
        }
        self.pressed = false;
        let path = self.current_path();
        self.points.clear();

        let mut object = DisplayObject::path_at(PathShape::stroked(path, self.style.color, self.style.width));
        object.presentation_mut().composite = self.renderer.composite();
        let index = commit(ctx, object);
        ctx.canvas.fire_path_created(index);
    }

    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        self.points.clear();
        self.pressed = false;
        ctx.canvas.clear_upper();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brushes::test_support::Harness;
    use stickerbook_core::ObjectKind;
    use stickerbook_render::EventKind;

    fn red() -> SerializableColor {
        SerializableColor::new(255, 0, 0, 255)
    }

    #[test]
    fn test_move_before_press_is_noop() {
        let mut h = Harness::new(50, 50);
        let mut brush = PencilBrush::pencil();
        brush.on_move(&mut h.ctx(), Point::new(5.0, 5.0));
        brush.on_release(&mut h.ctx());
        assert!(h.canvas.objects().is_empty());
        assert!(h.canvas.upper().is_blank());
    }

    #[test]
    fn test_stroke_commits_path() {
        let mut h = Harness::new(50, 50);
        let mut brush = PencilBrush::pencil();
        brush.set_color(red());
        brush.set_width(4.0);
        brush.on_press(&mut h.ctx(), Point::new(10.0, 10.0));
        brush.on_move(&mut h.ctx(), Point::new(20.0, 10.0));
        brush.on_move(&mut h.ctx(), Point::new(30.0, 20.0));
        assert!(!h.canvas.upper().is_blank());

        brush.on_release(&mut h.ctx());
        assert!(h.canvas.upper().is_blank());
        assert_eq!(h.canvas.objects().len(), 1);
        let object = &h.canvas.objects()[0];
        let ObjectKind::Path(shape) = object.kind() else {
            panic!("expected a path");
        };
        assert_eq!(shape.stroke, Some(red()));
        assert_eq!(object.presentation().left, 10.0);
        assert_eq!(object.presentation().composite, CompositeMode::SourceOver);
        assert_eq!(h.events(), vec![EventKind::ObjectAdded, EventKind::PathCreated]);
    }

    #[test]
    fn test_press_twice_restarts() {
        let mut h = Harness::new(50, 50);
        let mut brush = PencilBrush::pencil();
        brush.on_press(&mut h.ctx(), Point::new(1.0, 1.0));
        brush.on_move(&mut h.ctx(), Point::new(2.0, 2.0));
        brush.on_press(&mut h.ctx(), Point::new(40.0, 40.0));
        assert_eq!(brush.points(), &[Point::new(40.0, 40.0)]);
    }

    #[test]
    fn test_single_click_draws_dot() {
        let mut h = Harness::new(50, 50);
        let mut brush = PencilBrush::pencil();
        brush.set_width(6.0);
        brush.on_press(&mut h.ctx(), Point::new(25.0, 25.0));
        assert_eq!(h.canvas.upper().pixel(25, 25).map(|p| p[3]), Some(255));
        brush.on_release(&mut h.ctx());
        assert_eq!(h.canvas.objects().len(), 1);
    }

    #[test]
    fn test_eraser_commits_destination_out() {
        let mut h = Harness::new(50, 50);
        h.backdrop.fill_color(SerializableColor::new(0, 0, 255, 255));
        let mut brush = PencilBrush::eraser();
        brush.set_width(6.0);
        brush.on_press(&mut h.ctx(), Point::new(10.0, 25.0));
        brush.on_move(&mut h.ctx(), Point::new(40.0, 25.0));
        // preview shows the backdrop, not the brush color
        assert_eq!(h.canvas.upper().pixel(25, 25), Some([0, 0, 255, 255]));

        brush.on_release(&mut h.ctx());
        let object = &h.canvas.objects()[0];
        assert_eq!(object.presentation().composite, CompositeMode::DestinationOut);
    }

    #[test]
    fn test_cancel_discards_stroke() {
        let mut h = Harness::new(50, 50);
        let mut brush = PencilBrush::pencil();
        brush.on_press(&mut h.ctx(), Point::new(1.0, 1.0));
        brush.cancel(&mut h.ctx());
        brush.on_release(&mut h.ctx());
        assert!(h.canvas.objects().is_empty());
    }
}
