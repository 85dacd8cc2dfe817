//! Paint bucket: flood-fills the region under the pointer.

use super::{BrushContext, BrushStyle, Strokeable, commit_raster};
use kurbo::{Affine, BezPath, Point};
use stickerbook_core::{BrushConfig, CompositeMode, FuzzySelector, RangeSet, SelectionStepper, SerializableColor};
use stickerbook_render::{Ink, Surface};

/// Per-channel color distance still considered part of the region.
pub const FILL_TOLERANCE: u8 = 10;

/// Width of the scan lines used to paint a region.
const SCANLINE_WIDTH: f64 = 2.0;

#[derive(Debug)]
pub struct FillBrush {
    style: BrushStyle,
    is_async: bool,
    steps_per_frame: usize,
    partial_fill: bool,
    stepper: Option<SelectionStepper>,
    keep_painting: bool,
    /// A fill has been painted onto the preview and not yet committed.
    active: bool,
}

impl FillBrush {
    pub fn new(config: &BrushConfig) -> Self {
        Self {
            style: BrushStyle::default(),
            is_async: config.is_async,
            steps_per_frame: config.steps_per_frame.max(1),
            partial_fill: config.partial_fill,
            stepper: None,
            keep_painting: false,
            active: false,
        }
    }

    pub fn is_painting(&self) -> bool {
        self.keep_painting
    }

    /// Paint every column span of `region` as a vertical scan line.
    fn draw_range(upper: &mut Surface, region: &RangeSet, color: SerializableColor) {
        let mut path = BezPath::new();
        region.for_each_range(|x, min, max| {
            path.move_to((f64::from(x), f64::from(min)));
            path.line_to((f64::from(x), f64::from(max) + 1.0));
        });
        upper.stroke_path(
            &path,
            Affine::IDENTITY,
            Ink::Solid(color),
            SCANLINE_WIDTH,
            CompositeMode::SourceOver,
        );
    }

    fn stop(&mut self) {
        self.keep_painting = false;
        self.stepper = None;
    }

    /// Turn the painted preview into a display object.
    fn finish(&mut self, ctx: &mut BrushContext<'_>) {
        self.stop();
        if !std::mem::take(&mut self.active) {
            return;
        }
        if ctx.canvas.upper().is_blank() {
            log::debug!("Fill selected nothing; skipping commit");
            return;
        }
        let raster = ctx.canvas.upper().to_raster();
        commit_raster(ctx, raster, CompositeMode::SourceOver);
    }
}

impl Strokeable for FillBrush {
    fn name(&self) -> &str {
        "fill"
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
        self.stop();
        ctx.canvas.clear_upper();

        let selector = FuzzySelector::new(ctx.canvas.image_data());
        let (x, y) = (point.x.round() as i32, point.y.round() as i32);
        self.active = true;

        if self.is_async {
            self.stepper = Some(selector.select_iteratively(x, y, FILL_TOLERANCE));
            self.keep_painting = true;
        } else {
            let region = selector.select(x, y, FILL_TOLERANCE);
            log::debug!("Filled {} pixels from ({x}, {y})", region.pixel_count());
            Self::draw_range(ctx.canvas.upper_mut(), &region, self.style.color);
        }
    }

    fn on_move(&mut self, _ctx: &mut BrushContext<'_>, _point: Point) {}

    fn on_release(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.active {
            return;
        }
        if !self.is_async || self.partial_fill {
            self.finish(ctx);
        }
        // otherwise the frame loop commits once the selection completes
    }

    fn on_frame(&mut self, ctx: &mut BrushContext<'_>) {
        if !self.keep_painting {
            return;
        }
        let Some(stepper) = self.stepper.as_mut() else {
            return;
        };

        let mut done = stepper.is_done();
        for _ in 0..self.steps_per_frame {
            if done {
                break;
            }
            done = stepper.step().done;
        }

        let upper = ctx.canvas.upper_mut();
        upper.clear();
        Self::draw_range(upper, stepper.region(), self.style.color);

        if done {
            self.keep_painting = false;
            if !self.partial_fill {
                self.finish(ctx);
            }
        }
    }

    fn wants_frame(&self) -> bool {
        self.keep_painting && self.stepper.is_some()
    }

    fn cancel(&mut self, ctx: &mut BrushContext<'_>) {
        self.stop();
        self.active = false;
        ctx.canvas.clear_upper();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brushes::test_support::Harness;
    use stickerbook_core::DisplayObject;
    use stickerbook_core::shapes::PathShape;

    fn blue() -> SerializableColor {
        SerializableColor::new(0, 0, 255, 255)
    }

    fn run_frames(brush: &mut FillBrush, h: &mut Harness, limit: usize) -> usize {
        let mut frames = 0;
        while brush.wants_frame() && frames < limit {
            brush.on_frame(&mut h.ctx());
            frames += 1;
        }
        frames
    }

    #[test]
    fn test_sync_fill_covers_blank_canvas() {
        let mut h = Harness::new(20, 20);
        let mut brush = FillBrush::new(&BrushConfig::default());
        brush.set_color(blue());
        brush.on_press(&mut h.ctx(), Point::new(5.4, 5.6));
        assert_eq!(h.canvas.upper().pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(h.canvas.upper().pixel(19, 19), Some([0, 0, 255, 255]));

        brush.on_release(&mut h.ctx());
        assert!(h.canvas.upper().is_blank());
        let object = &h.canvas.objects()[0];
        assert!(object.is_image());
        assert!(!object.presentation().selectable);
    }

    #[test]
    fn test_fill_stops_at_stroke() {
        let mut h = Harness::new(30, 30);
        let mut wall = BezPath::new();
        wall.move_to((15.0, -5.0));
        wall.line_to((15.0, 35.0));
        h.canvas
            .add(DisplayObject::path_at(PathShape::stroked(wall, SerializableColor::black(), 4.0)));
        h.canvas.render_all();

        let mut brush = FillBrush::new(&BrushConfig::default());
        brush.set_color(blue());
        brush.on_press(&mut h.ctx(), Point::new(3.0, 3.0));
        assert_eq!(h.canvas.upper().pixel(3, 3), Some([0, 0, 255, 255]));
        assert_eq!(h.canvas.upper().pixel(25, 3).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_async_fill_steps_until_done() {
        let mut h = Harness::new(20, 20);
        let mut brush = FillBrush::new(&BrushConfig::fill(true, 1, false));
        brush.set_color(blue());
        brush.on_press(&mut h.ctx(), Point::new(10.0, 10.0));
        assert!(brush.wants_frame());
        assert!(h.canvas.upper().is_blank());

        brush.on_frame(&mut h.ctx());
        // a single step paints a single column
        assert_eq!(h.canvas.upper().pixel(10, 0).map(|p| p[3]), Some(255));
        assert_eq!(h.canvas.upper().pixel(0, 0).map(|p| p[3]), Some(0));

        // without partial fill, release waits for completion
        brush.on_release(&mut h.ctx());
        assert!(h.canvas.objects().is_empty());

        let frames = run_frames(&mut brush, &mut h, 1000);
        assert!(frames > 1);
        assert!(!brush.wants_frame());
        assert_eq!(h.canvas.objects().len(), 1);
    }

    #[test]
    fn test_async_partial_release_commits_early() {
        let mut h = Harness::new(20, 20);
        let mut brush = FillBrush::new(&BrushConfig::fill(true, 1, true));
        brush.on_press(&mut h.ctx(), Point::new(10.0, 10.0));
        brush.on_frame(&mut h.ctx());
        brush.on_release(&mut h.ctx());

        assert!(!brush.wants_frame());
        assert_eq!(h.canvas.objects().len(), 1);
        // no more frames arrive after the partial commit
        brush.on_frame(&mut h.ctx());
        assert_eq!(h.canvas.objects().len(), 1);
    }

    #[test]
    fn test_new_press_cancels_running_fill() {
        let mut h = Harness::new(30, 30);
        let mut wall = BezPath::new();
        wall.move_to((15.0, -5.0));
        wall.line_to((15.0, 35.0));
        h.canvas
            .add(DisplayObject::path_at(PathShape::stroked(wall, SerializableColor::black(), 4.0)));
        h.canvas.render_all();

        let mut brush = FillBrush::new(&BrushConfig::fill(true, 1, false));
        brush.set_color(blue());
        brush.on_press(&mut h.ctx(), Point::new(3.0, 3.0));
        brush.on_frame(&mut h.ctx());
        assert_eq!(h.canvas.upper().pixel(3, 3).map(|p| p[3]), Some(255));

        brush.on_press(&mut h.ctx(), Point::new(25.0, 3.0));
        assert!(h.canvas.upper().is_blank());
        brush.on_release(&mut h.ctx());
        run_frames(&mut brush, &mut h, 1000);

        // the wall plus the one fill that ran to completion
        assert_eq!(h.canvas.objects().len(), 2);
        h.canvas.render_all();
        assert_eq!(h.canvas.lower().pixel(25, 3), Some([0, 0, 255, 255]));
        assert_eq!(h.canvas.lower().pixel(3, 3).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_cancel_stops_running_fill() {
        let mut h = Harness::new(20, 20);
        let mut brush = FillBrush::new(&BrushConfig::fill(true, 1, false));
        brush.on_press(&mut h.ctx(), Point::new(10.0, 10.0));
        brush.on_frame(&mut h.ctx());
        brush.cancel(&mut h.ctx());
        assert!(!brush.wants_frame());
        assert!(h.canvas.upper().is_blank());
        brush.on_release(&mut h.ctx());
        assert!(h.canvas.objects().is_empty());
    }
}
