//! Vector path shape produced by the freehand, marker, circle and spray brushes.

use super::SerializableColor;
use kurbo::{BezPath, Point, Rect, Shape as _};
use serde::{Deserialize, Serialize};

/// A vector path in local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathShape {
    /// Path geometry.
    pub path: BezPath,
    /// Stroke color (None = no stroke).
    pub stroke: Option<SerializableColor>,
    /// Stroke width.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill: Option<SerializableColor>,
}

impl PathShape {
    /// A stroked, unfilled path with round caps and joins.
    pub fn stroked(path: BezPath, color: SerializableColor, width: f64) -> Self {
        Self {
            path,
            stroke: Some(color),
            stroke_width: width,
            fill: None,
        }
    }

    /// A filled path without stroke.
    pub fn filled(path: BezPath, color: SerializableColor) -> Self {
        Self {
            path,
            stroke: None,
            stroke_width: 0.0,
            fill: Some(color),
        }
    }

    /// Build a smoothed path through `points`: quadratic segments through the
    /// midpoints, ending with a straight line to the final point. Every point
    /// is shifted by `offset` on both axes.
    pub fn smoothed(points: &[Point], offset: f64) -> BezPath {
        let mut path = BezPath::new();
        let shift = |p: Point| Point::new(p.x + offset, p.y + offset);
        let Some(&first) = points.first() else {
            return path;
        };

        path.move_to(shift(first));
        if points.len() < 2 {
            return path;
        }

        let mut p1 = first;
        let mut p2 = points[1];
        for i in 1..points.len() {
            let mid = p1.midpoint(p2);
            path.quad_to(shift(p1), shift(mid));
            p1 = points[i];
            if i + 1 < points.len() {
                p2 = points[i + 1];
            }
        }
        path.line_to(shift(p1));
        path
    }

    /// Bounds of the geometry, grown by half the stroke width.
    pub fn local_bounds(&self) -> Rect {
        let bounds = self.path.bounding_box();
        if !bounds.is_finite() {
            return Rect::ZERO;
        }
        let pad = if self.stroke.is_some() { self.stroke_width / 2.0 } else { 0.0 };
        bounds.inflate(pad, pad)
    }
}
