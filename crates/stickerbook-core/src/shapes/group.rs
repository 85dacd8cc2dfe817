//! Group shape: several stamps or sub-paths committed as one display object.

use super::ObjectSnapshot;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A group of child objects positioned relative to the group origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupShape {
    /// Children, back to front.
    pub children: Vec<ObjectSnapshot>,
}

impl GroupShape {
    /// Create a group from children already in group-local coordinates.
    pub fn new(children: Vec<ObjectSnapshot>) -> Self {
        Self { children }
    }

    /// Create a group from children positioned in canvas coordinates.
    ///
    /// Returns the group together with the canvas origin its children were
    /// re-based against (the top-left of their combined bounds).
    pub fn from_placed(mut children: Vec<ObjectSnapshot>) -> (Self, Point) {
        let origin = union_bounds(children.iter().map(ObjectSnapshot::bounds))
            .map(|r| r.origin())
            .unwrap_or(Point::ZERO);
        for child in &mut children {
            child.presentation.left -= origin.x;
            child.presentation.top -= origin.y;
        }
        (Self { children }, origin)
    }

    pub fn children(&self) -> &[ObjectSnapshot] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn local_bounds(&self) -> Rect {
        union_bounds(self.children.iter().map(ObjectSnapshot::bounds)).unwrap_or(Rect::ZERO)
    }
}

fn union_bounds(rects: impl Iterator<Item = Rect>) -> Option<Rect> {
    rects.fold(None, |acc, r| Some(acc.map_or(r, |a: Rect| a.union(r))))
}
