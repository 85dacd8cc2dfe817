//! Display objects: the drawable entities that live in the display list.

mod group;
mod image;
mod path;

pub use group::GroupShape;
pub use image::{ImageFormat, ImageShape};
pub use path::PathShape;

use kurbo::{Affine, Rect, Shape as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`).
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Stable identity of a display object, assigned by the history manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an object is composited onto what is already drawn below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompositeMode {
    /// Paint over the layers below.
    #[default]
    #[serde(rename = "source-over")]
    SourceOver,
    /// Subtract from the layers below (erasing).
    #[serde(rename = "destination-out")]
    DestinationOut,
}

impl CompositeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeMode::SourceOver => "source-over",
            CompositeMode::DestinationOut => "destination-out",
        }
    }

    pub fn is_erasing(&self) -> bool {
        matches!(self, CompositeMode::DestinationOut)
    }
}

impl FromStr for CompositeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source-over" => Ok(CompositeMode::SourceOver),
            "destination-out" => Ok(CompositeMode::DestinationOut),
            other => Err(other.to_string()),
        }
    }
}

/// Selection handle styling for manipulable objects (stickers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlStyle {
    pub corner_color: Option<SerializableColor>,
    pub corner_size: f64,
    pub transparent_corners: bool,
}

impl Default for ControlStyle {
    fn default() -> Self {
        Self {
            corner_color: None,
            corner_size: 13.0,
            transparent_corners: true,
        }
    }
}

/// Mutable presentation properties shared by every display object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in degrees, clockwise.
    pub angle: f64,
    pub composite: CompositeMode,
    pub selectable: bool,
    pub has_controls: bool,
    pub has_borders: bool,
    /// Hit-test against opaque pixels instead of the bounding box.
    pub per_pixel_target_find: bool,
    pub controls: ControlStyle,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            composite: CompositeMode::SourceOver,
            selectable: true,
            has_controls: true,
            has_borders: true,
            per_pixel_target_find: false,
            controls: ControlStyle::default(),
        }
    }
}

/// The geometry/content of a display object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Path(PathShape),
    Image(ImageShape),
    Group(GroupShape),
}

impl ObjectKind {
    /// Bounds in the object's local coordinate space.
    pub fn local_bounds(&self) -> Rect {
        match self {
            ObjectKind::Path(p) => p.local_bounds(),
            ObjectKind::Image(i) => i.local_bounds(),
            ObjectKind::Group(g) => g.local_bounds(),
        }
    }
}

/// The full, plain-data state of a display object, excluding its identity.
///
/// Two snapshots are equal when every presentation property and every piece of
/// content is equal; this is the equality used for duplicate detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub presentation: Presentation,
    pub kind: ObjectKind,
}

impl ObjectSnapshot {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            presentation: Presentation::default(),
            kind,
        }
    }

    /// Local-to-parent transform: translate, then rotate, then scale.
    pub fn transform(&self) -> Affine {
        let p = &self.presentation;
        Affine::translate((p.left, p.top))
            * Affine::rotate(p.angle.to_radians())
            * Affine::scale_non_uniform(p.scale_x, p.scale_y)
    }

    /// Axis-aligned bounds in parent coordinates.
    pub fn bounds(&self) -> Rect {
        let local = self.kind.local_bounds();
        self.transform().transform_rect_bbox(local)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Properties tracked by the history manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "top")]
    Top,
    #[serde(rename = "scaleX")]
    ScaleX,
    #[serde(rename = "scaleY")]
    ScaleY,
    #[serde(rename = "angle")]
    Angle,
    #[serde(rename = "globalCompositeOperation")]
    CompositeOperation,
}

impl Property {
    /// Properties inspected when an object is reported as modified, in recording order.
    pub const TRACKED: [Property; 6] = [
        Property::ScaleX,
        Property::ScaleY,
        Property::CompositeOperation,
        Property::Angle,
        Property::Left,
        Property::Top,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Property::Left => "left",
            Property::Top => "top",
            Property::ScaleX => "scaleX",
            Property::ScaleY => "scaleY",
            Property::Angle => "angle",
            Property::CompositeOperation => "globalCompositeOperation",
        }
    }

    /// Whether `value` has the right kind for this property.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        match self {
            Property::CompositeOperation => matches!(value, PropertyValue::Composite(_)),
            _ => matches!(value, PropertyValue::Number(_)),
        }
    }

    /// Read this property from a snapshot.
    pub fn read(&self, snapshot: &ObjectSnapshot) -> PropertyValue {
        let p = &snapshot.presentation;
        match self {
            Property::Left => PropertyValue::Number(p.left),
            Property::Top => PropertyValue::Number(p.top),
            Property::ScaleX => PropertyValue::Number(p.scale_x),
            Property::ScaleY => PropertyValue::Number(p.scale_y),
            Property::Angle => PropertyValue::Number(p.angle),
            Property::CompositeOperation => PropertyValue::Composite(p.composite),
        }
    }

    /// Write this property into a snapshot. Returns false on a kind mismatch.
    pub fn write(&self, snapshot: &mut ObjectSnapshot, value: &PropertyValue) -> bool {
        let p = &mut snapshot.presentation;
        match (self, value) {
            (Property::Left, PropertyValue::Number(v)) => p.left = *v,
            (Property::Top, PropertyValue::Number(v)) => p.top = *v,
            (Property::ScaleX, PropertyValue::Number(v)) => p.scale_x = *v,
            (Property::ScaleY, PropertyValue::Number(v)) => p.scale_y = *v,
            (Property::Angle, PropertyValue::Number(v)) => p.angle = *v,
            (Property::CompositeOperation, PropertyValue::Composite(mode)) => p.composite = *mode,
            _ => return false,
        }
        true
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a tracked property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Composite(CompositeMode),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(v) => write!(f, "{v}"),
            PropertyValue::Composite(mode) => f.write_str(mode.as_str()),
        }
    }
}

/// A drawable entity in the display list.
#[derive(Debug, Clone)]
pub struct DisplayObject {
    id: Option<ObjectId>,
    state: ObjectSnapshot,
    /// Cached bounds in canvas coordinates, refreshed by `set_coords`.
    coords: Rect,
}

impl PartialEq for DisplayObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.state == other.state
    }
}

impl DisplayObject {
    /// Create an object with no identity yet.
    pub fn new(kind: ObjectKind) -> Self {
        Self::from_snapshot(ObjectSnapshot::new(kind))
    }

    pub fn from_snapshot(state: ObjectSnapshot) -> Self {
        let coords = state.bounds();
        Self {
            id: None,
            state,
            coords,
        }
    }

    /// Rebuild an object from a recorded snapshot, keeping its original identity.
    pub fn restore(state: ObjectSnapshot, id: ObjectId) -> Self {
        let mut object = Self::from_snapshot(state);
        object.id = Some(id);
        object
    }

    /// Build a path object from a path in canvas coordinates.
    ///
    /// The geometry is re-based so that its bounding box starts at the local
    /// origin and `left`/`top` carry the canvas position.
    pub fn path_at(mut shape: PathShape) -> Self {
        let bounds = shape.path.bounding_box();
        let origin = if bounds.is_finite() { bounds.origin() } else { kurbo::Point::ZERO };
        shape.path.apply_affine(Affine::translate(-origin.to_vec2()));
        let mut object = Self::new(ObjectKind::Path(shape));
        object.state.presentation.left = origin.x;
        object.state.presentation.top = origin.y;
        object.set_coords();
        object
    }

    /// Group snapshots positioned in canvas coordinates into one object.
    pub fn group_at(children: Vec<ObjectSnapshot>) -> Self {
        let (group, origin) = GroupShape::from_placed(children);
        let mut object = Self::new(ObjectKind::Group(group));
        object.state.presentation.left = origin.x;
        object.state.presentation.top = origin.y;
        object.set_coords();
        object
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    /// Borrow the current state.
    pub fn state(&self) -> &ObjectSnapshot {
        &self.state
    }

    /// Clone the current state as a snapshot.
    pub fn snapshot(&self) -> ObjectSnapshot {
        self.state.clone()
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.state.kind
    }

    pub fn presentation(&self) -> &Presentation {
        &self.state.presentation
    }

    /// Mutable presentation access. Call `set_coords` afterwards when the
    /// transform changed.
    pub fn presentation_mut(&mut self) -> &mut Presentation {
        &mut self.state.presentation
    }

    pub fn get(&self, property: Property) -> PropertyValue {
        property.read(&self.state)
    }

    /// Set a tracked property; a value of the wrong kind is ignored.
    pub fn set(&mut self, property: Property, value: &PropertyValue) -> bool {
        property.write(&mut self.state, value)
    }

    pub fn transform(&self) -> Affine {
        self.state.transform()
    }

    /// Recompute the cached bounds after a transform change.
    pub fn set_coords(&mut self) {
        self.coords = self.state.bounds();
    }

    /// Cached bounds in canvas coordinates.
    pub fn coords(&self) -> Rect {
        self.coords
    }

    pub fn is_image(&self) -> bool {
        matches!(self.state.kind, ObjectKind::Image(_))
    }

    pub fn as_image(&self) -> Option<&ImageShape> {
        match &self.state.kind {
            ObjectKind::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.state.kind, ObjectKind::Group(_))
    }

    pub fn as_group(&self) -> Option<&GroupShape> {
        match &self.state.kind {
            ObjectKind::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Disable selection, controls and borders.
    pub fn lock(&mut self) {
        let p = &mut self.state.presentation;
        p.selectable = false;
        p.has_controls = false;
        p.has_borders = false;
    }
}
