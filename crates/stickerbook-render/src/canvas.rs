//! The drawing canvas: display list, surfaces and event bus.

use crate::error::RenderResult;
use crate::rasterize::{self, ImageCache};
use crate::surface::{RasterImage, Surface};
use kurbo::{Affine, Point};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use stickerbook_core::selector::ColorGrid;
use stickerbook_core::shapes::{ImageShape, ObjectSnapshot};
use stickerbook_core::{DisplayList, DisplayObject, ObjectId};

/// Canvas event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ObjectAdded,
    ObjectRemoved,
    ObjectModified,
    PathCreated,
    MouseDown,
    MouseUp,
    AfterRender,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ObjectAdded => "object:added",
            EventKind::ObjectRemoved => "object:removed",
            EventKind::ObjectModified => "object:modified",
            EventKind::PathCreated => "path:created",
            EventKind::MouseDown => "mouse:down",
            EventKind::MouseUp => "mouse:up",
            EventKind::AfterRender => "after:render",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object:added" => Ok(EventKind::ObjectAdded),
            "object:removed" => Ok(EventKind::ObjectRemoved),
            "object:modified" => Ok(EventKind::ObjectModified),
            "path:created" => Ok(EventKind::PathCreated),
            "mouse:down" => Ok(EventKind::MouseDown),
            "mouse:up" => Ok(EventKind::MouseUp),
            "after:render" => Ok(EventKind::AfterRender),
            other => Err(other.to_string()),
        }
    }
}

/// Something that happened on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasEvent {
    pub kind: EventKind,
    /// Display-list index of the target at the time of the event.
    pub target: Option<usize>,
    pub object_id: Option<ObjectId>,
    /// Pointer position for mouse events.
    pub pointer: Option<Point>,
}

impl CanvasEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            target: None,
            object_id: None,
            pointer: None,
        }
    }

    pub fn with_target(mut self, index: usize, id: Option<ObjectId>) -> Self {
        self.target = Some(index);
        self.object_id = id;
        self
    }

    pub fn with_pointer(mut self, pointer: Point) -> Self {
        self.pointer = Some(pointer);
        self
    }
}

/// Handle returned by [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Box<dyn FnMut(&CanvasEvent)>;

/// Named-event subscriptions.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(HandlerId, EventKind, Handler)>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl EventBus {
    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&CanvasEvent) + 'static) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.push((id, kind, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not registered for `kind`.
    pub fn off(&mut self, kind: EventKind, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(hid, k, _)| !(*hid == id && *k == kind));
        self.handlers.len() != before
    }

    /// Call every handler registered for the event's kind, in registration order.
    pub fn emit(&mut self, event: &CanvasEvent) {
        for (_, kind, handler) in &mut self.handlers {
            if *kind == event.kind {
                handler(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A retained-mode canvas: an ordered display list rasterized onto a lower
/// surface, plus an upper surface for in-progress previews.
///
/// Mutations queue [`CanvasEvent`]s; the owner drains them with
/// [`DrawingCanvas::take_event`] once the mutation has completed.
#[derive(Debug)]
pub struct DrawingCanvas {
    objects: Vec<DisplayObject>,
    lower: Surface,
    upper: Surface,
    events: VecDeque<CanvasEvent>,
    bus: EventBus,
    active: Option<usize>,
    drawing_mode: bool,
    render_requested: bool,
    images: ImageCache,
}

impl DrawingCanvas {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        Ok(Self {
            objects: Vec::new(),
            lower: Surface::new(width, height)?,
            upper: Surface::new(width, height)?,
            events: VecDeque::new(),
            bus: EventBus::default(),
            active: None,
            drawing_mode: true,
            render_requested: false,
            images: ImageCache::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.lower.width()
    }

    pub fn height(&self) -> u32 {
        self.lower.height()
    }

    /// Resize both surfaces and re-render.
    pub fn set_dimensions(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.lower.resize(width, height)?;
        self.upper.resize(width, height)?;
        self.render_all();
        Ok(())
    }

    pub fn objects(&self) -> &[DisplayObject] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> Option<&DisplayObject> {
        self.objects.get(index)
    }

    pub fn object_mut(&mut self, index: usize) -> Option<&mut DisplayObject> {
        self.objects.get_mut(index)
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == Some(id))
    }

    /// Append an object on top. Queues `object:added`.
    pub fn add(&mut self, object: DisplayObject) -> usize {
        let index = self.objects.len();
        let id = object.id();
        self.objects.push(object);
        self.events
            .push_back(CanvasEvent::new(EventKind::ObjectAdded).with_target(index, id));
        self.render_requested = true;
        index
    }

    /// Remove an object. Queues `object:removed`.
    pub fn remove(&mut self, index: usize) -> Option<DisplayObject> {
        if index >= self.objects.len() {
            return None;
        }
        let object = self.objects.remove(index);
        self.active = match self.active {
            Some(a) if a == index => None,
            Some(a) if a > index => Some(a - 1),
            other => other,
        };
        self.events
            .push_back(CanvasEvent::new(EventKind::ObjectRemoved).with_target(index, object.id()));
        self.render_requested = true;
        Some(object)
    }

    /// Remove every object and blank both surfaces.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.active = None;
        self.lower.clear();
        self.upper.clear();
        self.render_requested = true;
    }

    /// Report that a user gesture finished transforming an object.
    pub fn mark_modified(&mut self, index: usize) {
        if let Some(object) = self.objects.get_mut(index) {
            object.set_coords();
            let id = object.id();
            self.events
                .push_back(CanvasEvent::new(EventKind::ObjectModified).with_target(index, id));
            self.render_requested = true;
        }
    }

    /// Announce that a brush committed a new drawable.
    pub fn fire_path_created(&mut self, index: usize) {
        let id = self.objects.get(index).and_then(DisplayObject::id);
        self.events
            .push_back(CanvasEvent::new(EventKind::PathCreated).with_target(index, id));
    }

    pub fn fire_pointer(&mut self, kind: EventKind, pointer: Point) {
        self.events.push_back(CanvasEvent::new(kind).with_pointer(pointer));
    }

    pub fn take_event(&mut self) -> Option<CanvasEvent> {
        self.events.pop_front()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn active_object(&self) -> Option<usize> {
        self.active
    }

    pub fn set_active_object(&mut self, index: usize) {
        if index < self.objects.len() {
            self.active = Some(index);
            self.render_requested = true;
        }
    }

    pub fn discard_active_object(&mut self) {
        if self.active.take().is_some() {
            self.render_requested = true;
        }
    }

    pub fn is_drawing_mode(&self) -> bool {
        self.drawing_mode
    }

    pub fn set_drawing_mode(&mut self, drawing: bool) {
        self.drawing_mode = drawing;
        if !drawing {
            self.upper.clear();
        }
    }

    /// Topmost object containing `point`, for pointer targeting.
    pub fn find_target(&self, point: Point) -> Option<usize> {
        self.objects
            .iter()
            .rposition(|o| o.presentation().selectable && o.coords().contains(point))
    }

    pub fn lower(&self) -> &Surface {
        &self.lower
    }

    pub fn upper(&self) -> &Surface {
        &self.upper
    }

    pub fn upper_mut(&mut self) -> &mut Surface {
        &mut self.upper
    }

    pub fn clear_upper(&mut self) {
        self.upper.clear();
    }

    /// Draw an uncommitted object onto the upper surface.
    pub fn preview(&mut self, snapshot: &ObjectSnapshot) {
        rasterize::rasterize(&mut self.upper, snapshot, Affine::IDENTITY, &mut self.images);
    }

    /// Pixel data of the rendered drawing.
    pub fn image_data(&self) -> ColorGrid {
        self.lower.image_data()
    }

    /// Decode an image through the canvas cache.
    pub fn decode_image(&mut self, image: &ImageShape) -> Option<Arc<RasterImage>> {
        self.images.get_or_decode(image)
    }

    pub fn cache_image(&mut self, image: &ImageShape, raster: Arc<RasterImage>) {
        self.images.insert(image, raster);
    }

    pub fn request_render(&mut self) {
        self.render_requested = true;
    }

    pub fn render_requested(&self) -> bool {
        self.render_requested
    }

    /// Render if anything asked for it since the last render.
    pub fn flush_render(&mut self) {
        if self.render_requested {
            self.render_all();
        }
    }

    /// Rasterize the display list onto the lower surface. Queues `after:render`.
    pub fn render_all(&mut self) {
        self.lower.clear();
        for object in &self.objects {
            rasterize::rasterize(&mut self.lower, object.state(), Affine::IDENTITY, &mut self.images);
        }
        if let Some(active) = self.active.and_then(|i| self.objects.get(i)) {
            rasterize::draw_controls(&mut self.lower, active.state());
        }
        self.render_requested = false;
        self.events.push_back(CanvasEvent::new(EventKind::AfterRender));
    }
}

impl DisplayList for DrawingCanvas {
    fn objects(&self) -> &[DisplayObject] {
        &self.objects
    }

    fn object_mut(&mut self, index: usize) -> Option<&mut DisplayObject> {
        self.objects.get_mut(index)
    }

    fn insert_object(&mut self, object: DisplayObject) {
        self.add(object);
    }

    fn remove_object(&mut self, index: usize) -> Option<DisplayObject> {
        self.remove(index)
    }

    fn request_render(&mut self) {
        self.render_requested = true;
    }
}
