//! The Stickerbook widget: brushes, stickers and a background over one canvas,
//! with undo/redo of everything drawn.

use crate::background::BackgroundManager;
use crate::brushes::{BrushContext, BrushRegistry, Strokeable};
use crate::container::Container;
use crate::error::{Result, StickerbookError};
use crate::handlers;
use crate::runtime::{Assets, ImageLoader, LoadedImage};
use kurbo::Point;
use std::sync::Arc;
use stickerbook_core::color::parse_css_color;
use stickerbook_core::shapes::ControlStyle;
use stickerbook_core::{
    BackgroundPositioning, BrushConfig, ConfigError, DisplayObject, HistoryManager, ObjectKind, ObjectSnapshot,
    SerializableColor, StickerbookConfig,
};
use stickerbook_render::{CanvasEvent, DrawingCanvas, EventKind, HandlerId, Surface, composite_layers};

/// Where and how to place the current sticker. Omitted fields fall back to
/// the configured sticker defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaceOptions {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub x_scale: Option<f64>,
    pub y_scale: Option<f64>,
    /// Degrees, clockwise.
    pub rotation: Option<f64>,
}

impl PlaceOptions {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

/// User-visible widget state.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub brush: String,
    pub brush_width: f64,
    pub brush_config: BrushConfig,
    pub color: String,
    /// Pointer input goes to the brush rather than to sticker placement.
    pub drawing: bool,
    pub background_image: Option<String>,
}

#[derive(Debug)]
struct StickerSlot {
    url: String,
    image: Option<Arc<LoadedImage>>,
}

/// An object being dragged in sticker mode.
#[derive(Debug, Clone, Copy)]
struct Drag {
    index: usize,
    start: Point,
    origin: Point,
    moved: bool,
}

#[derive(Debug)]
pub struct Stickerbook {
    config: StickerbookConfig,
    container: Container,
    state: State,
    canvas: DrawingCanvas,
    history: HistoryManager,
    background: BackgroundManager,
    assets: Assets,
    registry: BrushRegistry,
    brush: Box<dyn Strokeable>,
    sticker: Option<StickerSlot>,
    sticker_added: bool,
    container_color: Option<SerializableColor>,
    /// Precomposited background keyed by the background revision it was built from.
    backdrop: Option<(u64, Surface)>,
    drag: Option<Drag>,
}

impl Stickerbook {
    pub fn new(config: StickerbookConfig, container: Container) -> Result<Self> {
        Self::with_registry(config, container, BrushRegistry::new())
    }

    /// Create a widget that also knows the brushes in `registry`.
    pub fn with_registry(config: StickerbookConfig, container: Container, registry: BrushRegistry) -> Result<Self> {
        config.validate_with_custom(&registry.custom_names())?;

        let container_color = match config.container_background.as_deref() {
            Some(css) => Some(parse_css_color(css).ok_or_else(|| ConfigError::invalid("container background", css))?),
            None => None,
        };

        let (width, height) = container.inner_dimensions();
        let canvas = DrawingCanvas::new(width, height)?;
        let mut background = BackgroundManager::new(width, height)?;
        background.set_positioning(config.background.positioning);

        // validation guarantees each list has a first entry
        let state = State {
            brush: config.brush.enabled.first().cloned().unwrap_or_default(),
            brush_width: config.brush.widths.first().copied().unwrap_or(1.0),
            brush_config: BrushConfig::default(),
            color: config.brush.colors.first().cloned().unwrap_or_default(),
            drawing: true,
            background_image: None,
        };

        let mut assets = Assets::new();
        let mut brush = registry.create(&state.brush, &state.brush_config, &mut assets)?;
        brush.set_width(state.brush_width);
        brush.set_color(SerializableColor::from_hex(&state.color).unwrap_or(SerializableColor::black()));

        let mut stickerbook = Self {
            config,
            container,
            state,
            canvas,
            history: HistoryManager::new(),
            background,
            assets,
            registry,
            brush,
            sticker: None,
            sticker_added: false,
            container_color,
            backdrop: None,
            drag: None,
        };

        if let Some(default) = stickerbook.config.background.default.clone() {
            stickerbook.set_background(Some(&default))?;
        }
        log::info!("Stickerbook ready ({width}x{height}, brush {})", stickerbook.state.brush);
        Ok(stickerbook)
    }

    pub fn config(&self) -> &StickerbookConfig {
        &self.config
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn canvas(&self) -> &DrawingCanvas {
        &self.canvas
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn background(&self) -> &BackgroundManager {
        &self.background
    }

    pub fn brush(&self) -> &dyn Strokeable {
        self.brush.as_ref()
    }

    pub fn available_colors(&self) -> &[String] {
        &self.config.brush.colors
    }

    pub fn available_stickers(&self) -> &[String] {
        &self.config.stickers.enabled
    }

    // --- brushes ---

    /// Switch brushes. `config` replaces the current brush configuration;
    /// without it the previous configuration is reused.
    pub fn set_brush(&mut self, name: &str, config: Option<BrushConfig>) -> Result<&mut Self> {
        if !self.config.brush.enabled.iter().any(|b| b == name) {
            return Err(ConfigError::invalid("brush", name).into());
        }
        if !self.registry.contains(name) {
            return Err(ConfigError::UnknownBrush(name.to_string()).into());
        }
        let brush_config = config.unwrap_or_else(|| self.state.brush_config.clone());
        let mut brush = self.registry.create(name, &brush_config, &mut self.assets)?;
        brush.set_width(self.state.brush_width);
        brush.set_color(self.current_color());

        self.with_brush(|old, ctx| old.cancel(ctx))?;
        self.brush = brush;
        self.state.brush = name.to_string();
        self.state.brush_config = brush_config;
        self.enter_drawing_mode();
        log::debug!("Switched to brush {name}");
        self.settle()?;
        Ok(self)
    }

    pub fn set_color(&mut self, color: &str) -> Result<&mut Self> {
        if !self.config.brush.colors.iter().any(|c| c == color) {
            return Err(ConfigError::invalid("color", color).into());
        }
        self.state.color = color.to_string();
        let color = self.current_color();
        self.brush.set_color(color);
        self.enter_drawing_mode();
        Ok(self)
    }

    pub fn set_brush_width(&mut self, width: f64) -> Result<&mut Self> {
        if !self.config.brush.widths.contains(&width) {
            return Err(ConfigError::invalid("brush width", width).into());
        }
        self.state.brush_width = width;
        self.brush.set_width(width);
        self.enter_drawing_mode();
        Ok(self)
    }

    fn current_color(&self) -> SerializableColor {
        SerializableColor::from_hex(&self.state.color).unwrap_or(SerializableColor::black())
    }

    fn enter_drawing_mode(&mut self) {
        self.state.drawing = true;
        self.canvas.set_drawing_mode(true);
        self.drag = None;
    }

    // --- stickers ---

    /// Choose the sticker to place next. It becomes placeable once its image
    /// has loaded; until then [`Stickerbook::place_sticker`] fails.
    pub fn set_sticker(&mut self, url: &str) -> Result<&mut Self> {
        if !self.config.stickers.enabled.iter().any(|s| s == url) {
            return Err(ConfigError::invalid("sticker", url).into());
        }
        let image = self.assets.request(url);
        self.sticker = Some(StickerSlot {
            url: url.to_string(),
            image: None,
        });
        if let Some(image) = image {
            self.sticker_ready(image)?;
        }
        self.settle()?;
        Ok(self)
    }

    pub fn is_sticker_ready(&self) -> bool {
        self.sticker.as_ref().is_some_and(|s| s.image.is_some())
    }

    fn sticker_ready(&mut self, image: Arc<LoadedImage>) -> Result<()> {
        if let Some(slot) = self.sticker.as_mut() {
            log::debug!("Sticker {} ready", slot.url);
            slot.image = Some(image);
        }
        self.with_brush(|brush, ctx| brush.cancel(ctx))?;
        self.state.drawing = false;
        self.canvas.set_drawing_mode(false);
        self.sticker_added = false;
        Ok(())
    }

    /// Place the current sticker and make it the active object.
    pub fn place_sticker(&mut self, options: PlaceOptions) -> Result<&mut Self> {
        self.add_sticker(options)?;
        self.settle()?;
        Ok(self)
    }

    fn add_sticker(&mut self, options: PlaceOptions) -> Result<usize> {
        let image = self
            .sticker
            .as_ref()
            .and_then(|s| s.image.clone())
            .ok_or(StickerbookError::StickerNotReady)?;
        let defaults = self.config.stickers.defaults.clone().unwrap_or_default();
        let (Some(x), Some(y)) = (options.x.or(defaults.x), options.y.or(defaults.y)) else {
            return Err(StickerbookError::MissingStickerPosition);
        };

        let mut snapshot = ObjectSnapshot::new(ObjectKind::Image(image.shape.clone()));
        let presentation = &mut snapshot.presentation;
        presentation.left = x;
        presentation.top = y;
        presentation.scale_x = options.x_scale.or(defaults.x_scale).unwrap_or(1.0);
        presentation.scale_y = options.y_scale.or(defaults.y_scale).unwrap_or(1.0);
        presentation.angle = options.rotation.or(defaults.rotation).unwrap_or(0.0);
        presentation.per_pixel_target_find = true;
        if let Some(controls) = &self.config.stickers.controls {
            presentation.controls = ControlStyle {
                corner_color: SerializableColor::from_hex(&controls.corner_color),
                corner_size: controls.corner_size,
                transparent_corners: false,
            };
            presentation.has_borders = controls.has_borders;
        }

        self.canvas.cache_image(&image.shape, Arc::clone(&image.raster));
        let index = self.canvas.add(DisplayObject::from_snapshot(snapshot));
        self.canvas.set_active_object(index);
        self.sticker_added = true;
        log::debug!("Placed sticker at ({x}, {y}) as object {index}");
        Ok(index)
    }

    /// Topmost sticker on the canvas.
    pub fn get_top_sticker(&self) -> Option<&DisplayObject> {
        self.canvas
            .objects()
            .iter()
            .rev()
            .find(|o| o.as_image().is_some_and(|image| image.src.is_some()))
    }

    // --- background ---

    /// Show `url` behind the drawing, or remove the background with `None`.
    pub fn set_background(&mut self, url: Option<&str>) -> Result<&mut Self> {
        let Some(url) = url else {
            return self.clear_background();
        };
        if !self.config.background.enabled.iter().any(|b| b == url) {
            return Err(ConfigError::invalid("background", url).into());
        }
        self.state.background_image = Some(url.to_string());
        self.background.set_image(Some(url), &mut self.assets);
        Ok(self)
    }

    pub fn clear_background(&mut self) -> Result<&mut Self> {
        self.state.background_image = None;
        self.background.set_image(None, &mut self.assets);
        Ok(self)
    }

    pub fn get_background(&self) -> Option<&str> {
        self.state.background_image.as_deref()
    }

    pub fn set_background_positioning(&mut self, positioning: &str) -> Result<&mut Self> {
        let positioning: BackgroundPositioning = positioning.parse()?;
        self.background.set_positioning(positioning);
        Ok(self)
    }

    // --- history ---

    pub fn undo(&mut self) -> Result<&mut Self> {
        self.history.undo(&mut self.canvas)?;
        self.settle()?;
        Ok(self)
    }

    pub fn redo(&mut self) -> Result<&mut Self> {
        self.history.redo(&mut self.canvas)?;
        self.settle()?;
        Ok(self)
    }

    /// Remove every object and forget the history.
    pub fn clear(&mut self) -> Result<&mut Self> {
        self.with_brush(|brush, ctx| brush.cancel(ctx))?;
        self.drag = None;
        self.canvas.clear();
        self.history.clear();
        self.settle()?;
        Ok(self)
    }

    /// Apply `change` to the object at `index` as one user gesture.
    pub fn modify_object(&mut self, index: usize, change: impl FnOnce(&mut DisplayObject)) -> Result<&mut Self> {
        if let Some(object) = self.canvas.object_mut(index) {
            change(object);
            self.canvas.mark_modified(index);
        }
        self.settle()?;
        Ok(self)
    }

    // --- pointer input ---

    pub fn pointer_down(&mut self, point: Point) -> Result<()> {
        if self.canvas.is_drawing_mode() {
            self.with_brush(|brush, ctx| brush.on_press(ctx, point))?;
        } else {
            self.begin_drag(point);
        }
        self.canvas.fire_pointer(EventKind::MouseDown, point);
        self.settle()
    }

    pub fn pointer_move(&mut self, point: Point) -> Result<()> {
        if self.canvas.is_drawing_mode() {
            self.with_brush(|brush, ctx| brush.on_move(ctx, point))?;
        } else if let Some(drag) = self.drag.as_mut() {
            if let Some(object) = self.canvas.object_mut(drag.index) {
                let position = drag.origin + (point - drag.start);
                object.presentation_mut().left = position.x;
                object.presentation_mut().top = position.y;
                object.set_coords();
                drag.moved = true;
                self.canvas.request_render();
            }
        }
        self.settle()
    }

    pub fn pointer_up(&mut self, point: Point) -> Result<()> {
        if self.canvas.is_drawing_mode() {
            self.with_brush(|brush, ctx| brush.on_release(ctx))?;
        } else if let Some(drag) = self.drag.take() {
            if drag.moved {
                self.canvas.mark_modified(drag.index);
            }
        }
        self.canvas.fire_pointer(EventKind::MouseUp, point);
        self.settle()
    }

    pub fn touch_start(&mut self, point: Point) -> Result<()> {
        if !self.config.mobile_enabled {
            return Ok(());
        }
        self.pointer_down(point)
    }

    pub fn touch_move(&mut self, point: Point) -> Result<()> {
        if !self.config.mobile_enabled {
            return Ok(());
        }
        self.pointer_move(point)
    }

    pub fn touch_end(&mut self, point: Point) -> Result<()> {
        if !self.config.mobile_enabled {
            return Ok(());
        }
        self.pointer_up(point)
    }

    fn begin_drag(&mut self, point: Point) {
        self.drag = None;
        let Some(index) = self.canvas.find_target(point) else {
            self.canvas.discard_active_object();
            return;
        };
        self.canvas.set_active_object(index);
        if let Some(object) = self.canvas.object(index) {
            let presentation = object.presentation();
            self.drag = Some(Drag {
                index,
                start: point,
                origin: Point::new(presentation.left, presentation.top),
                moved: false,
            });
        }
    }

    // --- layout and output ---

    /// Fit the widget to a new container size. Objects are scaled by the
    /// change in width.
    pub fn resize(&mut self, container: Container) -> Result<&mut Self> {
        let (width, height) = container.inner_dimensions();
        let factor = f64::from(width.max(1)) / f64::from(self.canvas.width().max(1));
        for index in 0..self.canvas.objects().len() {
            if let Some(object) = self.canvas.object_mut(index) {
                let presentation = object.presentation_mut();
                presentation.scale_x *= factor;
                presentation.scale_y *= factor;
                presentation.left *= factor;
                presentation.top *= factor;
                object.set_coords();
            }
        }
        self.container = container;
        self.background.resize(width, height)?;
        self.canvas.set_dimensions(width, height)?;
        log::debug!("Resized to {width}x{height} (scale {factor})");
        self.settle()?;
        Ok(self)
    }

    pub fn deselect_all(&mut self) -> Result<&mut Self> {
        self.canvas.discard_active_object();
        self.settle()?;
        Ok(self)
    }

    pub fn trigger_render(&mut self) -> Result<&mut Self> {
        self.canvas.request_render();
        self.settle()?;
        Ok(self)
    }

    /// The background with the drawing on top, as one image.
    pub fn composite(&mut self) -> Result<Surface> {
        self.deselect_all()?;
        let surface = composite_layers(
            self.canvas.width(),
            self.canvas.height(),
            &[self.background.surface(), self.canvas.lower()],
        )?;
        Ok(surface)
    }

    /// Export as a `data:image/png;base64,` URL.
    pub fn to_data_url(&mut self) -> Result<String> {
        Ok(self.composite()?.to_data_url()?)
    }

    pub fn to_png(&mut self) -> Result<Vec<u8>> {
        Ok(self.composite()?.encode_png()?)
    }

    // --- events ---

    /// Subscribe to a named canvas event such as `"path:created"`.
    pub fn on(&mut self, event: &str, handler: impl FnMut(&CanvasEvent) + 'static) -> Result<HandlerId> {
        let kind: EventKind = event.parse().map_err(|_| ConfigError::invalid("event", event))?;
        Ok(self.canvas.bus_mut().on(kind, handler))
    }

    pub fn off(&mut self, event: &str, id: HandlerId) -> Result<bool> {
        let kind: EventKind = event.parse().map_err(|_| ConfigError::invalid("event", event))?;
        Ok(self.canvas.bus_mut().off(kind, id))
    }

    // --- host integration ---

    /// URLs the host has to fetch and hand back through [`Stickerbook::image_loaded`].
    pub fn pending_image_requests(&mut self) -> Vec<String> {
        self.assets.take_requests()
    }

    pub fn image_loaded(&mut self, url: &str, bytes: &[u8]) -> Result<()> {
        self.assets.resolve(url, bytes)?;
        self.background.on_assets_ready(&self.assets);

        let waiting = self
            .sticker
            .as_ref()
            .filter(|slot| slot.image.is_none())
            .and_then(|slot| self.assets.get(&slot.url));
        if let Some(image) = waiting {
            self.sticker_ready(image)?;
        }

        self.with_brush(|brush, ctx| brush.on_assets_ready(ctx))?;
        self.settle()
    }

    /// The host could not fetch `url`. Whatever waits on it stays pending.
    pub fn image_failed(&mut self, url: &str, reason: &str) {
        self.assets.fail(url, reason);
    }

    pub fn wants_animation_frame(&self) -> bool {
        self.brush.wants_frame()
    }

    pub fn animation_frame(&mut self) -> Result<()> {
        if !self.brush.wants_frame() {
            return Ok(());
        }
        self.with_brush(|brush, ctx| brush.on_frame(ctx))?;
        self.settle()
    }

    /// Serve image requests from `loader` and run animation frames until
    /// nothing is left to do.
    pub fn run_until_idle(&mut self, loader: &mut impl ImageLoader) -> Result<()> {
        loop {
            let requests = self.pending_image_requests();
            for url in &requests {
                match loader.load(url) {
                    Ok(bytes) => {
                        if let Err(e) = self.image_loaded(url, &bytes) {
                            log::warn!("Could not use image {url}: {e}");
                        }
                    }
                    Err(reason) => self.image_failed(url, &reason),
                }
            }
            let framed = self.wants_animation_frame();
            if framed {
                self.animation_frame()?;
            }
            if requests.is_empty() && !framed {
                return Ok(());
            }
        }
    }

    /// Tear the widget down, releasing its surfaces.
    pub fn destroy(self) {
        log::info!("Destroying stickerbook with {} objects", self.canvas.objects().len());
    }

    // --- internals ---

    /// Run `f` against the current brush with a fresh context.
    fn with_brush(&mut self, f: impl FnOnce(&mut dyn Strokeable, &mut BrushContext<'_>)) -> Result<()> {
        let revision = self.background.revision();
        if self.backdrop.as_ref().is_none_or(|(r, _)| *r != revision) {
            let surface = self.background.precomposited(self.container_color)?;
            self.backdrop = Some((revision, surface));
        }
        let Some((_, backdrop)) = self.backdrop.as_ref() else {
            return Ok(());
        };
        let mut ctx = BrushContext {
            canvas: &mut self.canvas,
            assets: &mut self.assets,
            backdrop,
        };
        f(self.brush.as_mut(), &mut ctx);
        Ok(())
    }

    /// Dispatch queued events and render until the canvas is quiet.
    fn settle(&mut self) -> Result<()> {
        loop {
            self.dispatch_events()?;
            if !self.canvas.render_requested() {
                return Ok(());
            }
            self.canvas.render_all();
        }
    }

    /// Internal listeners run first, then user handlers.
    fn dispatch_events(&mut self) -> Result<()> {
        while let Some(mut event) = self.canvas.take_event() {
            match event.kind {
                EventKind::ObjectAdded => {
                    if let Some(index) = event.target {
                        handlers::disable_selectability(&mut self.canvas, index);
                        handlers::record_object_addition(&mut self.history, &mut self.canvas, index);
                    }
                }
                EventKind::ObjectModified => {
                    if let Some(index) = event.target {
                        handlers::record_property_change(&mut self.history, &self.canvas, index)?;
                    }
                }
                EventKind::MouseDown if self.config.use_default_event_handlers => {
                    if let Some(point) = event.pointer {
                        self.place_sticker_on_press(point)?;
                    }
                }
                _ => {}
            }
            // ids are assigned while recording, after the event was queued
            if matches!(event.kind, EventKind::ObjectAdded | EventKind::PathCreated) && event.object_id.is_none() {
                event.object_id = event
                    .target
                    .and_then(|index| self.canvas.object(index))
                    .and_then(DisplayObject::id);
            }
            self.canvas.bus_mut().emit(&event);
        }
        Ok(())
    }

    fn place_sticker_on_press(&mut self, point: Point) -> Result<()> {
        if self.state.drawing || self.sticker_added || !self.is_sticker_ready() {
            return Ok(());
        }
        self.add_sticker(PlaceOptions::at(point.x, point.y))?;
        Ok(())
    }
}
