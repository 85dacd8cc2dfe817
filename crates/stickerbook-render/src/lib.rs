//! Stickerbook Render Library
//!
//! CPU rendering backend for the Stickerbook canvas: tiny-skia surfaces, the
//! retained display-list canvas with its event bus, and PNG export.

pub mod canvas;
mod error;
pub mod export;
pub mod rasterize;
pub mod surface;

pub use canvas::{CanvasEvent, DrawingCanvas, EventBus, EventKind, HandlerId};
pub use error::{RenderError, RenderResult};
pub use export::{composite_layers, encode_png, png_data_url};
pub use rasterize::ImageCache;
pub use surface::{Ink, RasterImage, Surface};
