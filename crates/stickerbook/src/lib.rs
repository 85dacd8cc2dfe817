//! Stickerbook
//!
//! A drawing canvas widget: freehand and stamp brushes, flood fill, stickers
//! and a background image, with undo/redo of everything drawn. Image loading
//! and animation frames are driven by the host.

pub mod background;
pub mod brushes;
mod container;
mod error;
mod handlers;
pub mod runtime;
mod stickerbook;

pub use background::{BackgroundManager, Placement};
pub use brushes::{BrushContext, BrushFactory, BrushRegistry, BrushStyle, Strokeable};
pub use container::{Container, Padding};
pub use error::{Result, StickerbookError};
pub use runtime::{AssetState, Assets, ImageLoader, LoadedImage};
pub use stickerbook::{PlaceOptions, State, Stickerbook};

pub use stickerbook_core as core;
pub use stickerbook_render as render;
