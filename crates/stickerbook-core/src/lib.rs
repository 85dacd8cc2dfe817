//! Stickerbook Core Library
//!
//! Backend-agnostic data structures and logic for the Stickerbook drawing
//! canvas: display objects, the undo/redo history, flood-fill region selection,
//! color math and configuration.

pub mod color;
pub mod config;
pub mod error;
pub mod history;
pub mod selector;
pub mod shapes;

pub use config::{
    BackgroundPositioning, BrushConfig, StickerbookConfig, StickerControls, StickerDefaults, BUILTIN_BRUSHES,
};
pub use error::{ConfigError, ConfigResult, HistoryError, HistoryResult};
pub use history::{DisplayList, HistoryEntry, HistoryManager, HistoryStep, PropertyChange, PropertyDelta};
pub use selector::{ColorGrid, FuzzySelector, RangeSet, SelectionStep, SelectionStepper, Span};
pub use shapes::{
    CompositeMode, DisplayObject, ObjectId, ObjectKind, ObjectSnapshot, Property, PropertyValue, SerializableColor,
};
