//! Errors surfaced by the widget.

use stickerbook_core::{ConfigError, HistoryError};
use stickerbook_render::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StickerbookError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("No sticker has been loaded yet")]
    StickerNotReady,
    #[error("To place a sticker an x and y must be provided if there is no default")]
    MissingStickerPosition,
}

/// Result type for widget operations.
pub type Result<T> = std::result::Result<T, StickerbookError>;
