//! Rendering backend errors.

use thiserror::Error;

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },
    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("PNG encode failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
