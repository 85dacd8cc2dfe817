//! PNG and data-URL export.

use crate::error::RenderResult;
use crate::surface::Surface;
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encode straight-alpha RGBA bytes as PNG.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> RenderResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().inspect_err(|e| {
            log::error!("Failed to write PNG header: {:?}", e);
        })?;
        writer.write_image_data(rgba_data).inspect_err(|e| {
            log::error!("Failed to write PNG data: {:?}", e);
        })?;
    }

    Ok(png_data)
}

/// Wrap PNG bytes in a `data:` URL.
pub fn png_data_url(png_data: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png_data))
}

/// Stack `layers` bottom to top into a fresh surface of the given size.
pub fn composite_layers(width: u32, height: u32, layers: &[&Surface]) -> RenderResult<Surface> {
    let mut out = Surface::new(width, height)?;
    for layer in layers {
        out.draw_surface(layer, tiny_skia::BlendMode::SourceOver);
    }
    Ok(out)
}

impl Surface {
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        encode_png(&self.to_rgba(), self.width(), self.height())
    }

    /// The surface as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self) -> RenderResult<String> {
        Ok(png_data_url(&self.encode_png()?))
    }
}
