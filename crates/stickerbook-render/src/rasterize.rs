//! Rasterization of display objects onto a surface.

use crate::surface::{Ink, RasterImage, Surface};
use kurbo::{Affine, BezPath, Rect, Shape as _};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use stickerbook_core::shapes::{ImageShape, ObjectKind, ObjectSnapshot, PathShape};
use stickerbook_core::{CompositeMode, SerializableColor};

/// Decoded images keyed by a hash of their encoded data.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<u64, Option<Arc<RasterImage>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an image shape, reusing an earlier decode of the same bytes.
    ///
    /// Failed decodes are remembered so they are only reported once.
    pub fn get_or_decode(&mut self, image: &ImageShape) -> Option<Arc<RasterImage>> {
        let mut hasher = DefaultHasher::new();
        image.data_base64.hash(&mut hasher);
        let key = hasher.finish();

        self.entries
            .entry(key)
            .or_insert_with(|| {
                let decoded = image
                    .data()
                    .ok_or_else(|| "invalid base64".to_string())
                    .and_then(|bytes| RasterImage::decode(&bytes).map_err(|e| e.to_string()));
                match decoded {
                    Ok(raster) => Some(Arc::new(raster)),
                    Err(e) => {
                        log::warn!("Failed to decode image {:?}: {e}", image.src);
                        None
                    }
                }
            })
            .clone()
    }

    /// Seed the cache with an already decoded image.
    pub fn insert(&mut self, image: &ImageShape, raster: Arc<RasterImage>) {
        let mut hasher = DefaultHasher::new();
        image.data_base64.hash(&mut hasher);
        self.entries.insert(hasher.finish(), Some(raster));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Draw `snapshot` onto `target` under the parent transform.
pub fn rasterize(target: &mut Surface, snapshot: &ObjectSnapshot, parent: Affine, images: &mut ImageCache) {
    let transform = parent * snapshot.transform();
    let mode = snapshot.presentation.composite;

    match &snapshot.kind {
        ObjectKind::Path(path) => rasterize_path(target, path, transform, mode),
        ObjectKind::Image(image) => {
            if let Some(raster) = images.get_or_decode(image) {
                target.draw_raster(&raster, transform, mode);
            }
        }
        ObjectKind::Group(group) => {
            if mode.is_erasing() {
                // flatten first so overlapping children erase once
                let Ok(mut layer) = Surface::new(target.width(), target.height()) else {
                    return;
                };
                for child in group.children() {
                    rasterize(&mut layer, child, transform, images);
                }
                target.draw_surface(&layer, tiny_skia::BlendMode::DestinationOut);
            } else {
                for child in group.children() {
                    rasterize(target, child, transform, images);
                }
            }
        }
    }
}

fn rasterize_path(target: &mut Surface, shape: &PathShape, transform: Affine, mode: CompositeMode) {
    if let Some(fill) = shape.fill {
        target.fill_path(&shape.path, transform, Ink::Solid(fill), mode);
    }
    if let Some(stroke) = shape.stroke {
        target.stroke_path(&shape.path, transform, Ink::Solid(stroke), shape.stroke_width, mode);
    }
}

/// Selection border and corner handles for the active object.
pub fn draw_controls(target: &mut Surface, snapshot: &ObjectSnapshot) {
    let p = &snapshot.presentation;
    if !p.has_borders && !p.has_controls {
        return;
    }
    let local = snapshot.kind.local_bounds();
    let transform = snapshot.transform();
    let border_color = SerializableColor::new(102, 153, 255, 191);

    if p.has_borders {
        let outline = transform * local.to_path(0.1);
        target.stroke_path(&outline, Affine::IDENTITY, Ink::Solid(border_color), 1.0, CompositeMode::SourceOver);
    }

    if p.has_controls {
        let color = p.controls.corner_color.unwrap_or(border_color);
        let half = p.controls.corner_size / 2.0;
        for corner in [
            local.origin(),
            kurbo::Point::new(local.x1, local.y0),
            kurbo::Point::new(local.x1, local.y1),
            kurbo::Point::new(local.x0, local.y1),
        ] {
            let center = transform * corner;
            let handle: BezPath = Rect::new(center.x - half, center.y - half, center.x + half, center.y + half).to_path(0.1);
            if p.controls.transparent_corners {
                target.stroke_path(&handle, Affine::IDENTITY, Ink::Solid(color), 1.0, CompositeMode::SourceOver);
            } else {
                target.fill_path(&handle, Affine::IDENTITY, Ink::Solid(color), CompositeMode::SourceOver);
            }
        }
    }
}
