//! Raster drawing surfaces backed by tiny-skia pixmaps.
//!
//! Pixmaps hold premultiplied RGBA. Everything that leaves this module as
//! plain bytes (image data for the region selector, PNG export) is
//! demultiplied first.

use crate::error::{RenderError, RenderResult};
use kurbo::{Affine, BezPath, PathEl, Point};
use stickerbook_core::selector::ColorGrid;
use stickerbook_core::{CompositeMode, SerializableColor};
use tiny_skia::{
    BlendMode, Color, ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pattern, Pixmap,
    PixmapPaint, SpreadMode, Stroke, Transform,
};

/// What a path is painted with.
#[derive(Debug, Clone, Copy)]
pub enum Ink<'a> {
    Solid(SerializableColor),
    /// Sample another pixmap at the same canvas coordinates.
    Pattern(&'a Pixmap),
}

/// A decoded, immutable raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixmap: Pixmap,
}

impl RasterImage {
    /// Decode PNG/JPEG/WebP bytes.
    pub fn decode(bytes: &[u8]) -> RenderResult<Self> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba(width, height, decoded.as_raw())
    }

    /// Build from straight-alpha RGBA bytes.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> RenderResult<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(Self { pixmap })
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height().max(1) as f64
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// A copy with every pixel's color replaced by `color`, keeping its alpha.
    pub fn recolored(&self, color: SerializableColor) -> Self {
        let mut pixmap = self.pixmap.clone();
        for pixel in pixmap.pixels_mut() {
            let alpha = pixel.alpha();
            *pixel = ColorU8::from_rgba(color.r, color.g, color.b, alpha).premultiply();
        }
        Self { pixmap }
    }

    /// Straight-alpha RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        demultiplied(&self.pixmap)
    }
}

/// A mutable drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    /// Create a transparent surface.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width.max(1), height.max(1)).ok_or(RenderError::Surface { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Reallocate at a new size. Contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        *self = Self::new(width, height)?;
        Ok(())
    }

    /// Make every pixel transparent.
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// Fill the whole surface with a color.
    pub fn fill_color(&mut self, color: SerializableColor) {
        self.pixmap.fill(to_skia_color(color));
    }

    /// Stroke a path with round caps and joins.
    pub fn stroke_path(&mut self, path: &BezPath, transform: Affine, ink: Ink<'_>, width: f64, mode: CompositeMode) {
        let Some(path) = to_skia_path(path) else {
            return;
        };
        let paint = make_paint(ink, blend_mode(mode));
        let stroke = Stroke {
            width: width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, to_skia_transform(transform), None);
    }

    pub fn fill_path(&mut self, path: &BezPath, transform: Affine, ink: Ink<'_>, mode: CompositeMode) {
        let Some(path) = to_skia_path(path) else {
            return;
        };
        let paint = make_paint(ink, blend_mode(mode));
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, to_skia_transform(transform), None);
    }

    pub fn fill_circle(&mut self, center: Point, radius: f64, color: SerializableColor) {
        if radius <= 0.0 {
            return;
        }
        let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32) else {
            return;
        };
        let paint = make_paint(Ink::Solid(color), BlendMode::SourceOver);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    /// Draw an image with its natural size mapped through `transform`.
    pub fn draw_raster(&mut self, image: &RasterImage, transform: Affine, mode: CompositeMode) {
        self.draw_pixmap(image.pixmap(), transform, blend_mode(mode));
    }

    /// Draw another surface 1:1 at the origin.
    pub fn draw_surface(&mut self, other: &Surface, blend: BlendMode) {
        self.draw_pixmap(other.pixmap(), Affine::IDENTITY, blend);
    }

    fn draw_pixmap(&mut self, pixmap: &Pixmap, transform: Affine, blend: BlendMode) {
        let paint = PixmapPaint {
            opacity: 1.0,
            blend_mode: blend,
            quality: FilterQuality::Bilinear,
        };
        self.pixmap
            .draw_pixmap(0, 0, pixmap.as_ref(), &paint, to_skia_transform(transform), None);
    }

    /// Color at a pixel, demultiplied.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// True when no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    /// Straight-alpha RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        demultiplied(&self.pixmap)
    }

    /// Pixel data for region selection.
    pub fn image_data(&self) -> ColorGrid {
        let (width, height) = (self.width(), self.height());
        ColorGrid::from_rgba(width, height, self.to_rgba()).unwrap_or_else(|| ColorGrid::uniform(width, height, [0; 4]))
    }

    /// Copy the current contents into an immutable image.
    pub fn to_raster(&self) -> RasterImage {
        RasterImage::from_pixmap(self.pixmap.clone())
    }
}

fn demultiplied(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

fn make_paint(ink: Ink<'_>, blend: BlendMode) -> Paint<'_> {
    let mut paint = Paint {
        anti_alias: true,
        blend_mode: blend,
        ..Default::default()
    };
    match ink {
        Ink::Solid(color) => paint.set_color(to_skia_color(color)),
        Ink::Pattern(pixmap) => {
            paint.shader = Pattern::new(
                pixmap.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Nearest,
                1.0,
                Transform::identity(),
            );
        }
    }
    paint
}

pub(crate) fn blend_mode(mode: CompositeMode) -> BlendMode {
    match mode {
        CompositeMode::SourceOver => BlendMode::SourceOver,
        CompositeMode::DestinationOut => BlendMode::DestinationOut,
    }
}

pub(crate) fn to_skia_color(color: SerializableColor) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a)
}

pub(crate) fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

pub(crate) fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> SerializableColor {
        SerializableColor::new(255, 0, 0, 255)
    }

    fn line(from: (f64, f64), to: (f64, f64)) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(from);
        path.line_to(to);
        path
    }

    #[test]
    fn test_surface_creation() {
        let surface = Surface::new(40, 30).unwrap();
        assert_eq!(surface.width(), 40);
        assert_eq!(surface.height(), 30);
        assert!(surface.is_blank());
    }

    #[test]
    fn test_stroke_and_destination_out() {
        let mut surface = Surface::new(20, 20).unwrap();
        surface.stroke_path(&line((0.0, 10.0), (20.0, 10.0)), Affine::IDENTITY, Ink::Solid(red()), 4.0, CompositeMode::SourceOver);
        assert_eq!(surface.pixel(10, 10), Some([255, 0, 0, 255]));

        let black = SerializableColor::black();
        surface.stroke_path(&line((0.0, 10.0), (20.0, 10.0)), Affine::IDENTITY, Ink::Solid(black), 6.0, CompositeMode::DestinationOut);
        assert_eq!(surface.pixel(10, 10).map(|p| p[3]), Some(0));
        assert!(surface.is_blank());
    }

    #[test]
    fn test_pattern_ink_samples_source() {
        let mut source = Surface::new(10, 10).unwrap();
        source.fill_color(SerializableColor::new(0, 0, 255, 255));
        let mut surface = Surface::new(10, 10).unwrap();
        surface.stroke_path(&line((0.0, 5.0), (10.0, 5.0)), Affine::IDENTITY, Ink::Pattern(source.pixmap()), 4.0, CompositeMode::SourceOver);
        assert_eq!(surface.pixel(5, 5), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_image_data_is_demultiplied() {
        let mut surface = Surface::new(2, 2).unwrap();
        surface.fill_color(SerializableColor::new(200, 100, 0, 255));
        let grid = surface.image_data();
        assert_eq!(grid.get(1, 1), Some([200, 100, 0, 255]));
    }

    #[test]
    fn test_raster_from_rgba_and_recolor() {
        let rgba = [10, 20, 30, 255, 0, 0, 0, 0];
        let image = RasterImage::from_rgba(2, 1, &rgba).unwrap();
        assert_eq!(image.aspect_ratio(), 2.0);
        let recolored = image.recolored(SerializableColor::new(0, 255, 0, 255)).to_rgba();
        assert_eq!(&recolored[0..4], &[0, 255, 0, 255]);
        assert_eq!(recolored[7], 0);
    }

    #[test]
    fn test_draw_raster_scaled() {
        let image = RasterImage::from_rgba(1, 1, &[255, 0, 0, 255]).unwrap();
        let mut surface = Surface::new(10, 10).unwrap();
        surface.draw_raster(&image, Affine::translate((2.0, 2.0)) * Affine::scale(4.0), CompositeMode::SourceOver);
        assert_eq!(surface.pixel(4, 4).map(|p| p[3]), Some(255));
        assert_eq!(surface.pixel(8, 8).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_transform_conversion() {
        let t = to_skia_transform(Affine::translate((3.0, 4.0)) * Affine::scale(2.0));
        assert_eq!((t.sx, t.sy, t.tx, t.ty), (2.0, 2.0, 3.0, 4.0));
    }
}
