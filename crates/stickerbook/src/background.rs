//! Background layer: a raster image beneath the drawing, outside undo history.

use crate::runtime::{Assets, LoadedImage};
use kurbo::Affine;
use std::sync::Arc;
use stickerbook_core::color::precomposite_over_white;
use stickerbook_core::{BackgroundPositioning, CompositeMode, SerializableColor};
use stickerbook_render::{RenderResult, Surface};
use tiny_skia::BlendMode;

/// Where the background image was drawn, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    /// Fit an image of `image_size` into `canvas_size` according to `positioning`.
    pub fn compute(positioning: BackgroundPositioning, image_size: (f64, f64), canvas_size: (f64, f64)) -> Self {
        let (image_width, image_height) = image_size;
        let (canvas_width, canvas_height) = canvas_size;
        let aspect_ratio = image_width / image_height.max(1.0);
        match positioning {
            BackgroundPositioning::FitHeight | BackgroundPositioning::FitHeightNoRescale => {
                let width = canvas_height * aspect_ratio;
                Self {
                    left: (canvas_width - width) / 2.0,
                    top: 0.0,
                    width,
                    height: canvas_height,
                }
            }
            BackgroundPositioning::FitWidth | BackgroundPositioning::FitWidthNoRescale => {
                let height = canvas_width / aspect_ratio;
                Self {
                    left: 0.0,
                    top: (canvas_height - height) / 2.0,
                    width: canvas_width,
                    height,
                }
            }
            BackgroundPositioning::Default => Self {
                left: 0.0,
                top: 0.0,
                width: image_width,
                height: image_height,
            },
        }
    }
}

/// Owns the background surface and decides where the image goes.
#[derive(Debug)]
pub struct BackgroundManager {
    surface: Surface,
    image_src: Option<String>,
    image: Option<Arc<LoadedImage>>,
    positioning: BackgroundPositioning,
    /// Placement from the first successful render; `None` until then.
    first_render: Option<Placement>,
    placement: Option<Placement>,
    render_pending: bool,
    /// Bumped whenever the surface contents change.
    revision: u64,
}

impl BackgroundManager {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        Ok(Self {
            surface: Surface::new(width, height)?,
            image_src: None,
            image: None,
            positioning: BackgroundPositioning::Default,
            first_render: None,
            placement: None,
            render_pending: false,
            revision: 0,
        })
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn image_src(&self) -> Option<&str> {
        self.image_src.as_deref()
    }

    pub fn positioning(&self) -> BackgroundPositioning {
        self.positioning
    }

    /// Placement of the last render, if an image is showing.
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// A render was asked for while the image was still loading.
    pub fn is_render_pending(&self) -> bool {
        self.render_pending
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Switch to `src` (or remove the background) and render once it is available.
    pub fn set_image(&mut self, src: Option<&str>, assets: &mut Assets) {
        self.image_src = src.map(str::to_string);
        self.image = src.and_then(|url| assets.request(url));
        self.render();
    }

    /// Change positioning. The next render counts as the first one again.
    pub fn set_positioning(&mut self, positioning: BackgroundPositioning) {
        self.positioning = positioning;
        self.first_render = None;
        self.render();
    }

    /// Pick up the image if the host just delivered it.
    pub fn on_assets_ready(&mut self, assets: &Assets) {
        if self.image.is_some() {
            return;
        }
        let Some(src) = self.image_src.as_deref() else {
            return;
        };
        self.image = assets.get(src);
        if self.image.is_some() && self.render_pending {
            self.render();
        }
    }

    /// Resize the layer to the canvas dimensions and re-render.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.surface.resize(width, height)?;
        self.revision += 1;
        self.render();
        Ok(())
    }

    pub fn render(&mut self) {
        if self.image_src.is_none() {
            self.render_pending = false;
            self.placement = None;
            self.surface.clear();
            self.revision += 1;
            return;
        }
        let Some(image) = self.image.clone() else {
            self.render_pending = true;
            return;
        };
        self.render_pending = false;

        let canvas_size = (f64::from(self.surface.width()), f64::from(self.surface.height()));
        let image_size = (f64::from(image.width()), f64::from(image.height()));
        let computed = Placement::compute(self.positioning, image_size, canvas_size);
        let placement = match self.first_render {
            Some(first) if self.positioning.is_frozen() => first,
            Some(_) => computed,
            None => {
                self.first_render = Some(computed);
                computed
            }
        };

        let transform = Affine::translate((placement.left, placement.top))
            * Affine::scale_non_uniform(
                placement.width / image_size.0.max(1.0),
                placement.height / image_size.1.max(1.0),
            );
        self.surface.clear();
        self.surface
            .draw_raster(&image.raster, transform, CompositeMode::SourceOver);
        self.placement = Some(placement);
        self.revision += 1;
        log::debug!("Rendered background {placement:?}");
    }

    /// The background as the user sees it: the layer over the container
    /// color, over opaque white.
    pub fn precomposited(&self, container: Option<SerializableColor>) -> RenderResult<Surface> {
        let mut out = Surface::new(self.surface.width(), self.surface.height())?;
        out.fill_color(precomposite_over_white(container.unwrap_or(SerializableColor::transparent())));
        out.draw_surface(&self.surface, BlendMode::SourceOver);
        Ok(out)
    }
}
