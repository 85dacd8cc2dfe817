//! Host-driven runtime: image loading and animation frames.
//!
//! Nothing here performs I/O. Components ask the [`Assets`] cache for a URL;
//! the host drains the queued requests, fetches the bytes however it likes and
//! hands them back. Until then the asset stays pending.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use stickerbook_core::shapes::{ImageFormat, ImageShape};
use stickerbook_render::{RasterImage, RenderResult};

/// A loaded image: the encoded shape for display objects plus its decoded pixels.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub shape: ImageShape,
    pub raster: Arc<RasterImage>,
}

impl LoadedImage {
    /// Decode `bytes` fetched from `url`.
    pub fn from_bytes(url: &str, bytes: &[u8]) -> RenderResult<Self> {
        let raster = RasterImage::decode(bytes)?;
        let format = ImageFormat::from_magic_bytes(bytes).unwrap_or(ImageFormat::Png);
        let shape = ImageShape::new(bytes, raster.width(), raster.height(), format).with_src(url);
        Ok(Self {
            shape,
            raster: Arc::new(raster),
        })
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }
}

/// Load state of one URL.
#[derive(Debug, Clone)]
pub enum AssetState {
    Pending,
    Ready(Arc<LoadedImage>),
    Failed(String),
}

/// Image cache shared by the background, stickers and brushes.
#[derive(Debug, Default)]
pub struct Assets {
    entries: HashMap<String, AssetState>,
    requests: VecDeque<String>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for `url`. Returns the image right away if it is already loaded;
    /// otherwise queues a request the first time the URL is seen.
    pub fn request(&mut self, url: &str) -> Option<Arc<LoadedImage>> {
        match self.entries.entry(url.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                AssetState::Ready(image) => Some(Arc::clone(image)),
                AssetState::Pending | AssetState::Failed(_) => None,
            },
            Entry::Vacant(entry) => {
                log::debug!("Requesting image {url}");
                entry.insert(AssetState::Pending);
                self.requests.push_back(url.to_string());
                None
            }
        }
    }

    pub fn get(&self, url: &str) -> Option<Arc<LoadedImage>> {
        match self.entries.get(url)? {
            AssetState::Ready(image) => Some(Arc::clone(image)),
            _ => None,
        }
    }

    pub fn state(&self, url: &str) -> Option<&AssetState> {
        self.entries.get(url)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        matches!(self.entries.get(url), Some(AssetState::Pending))
    }

    /// Drain the URLs the host still has to fetch.
    pub fn take_requests(&mut self) -> Vec<String> {
        self.requests.drain(..).collect()
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    /// Store fetched bytes. A decode failure marks the asset failed.
    pub fn resolve(&mut self, url: &str, bytes: &[u8]) -> RenderResult<Arc<LoadedImage>> {
        match LoadedImage::from_bytes(url, bytes) {
            Ok(image) => {
                let image = Arc::new(image);
                log::info!("Loaded image {url} ({}x{})", image.width(), image.height());
                self.entries
                    .insert(url.to_string(), AssetState::Ready(Arc::clone(&image)));
                Ok(image)
            }
            Err(e) => {
                self.fail(url, e.to_string());
                Err(e)
            }
        }
    }

    /// Record that the host could not fetch `url`. Anything waiting on it
    /// stays pending.
    pub fn fail(&mut self, url: &str, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Failed to load image {url}: {reason}");
        self.entries.insert(url.to_string(), AssetState::Failed(reason));
    }
}

/// Fetches image bytes on behalf of the host.
pub trait ImageLoader {
    fn load(&mut self, url: &str) -> Result<Vec<u8>, String>;
}

/// In-memory loader keyed by URL.
impl ImageLoader for HashMap<String, Vec<u8>> {
    fn load(&mut self, url: &str) -> Result<Vec<u8>, String> {
        self.get(url).cloned().ok_or_else(|| format!("{url} not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_1x1() -> Vec<u8> {
        stickerbook_render::encode_png(&[255, 0, 0, 255], 1, 1).unwrap()
    }

    #[test]
    fn test_request_queues_once() {
        let mut assets = Assets::new();
        assert!(assets.request("a.png").is_none());
        assert!(assets.request("a.png").is_none());
        assert_eq!(assets.take_requests(), vec!["a.png".to_string()]);
        assert!(!assets.has_requests());
        assert!(assets.is_pending("a.png"));
    }

    #[test]
    fn test_resolve_makes_ready() {
        let mut assets = Assets::new();
        assets.request("a.png");
        let image = assets.resolve("a.png", &png_1x1()).unwrap();
        assert_eq!((image.width(), image.height()), (1, 1));
        assert_eq!(image.shape.src.as_deref(), Some("a.png"));
        assert_eq!(image.shape.format, ImageFormat::Png);
        assert!(assets.request("a.png").is_some());
    }

    #[test]
    fn test_bad_bytes_fail() {
        let mut assets = Assets::new();
        assets.request("a.png");
        assert!(assets.resolve("a.png", b"nope").is_err());
        assert!(matches!(assets.state("a.png"), Some(AssetState::Failed(_))));
        assert!(assets.get("a.png").is_none());
    }

    #[test]
    fn test_map_loader() {
        let mut loader: HashMap<String, Vec<u8>> = HashMap::new();
        loader.insert("x.png".to_string(), vec![1, 2]);
        assert_eq!(loader.load("x.png"), Ok(vec![1, 2]));
        assert!(loader.load("y.png").is_err());
    }
}
