use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    foundation::error::{AvatarError, AvatarResult},
    recipe::path::AssetPath,
    render::backend::LayerImage,
};

/// Image-loading collaborator.
///
/// Fails with [`AvatarError::AssetLoad`] when the resource is absent or cannot be decoded.
/// Implementations must be shareable across the per-layer fan-out.
pub trait ImageLoader: Send + Sync {
    /// Fetch and decode the image at `path`.
    fn load(&self, path: &AssetPath) -> AvatarResult<Arc<LayerImage>>;
}

/// Loads images from an assets root on disk, decoding each path at most once.
#[derive(Debug)]
pub struct FsImageLoader {
    root: PathBuf,
    decoded: Mutex<HashMap<AssetPath, Arc<LayerImage>>>,
    decode_count: AtomicU64,
}

impl FsImageLoader {
    /// Loader reading below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            decoded: Mutex::new(HashMap::new()),
            decode_count: AtomicU64::new(0),
        }
    }

    /// Assets root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of successful decodes performed so far.
    pub fn decode_count(&self) -> u64 {
        self.decode_count.load(Ordering::Relaxed)
    }

    /// Drop every memoized image (e.g. after the catalog was regenerated on disk).
    pub fn clear(&self) {
        if let Ok(mut memo) = self.decoded.lock() {
            memo.clear();
        }
    }

    fn memoized(&self, path: &AssetPath) -> Option<Arc<LayerImage>> {
        self.decoded.lock().ok()?.get(path).cloned()
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, path: &AssetPath) -> AvatarResult<Arc<LayerImage>> {
        if let Some(img) = self.memoized(path) {
            return Ok(img);
        }

        let file = path.under(&self.root);
        let bytes = std::fs::read(&file)
            .map_err(|e| AvatarError::asset_load(path.as_str(), format!("read failed: {e}")))?;
        let img = LayerImage::decode(&bytes)
            .map_err(|e| AvatarError::asset_load(path.as_str(), e.to_string()))?;
        let img = Arc::new(img);

        self.decode_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %path, "decoded layer image");
        if let Ok(mut memo) = self.decoded.lock() {
            memo.insert(path.clone(), Arc::clone(&img));
        }
        Ok(img)
    }
}

/// Serves pre-fetched images from memory.
#[derive(Debug, Default)]
pub struct MemoryImageLoader {
    images: HashMap<String, Arc<LayerImage>>,
    load_count: AtomicU64,
}

impl MemoryImageLoader {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `image` under the relative path `path` (`layer/file` or `layer/mode/file`).
    pub fn insert(&mut self, path: impl Into<String>, image: LayerImage) {
        self.images.insert(path.into(), Arc::new(image));
    }

    /// Builder-style [`MemoryImageLoader::insert`].
    pub fn with(mut self, path: impl Into<String>, image: LayerImage) -> Self {
        self.insert(path, image);
        self
    }

    /// Number of `load` calls answered so far (hits and misses).
    pub fn load_count(&self) -> u64 {
        self.load_count.load(Ordering::Relaxed)
    }
}

impl ImageLoader for MemoryImageLoader {
    fn load(&self, path: &AssetPath) -> AvatarResult<Arc<LayerImage>> {
        self.load_count.fetch_add(1, Ordering::Relaxed);
        self.images
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| AvatarError::asset_load(path.as_str(), "not found"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/loader.rs"]
mod tests;
