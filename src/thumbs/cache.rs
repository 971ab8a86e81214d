use std::{collections::HashMap, sync::Arc};

use crate::{
    foundation::error::AvatarResult,
    recipe::model::{AssetRef, Recipe},
    render::backend::Bitmap,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Structural cache key: the candidate plus the complete recipe it would produce.
pub struct ThumbKey {
    /// Layer the candidate belongs to.
    pub layer: String,
    /// Candidate asset for `layer`.
    pub candidate: AssetRef,
    /// Baseline recipe with `layer` overridden by `candidate`.
    pub probe: Recipe,
}

impl ThumbKey {
    /// Key for previewing `candidate` on top of `baseline`.
    pub fn new(layer: &str, candidate: &AssetRef, baseline: &Recipe) -> Self {
        Self {
            layer: layer.to_owned(),
            candidate: candidate.clone(),
            probe: baseline.with_override(layer, candidate.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Cache counters.
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that invoked the renderer.
    pub misses: u64,
    /// Entries dropped by invalidation.
    pub evicted: u64,
}

/// Memo of rendered picker thumbnails.
///
/// Entries are keyed structurally by [`ThumbKey`], so a thumbnail rendered for one recipe can
/// never be served for another. Callers clear the whole cache when the background or the whole
/// recipe changes and drop one layer's entries after a single-layer pick.
#[derive(Debug, Default)]
pub struct ThumbnailCache {
    entries: HashMap<ThumbKey, Arc<Bitmap>>,
    stats: CacheStats,
}

impl ThumbnailCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the thumbnail of `candidate` for `layer` over `baseline`, rendering on miss.
    ///
    /// `render` receives the probe recipe. Failed renders are not cached.
    pub fn get_or_render<F>(
        &mut self,
        layer: &str,
        candidate: &AssetRef,
        baseline: &Recipe,
        render: F,
    ) -> AvatarResult<Arc<Bitmap>>
    where
        F: FnOnce(&Recipe) -> AvatarResult<Bitmap>,
    {
        let key = ThumbKey::new(layer, candidate, baseline);
        if let Some(hit) = self.entries.get(&key) {
            self.stats.hits += 1;
            return Ok(Arc::clone(hit));
        }

        self.stats.misses += 1;
        tracing::debug!(layer, candidate = %candidate, "thumbnail cache miss");
        let bitmap = Arc::new(render(&key.probe)?);
        self.entries.insert(key, Arc::clone(&bitmap));
        Ok(bitmap)
    }

    /// Cached thumbnail without rendering.
    pub fn peek(&self, layer: &str, candidate: &AssetRef, baseline: &Recipe) -> Option<Arc<Bitmap>> {
        self.entries
            .get(&ThumbKey::new(layer, candidate, baseline))
            .cloned()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        let n = self.entries.len();
        self.entries.clear();
        self.stats.evicted += n as u64;
        if n > 0 {
            tracing::debug!(evicted = n, "thumbnail cache cleared");
        }
    }

    /// Drop every entry whose key belongs to `layer`. Returns the number dropped.
    pub fn invalidate_layer(&mut self, layer: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.layer != layer);
        let n = before - self.entries.len();
        self.stats.evicted += n as u64;
        if n > 0 {
            tracing::debug!(layer, evicted = n, "thumbnail cache layer invalidated");
        }
        n
    }

    /// Number of cached thumbnails.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
#[path = "../../tests/unit/thumbs/cache.rs"]
mod tests;
