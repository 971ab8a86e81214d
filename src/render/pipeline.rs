use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    catalog::index::AssetIndex,
    foundation::{color::Rgb8, core::Canvas, error::AvatarResult},
    manifest::model::Manifest,
    recipe::{
        model::{ModeSelections, Recipe},
        path::{AssetPath, resolve_path},
    },
    render::{
        backend::{Bitmap, DrawSurface, LayerImage},
        loader::ImageLoader,
    },
};

#[derive(Clone, Copy, Debug)]
/// Everything one render pass reads. Borrowed, so the pass works on a consistent snapshot.
pub struct RenderRequest<'a> {
    /// Layer order.
    pub manifest: &'a Manifest,
    /// Catalog used to disambiguate legacy references.
    pub index: &'a AssetIndex,
    /// Recipe to draw.
    pub recipe: &'a Recipe,
    /// Per-layer selected modes.
    pub modes: &'a ModeSelections,
    /// Canvas fill, `None` for a transparent canvas.
    pub background: Option<Rgb8>,
    /// Output size.
    pub canvas: Canvas,
}

impl RenderRequest<'_> {
    /// Asset paths to draw, bottom to top. Omitted layers are skipped.
    pub fn layer_paths(&self) -> Vec<AssetPath> {
        self.manifest
            .layers
            .iter()
            .filter_map(|spec| {
                let asset = self.recipe.get(&spec.name)?;
                resolve_path(&spec.name, asset, self.modes, Some(self.recipe), self.index)
            })
            .collect()
    }
}

/// Load every layer of `req` and composite them.
///
/// Loads fan out across the rayon pool and are joined before drawing; the first failed load
/// aborts the pass with [`crate::AvatarError::AssetLoad`] and nothing is drawn.
#[tracing::instrument(skip_all, fields(recipe = req.recipe.fingerprint(), width = req.canvas.width))]
pub fn render_recipe(
    req: &RenderRequest<'_>,
    loader: &dyn ImageLoader,
    surface: &dyn DrawSurface,
) -> AvatarResult<Bitmap> {
    let paths = req.layer_paths();
    let images = paths
        .par_iter()
        .map(|path| loader.load(path))
        .collect::<AvatarResult<Vec<Arc<LayerImage>>>>()?;

    tracing::debug!(layers = images.len(), "layers loaded");
    surface.render(&images, req.background, req.canvas)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
