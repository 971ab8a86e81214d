use std::{path::Path, sync::Arc};

use crate::{
    catalog::index::AssetIndex,
    foundation::{
        color::Rgb8,
        core::Canvas,
        error::{AvatarError, AvatarResult},
    },
    manifest::model::Manifest,
    recipe::{
        model::{AssetRef, ModeSelections, Recipe},
        path::{infer_mode, resolve_path},
        random::RandomSource,
        resolver::{default_resolution, resolve},
    },
    render::{
        backend::{Bitmap, DrawSurface},
        loader::ImageLoader,
        pipeline::{RenderRequest, render_recipe},
    },
    session::background::BackgroundState,
    thumbs::cache::ThumbnailCache,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Output sizes used by a session.
pub struct RenderOpts {
    /// Preview/export canvas.
    pub preview: Canvas,
    /// Picker thumbnail canvas.
    pub thumbnail: Canvas,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            preview: Canvas::PREVIEW,
            thumbnail: Canvas::THUMBNAIL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Session lifecycle.
pub enum SessionPhase {
    /// No recipe yet.
    Uninitialized,
    /// A recipe is present.
    Ready,
}

#[derive(Clone, Debug)]
/// Snapshot of everything a render pass needs, tagged with the generation it was taken at.
///
/// Rendering a ticket reads only the snapshot, so it may run while the session keeps changing;
/// [`Session::commit_render`] drops the result if a newer generation exists by then.
pub struct RenderTicket {
    generation: u64,
    manifest: Arc<Manifest>,
    index: Arc<AssetIndex>,
    recipe: Recipe,
    modes: ModeSelections,
    background: Option<Rgb8>,
    canvas: Canvas,
}

impl RenderTicket {
    /// Generation the snapshot was taken at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Recipe being drawn.
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Borrowed render request over the snapshot.
    pub fn request(&self) -> RenderRequest<'_> {
        RenderRequest {
            manifest: &self.manifest,
            index: &self.index,
            recipe: &self.recipe,
            modes: &self.modes,
            background: self.background,
            canvas: self.canvas,
        }
    }

    /// Load and composite the snapshot.
    pub fn render(
        &self,
        loader: &dyn ImageLoader,
        surface: &dyn DrawSurface,
    ) -> AvatarResult<Bitmap> {
        render_recipe(&self.request(), loader, surface)
    }
}

#[derive(Clone, Debug)]
/// Result of [`Session::commit_render`].
pub enum RenderOutcome {
    /// The frame is now the session's current frame.
    Committed(Arc<Bitmap>),
    /// A newer generation started after the ticket was taken; the frame was dropped.
    Stale,
}

#[derive(Clone, Debug)]
/// One cell of the picker grid.
pub struct ThumbnailEntry {
    /// Asset the cell selects.
    pub candidate: AssetRef,
    /// Rendered preview; `None` when rendering failed (shown as a placeholder).
    pub image: Option<Arc<Bitmap>>,
    /// `true` if the candidate is the layer's current pick.
    pub selected: bool,
}

/// Owned state of one composing session.
///
/// Holds the current recipe, the per-layer mode memory, the background choice, the active
/// picker tab and the thumbnail cache. Every mutation that changes what would be drawn bumps the
/// render generation.
#[derive(Debug)]
pub struct Session {
    manifest: Arc<Manifest>,
    index: Arc<AssetIndex>,
    recipe: Option<Recipe>,
    modes: ModeSelections,
    background: BackgroundState,
    active_tab: Option<String>,
    thumbs: ThumbnailCache,
    generation: u64,
    frame: Option<Arc<Bitmap>>,
    opts: RenderOpts,
}

impl Session {
    /// Start a session over a validated manifest and a catalog.
    ///
    /// The first manifest layer becomes the active tab.
    pub fn new(manifest: Manifest, index: AssetIndex) -> AvatarResult<Self> {
        manifest.validate()?;
        let active_tab = manifest.layers.first().map(|l| l.name.clone());
        Ok(Self {
            manifest: Arc::new(manifest),
            index: Arc::new(index),
            recipe: None,
            modes: ModeSelections::new(),
            background: BackgroundState::default(),
            active_tab,
            thumbs: ThumbnailCache::new(),
            generation: 0,
            frame: None,
            opts: RenderOpts::default(),
        })
    }

    /// Load manifest and catalog JSON files. Any failure is a [`AvatarError::ConfigLoad`].
    pub fn from_paths(manifest: impl AsRef<Path>, index: impl AsRef<Path>) -> AvatarResult<Self> {
        Self::new(Manifest::from_path(manifest)?, AssetIndex::from_path(index)?)
    }

    /// Override output sizes.
    pub fn with_render_opts(mut self, opts: RenderOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Layer definitions.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Current catalog.
    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    /// Current recipe, if any.
    pub fn recipe(&self) -> Option<&Recipe> {
        self.recipe.as_ref()
    }

    /// Per-layer mode memory.
    pub fn selected_modes(&self) -> &ModeSelections {
        &self.modes
    }

    /// Background color state.
    pub fn background(&self) -> &BackgroundState {
        &self.background
    }

    /// Layer whose picker is shown.
    pub fn active_tab(&self) -> Option<&str> {
        self.active_tab.as_deref()
    }

    /// Thumbnail memo.
    pub fn thumbnail_cache(&self) -> &ThumbnailCache {
        &self.thumbs
    }

    /// Current render generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last successfully committed preview frame.
    pub fn last_frame(&self) -> Option<&Arc<Bitmap>> {
        self.frame.as_ref()
    }

    /// Output sizes.
    pub fn render_opts(&self) -> RenderOpts {
        self.opts
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if self.recipe.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Uninitialized
        }
    }

    /// Replace the recipe with a freshly resolved one.
    ///
    /// On failure (e.g. [`AvatarError::EmptyAssetPool`]) the session is left untouched.
    pub fn generate<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> AvatarResult<&Recipe> {
        let res = resolve(&self.manifest, &self.index, &self.modes, rng)?;
        self.modes = res.modes;
        self.thumbs.clear();
        self.bump();
        tracing::info!(
            generation = self.generation,
            recipe = res.recipe.fingerprint(),
            "generated recipe"
        );
        Ok(&*self.recipe.insert(res.recipe))
    }

    /// Overwrite one layer's entry, synthesizing the default recipe first if needed.
    ///
    /// Required layers cannot be set to [`AssetRef::None`]. Picking a moded asset also records its
    /// mode as the layer's selected mode.
    pub fn select_asset(&mut self, layer: &str, asset: AssetRef) -> AvatarResult<()> {
        let required = self.manifest.require_layer(layer)?.required;
        if required && asset.is_none() {
            return Err(AvatarError::validation(format!(
                "required layer '{layer}' cannot be omitted"
            )));
        }

        if let AssetRef::Moded(mode, _) = &asset {
            self.modes.insert(layer.to_owned(), mode.clone());
        }
        tracing::debug!(layer, asset = %asset, "asset selected");
        self.ensure_recipe().set(layer, asset);
        self.thumbs.invalidate_layer(layer);
        self.bump();
        Ok(())
    }

    /// Switch a moded layer to `mode`.
    ///
    /// Keeps the current filename if `mode` offers it, otherwise takes the mode's first asset.
    /// An omitted layer stays omitted but remembers the mode. Returns `false` (and changes
    /// nothing) before the first recipe exists or when the layer is not moded.
    pub fn select_color_mode(&mut self, layer: &str, mode: &str) -> AvatarResult<bool> {
        self.manifest.require_layer(layer)?;
        let Some(recipe) = self.recipe.as_ref() else {
            tracing::debug!(layer, mode, "no recipe yet, mode selection ignored");
            return Ok(false);
        };
        if !self.index.is_moded_layer(layer) {
            return Ok(false);
        }
        if !self.index.has_mode(layer, mode) {
            return Err(AvatarError::validation(format!(
                "layer '{layer}' has no mode '{mode}'"
            )));
        }

        let files = self.index.list_assets(layer, Some(mode));
        let next = match recipe.get(layer).and_then(AssetRef::filename) {
            None => AssetRef::None,
            Some(file) if files.contains(&file) => AssetRef::moded(mode, file),
            Some(_) => match files.first() {
                Some(first) => AssetRef::moded(mode, *first),
                None => return Err(AvatarError::empty_pool(layer, Some(mode))),
            },
        };

        self.modes.insert(layer.to_owned(), mode.to_owned());
        if let Some(recipe) = self.recipe.as_mut() {
            recipe.set(layer, next);
        }
        self.thumbs.invalidate_layer(layer);
        self.bump();
        Ok(true)
    }

    /// Choose the background color. The canvas fill becomes the lightened variant.
    pub fn set_background(&mut self, base: Rgb8) {
        if self.background.choose(base) {
            self.thumbs.clear();
            self.bump();
        }
    }

    /// Show the picker of `layer`.
    pub fn set_active_tab(&mut self, layer: &str) -> AvatarResult<()> {
        self.manifest.require_layer(layer)?;
        self.active_tab = Some(layer.to_owned());
        Ok(())
    }

    /// Swap in a reloaded catalog. Layer shapes are re-detected from the new catalog.
    pub fn reload_catalog(&mut self, index: AssetIndex) {
        self.index = Arc::new(index);
        self.thumbs.clear();
        self.bump();
        tracing::info!(generation = self.generation, "asset catalog reloaded");
    }

    /// Human-readable recipe: one `layer: file` line per layer, then the color line.
    pub fn recipe_text(&self) -> Option<String> {
        let recipe = self.recipe.as_ref()?;
        let mut lines = self
            .manifest
            .layers
            .iter()
            .map(|spec| {
                let asset = recipe.get(&spec.name).cloned().unwrap_or_default();
                format!("{}: {asset}", spec.name)
            })
            .collect::<Vec<_>>();
        lines.push(if self.background.has_color() {
            format!("color: {}", self.background.base())
        } else {
            "color: none".to_owned()
        });
        Some(lines.join("\n"))
    }

    /// Default export file name, `avatar-<recipe fingerprint>.png`.
    pub fn export_file_name(&self) -> Option<String> {
        let recipe = self.recipe.as_ref()?;
        Some(format!("avatar-{:016x}.png", recipe.fingerprint()))
    }

    /// Snapshot the current recipe for a preview-sized render.
    pub fn begin_render(&self) -> Option<RenderTicket> {
        self.begin_render_at(self.opts.preview)
    }

    /// Snapshot the current recipe for a render at `canvas`.
    pub fn begin_render_at(&self, canvas: Canvas) -> Option<RenderTicket> {
        Some(RenderTicket {
            generation: self.generation,
            manifest: Arc::clone(&self.manifest),
            index: Arc::clone(&self.index),
            recipe: self.recipe.clone()?,
            modes: self.modes.clone(),
            background: self.background.fill(),
            canvas,
        })
    }

    /// Commit a finished render.
    ///
    /// Stale tickets are dropped. A failed render keeps the last good frame and returns the error.
    pub fn commit_render(
        &mut self,
        ticket: &RenderTicket,
        result: AvatarResult<Bitmap>,
    ) -> AvatarResult<RenderOutcome> {
        if ticket.generation != self.generation {
            tracing::warn!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping stale render"
            );
            return Ok(RenderOutcome::Stale);
        }
        match result {
            Ok(frame) => {
                let frame = Arc::new(frame);
                self.frame = Some(Arc::clone(&frame));
                Ok(RenderOutcome::Committed(frame))
            }
            Err(e) => {
                tracing::warn!(error = %e, "render failed, keeping last frame");
                Err(e)
            }
        }
    }

    /// Render and commit the preview of the current recipe.
    pub fn render_preview(
        &mut self,
        loader: &dyn ImageLoader,
        surface: &dyn DrawSurface,
    ) -> AvatarResult<Arc<Bitmap>> {
        let ticket = self
            .begin_render()
            .ok_or_else(|| AvatarError::validation("no recipe to render yet"))?;
        let result = ticket.render(loader, surface);
        match self.commit_render(&ticket, result)? {
            RenderOutcome::Committed(frame) => Ok(frame),
            RenderOutcome::Stale => Err(AvatarError::validation(
                "render superseded by a newer generation",
            )),
        }
    }

    /// Thumbnail of `candidate` for `layer` over the current recipe, rendered on cache miss.
    ///
    /// Render failures are logged and yield `None`.
    pub fn thumbnail(
        &mut self,
        layer: &str,
        candidate: &AssetRef,
        loader: &dyn ImageLoader,
        surface: &dyn DrawSurface,
    ) -> Option<Arc<Bitmap>> {
        self.ensure_recipe();
        let Self {
            manifest,
            index,
            recipe,
            modes,
            background,
            thumbs,
            opts,
            ..
        } = self;
        let baseline = recipe.as_ref()?;
        let (manifest, index, modes) = (&**manifest, &**index, &*modes);
        let background = background.fill();
        let canvas = opts.thumbnail;

        let rendered = thumbs.get_or_render(layer, candidate, baseline, |probe| {
            let req = RenderRequest {
                manifest,
                index,
                recipe: probe,
                modes,
                background,
                canvas,
            };
            render_recipe(&req, loader, surface)
        });
        match rendered {
            Ok(bitmap) => Some(bitmap),
            Err(e) => {
                tracing::warn!(layer, candidate = %candidate, error = %e, "thumbnail render failed");
                None
            }
        }
    }

    /// Picker grid of `layer`: `None` first for optional layers, then each asset.
    ///
    /// Moded layers list the assets of the selected mode. Synthesizes the default recipe when
    /// none exists yet. A layer absent from the catalog has an empty grid.
    pub fn thumbnail_grid(
        &mut self,
        layer: &str,
        loader: &dyn ImageLoader,
        surface: &dyn DrawSurface,
    ) -> AvatarResult<Vec<ThumbnailEntry>> {
        let required = self.manifest.require_layer(layer)?.required;
        if self.index.layer(layer).is_none() {
            return Ok(Vec::new());
        }
        self.ensure_recipe();

        let candidates = self.candidates(layer, required);
        let current = self
            .recipe
            .as_ref()
            .and_then(|r| r.get(layer))
            .cloned()
            .unwrap_or_default();
        let current_path = self.path_of(layer, &current);

        let mut out = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let selected = self.path_of(layer, &candidate) == current_path;
            let image = self.thumbnail(layer, &candidate, loader, surface);
            out.push(ThumbnailEntry {
                candidate,
                image,
                selected,
            });
        }
        Ok(out)
    }

    fn candidates(&self, layer: &str, required: bool) -> Vec<AssetRef> {
        let mut out = Vec::new();
        if !required {
            out.push(AssetRef::None);
        }
        if self.index.is_moded_layer(layer) {
            if let Some(mode) = infer_mode(layer, &self.modes, self.recipe.as_ref(), &self.index) {
                out.extend(
                    self.index
                        .list_assets(layer, Some(mode))
                        .into_iter()
                        .map(|file| AssetRef::moded(mode, file)),
                );
            }
        } else {
            out.extend(
                self.index
                    .list_assets(layer, None)
                    .into_iter()
                    .map(AssetRef::flat),
            );
        }
        out
    }

    fn path_of(&self, layer: &str, asset: &AssetRef) -> Option<String> {
        resolve_path(layer, asset, &self.modes, self.recipe.as_ref(), &self.index)
            .map(|p| p.as_str().to_owned())
    }

    fn ensure_recipe(&mut self) -> &mut Recipe {
        if self.recipe.is_none() {
            let res = default_resolution(&self.manifest, &self.index, &self.modes);
            self.modes = res.modes;
            self.recipe = Some(res.recipe);
            self.bump();
            tracing::info!(generation = self.generation, "synthesized default recipe");
        }
        self.recipe.get_or_insert_with(Recipe::new)
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/state.rs"]
mod tests;
