//! Layered avatar composer.
//!
//! An avatar is a stack of PNG layers (face, hair, eyebrows, ...). A JSON manifest declares the
//! layers and their randomization chances; an asset index lists the files available per layer,
//! either flat or grouped by color mode. The crate turns those into pixels:
//!
//! 1. **Resolve**: `Manifest + AssetIndex + RandomSource -> Recipe` ([`resolve`])
//! 2. **Locate**: `Recipe entry -> AssetPath` ([`resolve_path`])
//! 3. **Render**: load layer images and composite them in manifest order ([`render_recipe`])
//!
//! [`Session`] owns the interactive state on top: manual selections, per-layer mode memory,
//! the background color, a memoized thumbnail grid and render generations.
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic given a random source**: resolution and path lookup are pure.
//! - **Premultiplied RGBA8** inside the compositor; export un-premultiplies.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod catalog;
mod foundation;
mod manifest;
mod recipe;
mod render;
mod session;
mod thumbs;

pub use crate::foundation::color::Rgb8;
pub use crate::foundation::core::Canvas;
pub use crate::foundation::error::{AvatarError, AvatarResult};

pub use crate::catalog::index::{AssetIndex, LayerAssets};
pub use crate::catalog::scan::scan_assets_dir;
pub use crate::manifest::model::{DEFAULT_INCLUDE_CHANCE, LayerSpec, Manifest};
pub use crate::recipe::model::{AssetRef, ModeSelections, Recipe};
pub use crate::recipe::path::{AssetPath, resolve_path};
pub use crate::recipe::random::RandomSource;
#[cfg(feature = "testing")]
pub use crate::recipe::random::ScriptedSource;
pub use crate::recipe::resolver::{Resolution, default_resolution, pick_weighted, resolve};
pub use crate::render::backend::{Bitmap, DrawSurface, LayerImage};
pub use crate::render::cpu::{CpuSurface, ScaleFilter};
pub use crate::render::loader::{FsImageLoader, ImageLoader, MemoryImageLoader};
pub use crate::render::pipeline::{RenderRequest, render_recipe};
pub use crate::session::background::{BackgroundState, DEFAULT_BASE_COLOR, FILL_LIGHTEN_PERCENT};
pub use crate::session::state::{
    RenderOpts, RenderOutcome, RenderTicket, Session, SessionPhase, ThumbnailEntry,
};
pub use crate::thumbs::cache::{CacheStats, ThumbKey, ThumbnailCache};
