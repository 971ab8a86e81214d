use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    catalog::index::AssetIndex,
    foundation::error::{AvatarError, AvatarResult},
    recipe::model::{AssetRef, ModeSelections, Recipe, is_plain_segment},
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Asset location relative to the assets root, `/`-separated.
pub struct AssetPath(String);

impl AssetPath {
    /// Validate a relative path.
    ///
    /// Backslashes become `/`, empty and `.` segments are dropped. Absolute paths and `..`
    /// segments are rejected.
    pub fn new(rel: impl Into<String>) -> AvatarResult<Self> {
        let rel = rel.into().replace('\\', "/");
        if rel.starts_with('/') {
            return Err(AvatarError::validation("asset paths must be relative"));
        }

        let mut out = Vec::<&str>::new();
        for part in rel.split('/') {
            if part.is_empty() || part == "." {
                continue;
            }
            if part == ".." {
                return Err(AvatarError::validation("asset paths must not contain '..'"));
            }
            out.push(part);
        }
        if out.is_empty() {
            return Err(AvatarError::validation("asset path must contain a file name"));
        }
        Ok(Self(out.join("/")))
    }

    // `None` unless every part is a single plain segment.
    fn join(parts: &[&str]) -> Option<Self> {
        if let Some(bad) = parts.iter().find(|p| !is_plain_segment(p)) {
            tracing::warn!(segment = %bad, path = %parts.join("/"), "rejected asset path segment");
            return None;
        }
        Some(Self(parts.join("/")))
    }

    /// Relative path as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem path below `root`.
    pub fn under(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, c| acc.join(c))
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the file path of `asset` for `layer`. Never fails; `None` means nothing to draw.
///
/// Any layer, mode or file segment that is empty, `.`, `..` or contains a separator yields
/// `None` (logged), so a path never leaves its layer folder.
///
/// - `None` → no path
/// - `Flat(file)` on a flat (or missing) layer → `layer/file`
/// - `Moded(mode, file)` → `layer/mode/file`
/// - `Flat(file)` on a layer the catalog reports as moded (legacy recipe) → the mode is taken
///   from `selected_modes`, then from the `current` recipe entry, then the first catalog mode;
///   modes the catalog no longer lists are skipped. With no mode at all the file is addressed
///   as flat.
///
/// Reads its inputs only, so resolving the same reference twice yields the same path.
pub fn resolve_path(
    layer: &str,
    asset: &AssetRef,
    selected_modes: &ModeSelections,
    current: Option<&Recipe>,
    index: &AssetIndex,
) -> Option<AssetPath> {
    match asset {
        AssetRef::None => None,
        AssetRef::Moded(mode, file) => AssetPath::join(&[layer, mode.as_str(), file.as_str()]),
        AssetRef::Flat(file) if index.is_moded_layer(layer) => {
            match infer_mode(layer, selected_modes, current, index) {
                Some(mode) => AssetPath::join(&[layer, mode, file.as_str()]),
                None => AssetPath::join(&[layer, file.as_str()]),
            }
        }
        AssetRef::Flat(file) => AssetPath::join(&[layer, file.as_str()]),
    }
}

/// Mode a legacy reference on a moded layer resolves to; see [`resolve_path`].
pub(crate) fn infer_mode<'a>(
    layer: &str,
    selected_modes: &'a ModeSelections,
    current: Option<&'a Recipe>,
    index: &'a AssetIndex,
) -> Option<&'a str> {
    let known = |m: &&str| index.has_mode(layer, m);

    selected_modes
        .get(layer)
        .map(String::as_str)
        .filter(known)
        .or_else(|| {
            current
                .and_then(|r| r.get(layer))
                .and_then(AssetRef::mode)
                .filter(known)
        })
        .or_else(|| index.list_modes(layer).first().copied())
}

#[cfg(test)]
#[path = "../../tests/unit/recipe/path.rs"]
mod tests;
