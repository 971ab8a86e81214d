use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    catalog::index::{AssetIndex, LayerAssets},
    foundation::error::AvatarResult,
};

/// Build an [`AssetIndex`] by scanning `root/<layer>` for each named layer.
///
/// - A missing layer folder leaves the layer out of the catalog.
/// - A folder containing any subdirectory becomes a moded layer: every subdirectory is a mode.
/// - Otherwise the folder is a flat layer.
///
/// Only `.png` files (case-insensitive) are listed, sorted by name. Other files are ignored.
pub fn scan_assets_dir<'a, I>(root: impl AsRef<Path>, layers: I) -> AvatarResult<AssetIndex>
where
    I: IntoIterator<Item = &'a str>,
{
    let root = root.as_ref();
    let mut index = AssetIndex::new();

    for layer in layers {
        let layer_dir = root.join(layer);
        if !layer_dir.is_dir() {
            tracing::debug!(layer, dir = %layer_dir.display(), "layer folder missing, skipped");
            continue;
        }

        let subdirs = list_entries(&layer_dir)?
            .into_iter()
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();

        let assets = if subdirs.is_empty() {
            LayerAssets::Flat(list_pngs(&layer_dir)?)
        } else {
            let mut modes = BTreeMap::new();
            for dir in subdirs {
                let Some(mode) = dir.file_name().and_then(|s| s.to_str()) else {
                    continue;
                };
                modes.insert(mode.to_owned(), list_pngs(&dir)?);
            }
            LayerAssets::Moded(modes)
        };

        match &assets {
            LayerAssets::Flat(files) => {
                tracing::info!(layer, count = files.len(), "indexed flat layer");
            }
            LayerAssets::Moded(modes) => {
                let names = modes.keys().cloned().collect::<Vec<_>>().join(", ");
                tracing::info!(layer, count = assets.len(), modes = %names, "indexed moded layer");
            }
        }
        index.insert(layer, assets);
    }

    Ok(index)
}

fn list_entries(dir: &Path) -> AvatarResult<Vec<PathBuf>> {
    let rd = std::fs::read_dir(dir).with_context(|| format!("read dir '{}'", dir.display()))?;
    let mut out = Vec::new();
    for entry in rd {
        let entry = entry.with_context(|| format!("read entry in '{}'", dir.display()))?;
        out.push(entry.path());
    }
    Ok(out)
}

fn list_pngs(dir: &Path) -> AvatarResult<Vec<String>> {
    let mut files = list_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file())
        .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(str::to_owned))
        .filter(|name| name.to_ascii_lowercase().ends_with(".png"))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/scan.rs"]
mod tests;
