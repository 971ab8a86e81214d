use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use crate::foundation::error::{AvatarError, AvatarResult};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
/// Catalog entry for one layer, tagged by shape once at load time.
pub enum LayerAssets {
    /// Plain list of filenames.
    Flat(Vec<String>),
    /// Filenames partitioned by color mode. Keys iterate in sorted order.
    Moded(BTreeMap<String, Vec<String>>),
}

impl LayerAssets {
    /// Total number of files across all modes.
    pub fn len(&self) -> usize {
        match self {
            LayerAssets::Flat(files) => files.len(),
            LayerAssets::Moded(modes) => modes.values().map(Vec::len).sum(),
        }
    }

    /// `true` when no file is available under any mode.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// Per-layer asset catalog.
///
/// Shape (flat vs moded) belongs to the catalog, not the manifest: the same layer may be flat in
/// one load and moded in the next, so callers query it at read time instead of caching it.
/// Layers missing from the catalog behave as empty flat layers.
pub struct AssetIndex {
    layers: BTreeMap<String, LayerAssets>,
}

impl AssetIndex {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> AvatarResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| AvatarError::config_load(format!("parse asset index JSON: {e}")))
    }

    /// Parse a catalog from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> AvatarResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            AvatarError::config_load(format!("open asset index '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize back to the on-disk JSON shape.
    pub fn to_json_pretty(&self) -> AvatarResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AvatarError::serde(format!("serialize asset index: {e}")))
    }

    /// Builder-style insert of a flat layer.
    pub fn with_flat<I, S>(mut self, layer: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(
            layer,
            LayerAssets::Flat(files.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Builder-style insert of a moded layer.
    pub fn with_moded<I, M, F, S>(mut self, layer: impl Into<String>, modes: I) -> Self
    where
        I: IntoIterator<Item = (M, F)>,
        M: Into<String>,
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let modes = modes
            .into_iter()
            .map(|(m, files)| (m.into(), files.into_iter().map(Into::into).collect()))
            .collect();
        self.insert(layer, LayerAssets::Moded(modes));
        self
    }

    /// Insert or replace the entry for `layer`.
    pub fn insert(&mut self, layer: impl Into<String>, assets: LayerAssets) {
        self.layers.insert(layer.into(), assets);
    }

    /// Raw entry for `layer`.
    pub fn layer(&self, layer: &str) -> Option<&LayerAssets> {
        self.layers.get(layer)
    }

    /// Layer names present in the catalog, sorted.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// `true` iff the entry for `layer` is a mode mapping rather than a list.
    pub fn is_moded_layer(&self, layer: &str) -> bool {
        matches!(self.layers.get(layer), Some(LayerAssets::Moded(_)))
    }

    /// Mode names of `layer` in lexicographic order; empty for flat or missing layers.
    pub fn list_modes(&self, layer: &str) -> Vec<&str> {
        match self.layers.get(layer) {
            Some(LayerAssets::Moded(modes)) => modes.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// `true` if `layer` is moded and has a mode called `mode`.
    pub fn has_mode(&self, layer: &str, mode: &str) -> bool {
        match self.layers.get(layer) {
            Some(LayerAssets::Moded(modes)) => modes.contains_key(mode),
            _ => false,
        }
    }

    /// Filenames of `layer`.
    ///
    /// - flat layer: the flat list (a `mode` argument is ignored)
    /// - moded layer with `mode`: that mode's list, empty if the mode is unknown
    /// - moded layer without `mode`: every mode's list concatenated in mode order
    /// - missing layer: empty
    pub fn list_assets(&self, layer: &str, mode: Option<&str>) -> Vec<&str> {
        match (self.layers.get(layer), mode) {
            (None, _) => Vec::new(),
            (Some(LayerAssets::Flat(files)), _) => files.iter().map(String::as_str).collect(),
            (Some(LayerAssets::Moded(modes)), Some(mode)) => modes
                .get(mode)
                .map(|files| files.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            (Some(LayerAssets::Moded(modes)), None) => modes
                .values()
                .flat_map(|files| files.iter().map(String::as_str))
                .collect(),
        }
    }

    /// `true` if `file` is listed for `layer` under `mode` (or in the flat list).
    pub fn contains(&self, layer: &str, mode: Option<&str>, file: &str) -> bool {
        self.list_assets(layer, mode).contains(&file)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/index.rs"]
mod tests;
