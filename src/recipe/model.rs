use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::{
    foundation::error::{AvatarError, AvatarResult},
    foundation::math::Fnv1a64,
    manifest::model::Manifest,
};

/// Last mode chosen per layer. Survives single-layer picks and regenerations.
pub type ModeSelections = BTreeMap<String, String>;

#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
/// Resolved pointer to one asset of a layer.
pub enum AssetRef {
    /// Layer omitted.
    #[default]
    None,
    /// Filename of a flat layer. Also what legacy recipes carry for moded layers.
    Flat(String),
    /// `(mode, filename)` of a moded layer.
    Moded(String, String),
}

impl AssetRef {
    /// Flat reference.
    pub fn flat(file: impl Into<String>) -> Self {
        Self::Flat(file.into())
    }

    /// Moded reference.
    pub fn moded(mode: impl Into<String>, file: impl Into<String>) -> Self {
        Self::Moded(mode.into(), file.into())
    }

    /// `true` for [`AssetRef::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, AssetRef::None)
    }

    /// Filename, if any.
    pub fn filename(&self) -> Option<&str> {
        match self {
            AssetRef::None => None,
            AssetRef::Flat(file) | AssetRef::Moded(_, file) => Some(file),
        }
    }

    /// Mode encoded in the reference, if any.
    pub fn mode(&self) -> Option<&str> {
        match self {
            AssetRef::Moded(mode, _) => Some(mode),
            _ => None,
        }
    }

    fn write_hash(&self, h: &mut Fnv1a64) {
        match self {
            AssetRef::None => h.write_u8(0),
            AssetRef::Flat(file) => {
                h.write_u8(1);
                h.write_str(file);
            }
            AssetRef::Moded(mode, file) => {
                h.write_u8(2);
                h.write_str(mode);
                h.write_str(file);
            }
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::None => f.write_str("none"),
            AssetRef::Flat(file) => f.write_str(file),
            AssetRef::Moded(mode, file) => write!(f, "{mode}/{file}"),
        }
    }
}

impl FromStr for AssetRef {
    type Err = AvatarError;

    /// Inverse of `Display`: `none`, `file.png` or `mode/file.png`.
    fn from_str(s: &str) -> AvatarResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AvatarError::validation("asset reference must be non-empty"));
        }
        if s.eq_ignore_ascii_case("none") {
            return Ok(AssetRef::None);
        }
        let parsed = match s.split_once('/') {
            None => AssetRef::flat(s),
            Some((mode, file)) => AssetRef::moded(mode, file),
        };
        let plain = parsed.mode().is_none_or(is_plain_segment)
            && parsed.filename().is_some_and(is_plain_segment);
        if !plain {
            return Err(AvatarError::validation(format!(
                "asset reference '{s}' must be 'file' or 'mode/file' without '.', '..' or separators"
            )));
        }
        Ok(parsed)
    }
}

/// `true` for a single path segment that stays inside its folder.
pub(crate) fn is_plain_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\'])
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// Fully resolved choice of asset for every layer.
///
/// Omitted layers hold an explicit [`AssetRef::None`]; a missing key means the recipe was not
/// built against the current manifest. Equality and hashing are structural.
pub struct Recipe {
    entries: BTreeMap<String, AssetRef>,
}

impl Recipe {
    /// Empty recipe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `layer`.
    pub fn get(&self, layer: &str) -> Option<&AssetRef> {
        self.entries.get(layer)
    }

    /// Overwrite the entry for `layer`, returning the previous one.
    pub fn set(&mut self, layer: impl Into<String>, asset: AssetRef) -> Option<AssetRef> {
        self.entries.insert(layer.into(), asset)
    }

    /// Copy of this recipe with `layer` overridden.
    pub fn with_override(&self, layer: &str, asset: AssetRef) -> Recipe {
        let mut probe = self.clone();
        probe.set(layer, asset);
        probe
    }

    /// Entries sorted by layer name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetRef)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` when every manifest layer has an entry.
    pub fn covers(&self, manifest: &Manifest) -> bool {
        manifest.layer_names().all(|name| self.entries.contains_key(name))
    }

    /// Stable 64-bit fingerprint over all entries.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u64(self.entries.len() as u64);
        for (layer, asset) in &self.entries {
            h.write_str(layer);
            asset.write_hash(&mut h);
        }
        h.finish()
    }
}

impl FromIterator<(String, AssetRef)> for Recipe {
    fn from_iter<T: IntoIterator<Item = (String, AssetRef)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/recipe/model.rs"]
mod tests;
