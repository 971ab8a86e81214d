use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use crate::foundation::error::{AvatarError, AvatarResult};

/// Inclusion probability applied to optional layers that do not declare one.
pub const DEFAULT_INCLUDE_CHANCE: f64 = 0.5;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Declarative description of the avatar layers.
///
/// Layer order is stacking order: later layers draw on top of earlier ones.
pub struct Manifest {
    /// Ordered layer definitions.
    pub layers: Vec<LayerSpec>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// One stacked visual component of the avatar.
pub struct LayerSpec {
    /// Unique layer key; also the asset folder name.
    pub name: String,
    /// Required layers are always drawn.
    #[serde(default)]
    pub required: bool,
    /// Probability in `[0, 1]` that an optional layer is drawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_chance: Option<f64>,
    /// Relative weights for choosing a color mode. Need not sum to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_chances: Option<BTreeMap<String, f64>>,
}

impl LayerSpec {
    /// Required layer with no mode weights.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            include_chance: None,
            mode_chances: None,
        }
    }

    /// Optional layer drawn with probability `include_chance`.
    pub fn optional(name: impl Into<String>, include_chance: Option<f64>) -> Self {
        Self {
            name: name.into(),
            required: false,
            include_chance,
            mode_chances: None,
        }
    }

    /// Attach a mode weight table.
    pub fn with_mode_chances<I, K>(mut self, chances: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.mode_chances = Some(chances.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Effective inclusion probability for optional layers.
    pub fn effective_include_chance(&self) -> f64 {
        self.include_chance.unwrap_or(DEFAULT_INCLUDE_CHANCE)
    }

    /// Weight of `mode`; modes missing from the table weigh 0.
    pub fn mode_weight(&self, mode: &str) -> Option<f64> {
        self.mode_chances
            .as_ref()
            .map(|table| table.get(mode).copied().unwrap_or(0.0))
    }
}

impl Manifest {
    /// Build a manifest from layers in stacking order.
    pub fn new(layers: Vec<LayerSpec>) -> Self {
        Self { layers }
    }

    /// Parse a manifest from a JSON reader and validate it.
    pub fn from_reader<R: std::io::Read>(r: R) -> AvatarResult<Self> {
        let manifest: Manifest = serde_json::from_reader(r)
            .map_err(|e| AvatarError::config_load(format!("parse manifest JSON: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from a JSON file on disk and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> AvatarResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            AvatarError::config_load(format!("open manifest '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check layer names and probability/weight ranges.
    pub fn validate(&self) -> AvatarResult<()> {
        let mut seen = std::collections::HashSet::new();
        for layer in &self.layers {
            if layer.name.trim().is_empty() {
                return Err(AvatarError::config_load("layer name must be non-empty"));
            }
            if layer.name.contains(['/', '\\']) || layer.name == ".." {
                return Err(AvatarError::config_load(format!(
                    "layer name '{}' must be a plain folder name",
                    layer.name
                )));
            }
            if !seen.insert(layer.name.as_str()) {
                return Err(AvatarError::config_load(format!(
                    "duplicate layer name '{}'",
                    layer.name
                )));
            }
            if let Some(p) = layer.include_chance
                && (!p.is_finite() || !(0.0..=1.0).contains(&p))
            {
                return Err(AvatarError::config_load(format!(
                    "layer '{}' includeChance must be within [0, 1]",
                    layer.name
                )));
            }
            if let Some(table) = &layer.mode_chances {
                for (mode, w) in table {
                    if !w.is_finite() || *w < 0.0 {
                        return Err(AvatarError::config_load(format!(
                            "layer '{}' modeChances.{mode} must be finite and >= 0",
                            layer.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Lookup a layer by name.
    pub fn layer(&self, name: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Lookup a layer by name, failing with a validation error when unknown.
    pub fn require_layer(&self, name: &str) -> AvatarResult<&LayerSpec> {
        self.layer(name)
            .ok_or_else(|| AvatarError::validation(format!("unknown layer '{name}'")))
    }

    /// Layer names in stacking order.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/model.rs"]
mod tests;
