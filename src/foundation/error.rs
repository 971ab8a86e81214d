/// Convenience result type used across the crate.
pub type AvatarResult<T> = Result<T, AvatarError>;

/// Top-level error taxonomy used by composer APIs.
#[derive(thiserror::Error, Debug)]
pub enum AvatarError {
    /// Manifest or asset index could not be opened, parsed or validated.
    ///
    /// Fatal to the whole session.
    #[error("config load error: {0}")]
    ConfigLoad(String),

    /// A required layer (or the mode chosen for it) has no candidate assets.
    ///
    /// Fatal to the resolution attempt only; the previous recipe stays in place.
    #[error("empty asset pool: {}", describe_pool(.layer, .mode.as_deref()))]
    EmptyAssetPool {
        /// Layer whose pool was empty.
        layer: String,
        /// Mode that was selected when the pool turned out empty, if any.
        mode: Option<String>,
    },

    /// An individual layer image could not be fetched or decoded.
    ///
    /// Fatal to the render pass only.
    #[error("asset load error: '{path}': {reason}")]
    AssetLoad {
        /// Relative asset path that failed.
        path: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// Invalid caller-provided data (unknown layer, malformed color, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_pool(layer: &str, mode: Option<&str>) -> String {
    match mode {
        Some(mode) => format!("layer '{layer}' has no assets for mode '{mode}'"),
        None => format!("layer '{layer}' has no assets"),
    }
}

impl AvatarError {
    /// Build a [`AvatarError::ConfigLoad`] value.
    pub fn config_load(msg: impl Into<String>) -> Self {
        Self::ConfigLoad(msg.into())
    }

    /// Build a [`AvatarError::EmptyAssetPool`] value.
    pub fn empty_pool(layer: impl Into<String>, mode: Option<&str>) -> Self {
        Self::EmptyAssetPool {
            layer: layer.into(),
            mode: mode.map(str::to_owned),
        }
    }

    /// Build a [`AvatarError::AssetLoad`] value.
    pub fn asset_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`AvatarError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`AvatarError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
