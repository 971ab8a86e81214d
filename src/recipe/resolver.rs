use crate::{
    catalog::index::AssetIndex,
    foundation::error::{AvatarError, AvatarResult},
    manifest::model::{LayerSpec, Manifest},
    recipe::model::{AssetRef, ModeSelections, Recipe},
    recipe::random::RandomSource,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Output of one resolution: the recipe plus the mode memory to carry forward.
pub struct Resolution {
    /// Entry for every manifest layer.
    pub recipe: Recipe,
    /// Previous selections, updated with the modes chosen by this resolution.
    pub modes: ModeSelections,
}

/// Resolve a fresh random [`Recipe`].
///
/// For each manifest layer in order:
/// 1. inclusion: required layers always, optional layers when a draw is `< includeChance`
/// 2. moded layers pick a mode: weighted by `modeChances` if present, otherwise uniform
/// 3. a file is picked uniformly from the mode's list (or the flat list)
///
/// Layers that are not included keep their previous mode selection. A required layer with no
/// modes or files fails with [`AvatarError::EmptyAssetPool`]; an optional one degrades to
/// [`AssetRef::None`].
#[tracing::instrument(skip_all, fields(layers = manifest.layers.len()))]
pub fn resolve<R: RandomSource + ?Sized>(
    manifest: &Manifest,
    index: &AssetIndex,
    previous: &ModeSelections,
    rng: &mut R,
) -> AvatarResult<Resolution> {
    let mut out = Resolution {
        recipe: Recipe::new(),
        modes: previous.clone(),
    };

    for spec in &manifest.layers {
        let included = spec.required || rng.next_unit() < spec.effective_include_chance();
        let asset = if included {
            resolve_layer(spec, index, rng)?
        } else {
            AssetRef::None
        };

        if let AssetRef::Moded(mode, _) = &asset {
            out.modes.insert(spec.name.clone(), mode.clone());
        }
        tracing::debug!(layer = %spec.name, included, asset = %asset, "resolved layer");
        out.recipe.set(spec.name.clone(), asset);
    }

    Ok(out)
}

fn resolve_layer<R: RandomSource + ?Sized>(
    spec: &LayerSpec,
    index: &AssetIndex,
    rng: &mut R,
) -> AvatarResult<AssetRef> {
    let name = spec.name.as_str();

    if !index.is_moded_layer(name) {
        let files = index.list_assets(name, None);
        if files.is_empty() {
            return degrade(spec, None);
        }
        return Ok(AssetRef::flat(files[rng.pick_index(files.len())]));
    }

    let modes = index.list_modes(name);
    let Some(mode) = choose_mode(spec, &modes, rng) else {
        return degrade(spec, None);
    };
    let files = index.list_assets(name, Some(mode));
    if files.is_empty() {
        return degrade(spec, Some(mode));
    }
    Ok(AssetRef::moded(mode, files[rng.pick_index(files.len())]))
}

fn degrade(spec: &LayerSpec, mode: Option<&str>) -> AvatarResult<AssetRef> {
    if spec.required {
        return Err(AvatarError::empty_pool(&spec.name, mode));
    }
    tracing::debug!(layer = %spec.name, mode, "optional layer has no assets, omitted");
    Ok(AssetRef::None)
}

/// Pick a mode from `modes` (sorted). `None` only when `modes` is empty.
///
/// With a weight table the choice is weighted; if every available mode weighs 0 the choice
/// falls back to uniform.
pub(crate) fn choose_mode<'m, R: RandomSource + ?Sized>(
    spec: &LayerSpec,
    modes: &[&'m str],
    rng: &mut R,
) -> Option<&'m str> {
    if modes.is_empty() {
        return None;
    }
    if spec.mode_chances.is_some() {
        let weights = modes
            .iter()
            .map(|m| spec.mode_weight(m).unwrap_or(0.0))
            .collect::<Vec<_>>();
        if let Some(i) = pick_weighted(&weights, rng.next_unit()) {
            return Some(modes[i]);
        }
        tracing::debug!(layer = %spec.name, "all mode weights are zero, picking uniformly");
    }
    Some(modes[rng.pick_index(modes.len())])
}

/// Cumulative-threshold sampling.
///
/// Weights are normalized by their sum; the first index whose cumulative normalized weight
/// exceeds `draw` wins. If rounding leaves `draw` unresolved the last index is returned.
/// Returns `None` when there are no weights or they sum to zero.
pub fn pick_weighted(weights: &[f64], draw: f64) -> Option<usize> {
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if weights.is_empty() || !total.is_finite() || total <= 0.0 {
        return None;
    }

    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w.max(0.0) / total;
        if cumulative > draw {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}

/// Deterministic starting recipe used before the first random generation.
///
/// Required layers take their first asset (moded layers: first mode, first file); optional
/// layers start as [`AssetRef::None`]. A required layer without any asset is left as `None`.
pub fn default_resolution(
    manifest: &Manifest,
    index: &AssetIndex,
    previous: &ModeSelections,
) -> Resolution {
    let mut out = Resolution {
        recipe: Recipe::new(),
        modes: previous.clone(),
    };

    for spec in &manifest.layers {
        let name = spec.name.as_str();
        let asset = if !spec.required {
            AssetRef::None
        } else if index.is_moded_layer(name) {
            index
                .list_modes(name)
                .into_iter()
                .find_map(|mode| {
                    index
                        .list_assets(name, Some(mode))
                        .first()
                        .map(|file| AssetRef::moded(mode, *file))
                })
                .unwrap_or_default()
        } else {
            index
                .list_assets(name, None)
                .first()
                .map(|file| AssetRef::flat(*file))
                .unwrap_or_default()
        };

        if let AssetRef::Moded(mode, _) = &asset {
            out.modes.insert(spec.name.clone(), mode.clone());
        }
        out.recipe.set(spec.name.clone(), asset);
    }

    out
}

#[cfg(test)]
#[path = "../../tests/unit/recipe/resolver.rs"]
mod tests;
