use std::collections::BTreeMap;

use crate::foundation::error::{TerrapathError, TerrapathResult};
use crate::foundation::grid::Grid;
use crate::layer_cost::{LayerKind, score_layer};

/// Raw layer grids keyed by kind.
pub type LayerSet = BTreeMap<LayerKind, Grid<f64>>;

/// Immutable per-layer blending weights.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WeightSet(BTreeMap<LayerKind, f64>);

impl WeightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every present kind weighted `1.0`.
    pub fn uniform<'a>(kinds: impl IntoIterator<Item = &'a LayerKind>) -> Self {
        Self(kinds.into_iter().map(|k| (k.clone(), 1.0)).collect())
    }

    /// Builder-style insert.
    pub fn with(mut self, kind: impl Into<LayerKind>, weight: f64) -> Self {
        self.0.insert(kind.into(), weight);
        self
    }

    pub fn get(&self, kind: &LayerKind) -> Option<f64> {
        self.0.get(kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LayerKind, f64)> + '_ {
        self.0.iter().map(|(k, w)| (k, *w))
    }

    pub fn validate(&self) -> TerrapathResult<()> {
        for (kind, weight) in self.iter() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(TerrapathError::invalid_input(format!(
                    "weight for layer '{kind}' must be finite and >= 0, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(LayerKind, f64)> for WeightSet {
    fn from_iter<I: IntoIterator<Item = (LayerKind, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Check that `layers` is non-empty, every grid is the same non-zero size and every layer is
/// weighted. Returns the shared `(width, height)`.
pub fn validate_layers(layers: &LayerSet, weights: &WeightSet) -> TerrapathResult<(usize, usize)> {
    let mut grids = layers.values();
    let Some(first) = grids.next() else {
        return Err(TerrapathError::invalid_input("layer set is empty"));
    };
    let dims = first.dims();
    if first.is_empty() {
        return Err(TerrapathError::invalid_input(
            "layers must have non-zero width and height",
        ));
    }
    for grid in grids {
        grid.ensure_dims(dims)?;
    }

    for kind in layers.keys() {
        if weights.get(kind).is_none() {
            return Err(TerrapathError::MissingWeight(kind.clone()));
        }
    }
    weights.validate()?;
    Ok(dims)
}

/// Blend all scored layers into one cost-to-enter grid.
///
/// Wherever the water layer scores non-zero the cell is bridged, so the altitude term is left
/// out of that cell's sum.
#[tracing::instrument(skip(layers, weights), fields(layer_count = layers.len()))]
pub fn build_composite_cost(
    layers: &LayerSet,
    cell_size: f64,
    altitude_scale: f64,
    weights: &WeightSet,
) -> TerrapathResult<Grid<f64>> {
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(TerrapathError::invalid_input(format!(
            "cell_size must be finite and > 0, got {cell_size}"
        )));
    }
    if !altitude_scale.is_finite() {
        return Err(TerrapathError::invalid_input(format!(
            "altitude_scale must be finite, got {altitude_scale}"
        )));
    }
    let (width, height) = validate_layers(layers, weights)?;

    let mut scored = Vec::with_capacity(layers.len());
    for (kind, raw) in layers {
        if let Some(cost) = score_layer(kind, raw, cell_size, altitude_scale)? {
            let weight = weights
                .get(kind)
                .ok_or_else(|| TerrapathError::MissingWeight(kind.clone()))?;
            scored.push((kind, weight, cost));
        }
    }

    let water = scored
        .iter()
        .find(|(kind, _, _)| **kind == LayerKind::Water)
        .map(|(_, _, cost)| cost);

    let composite = Grid::from_fn(width, height, |cell| {
        let bridged = water.is_some_and(|w| w[cell] != 0.0);
        scored
            .iter()
            .filter(|(kind, _, _)| !(bridged && **kind == LayerKind::Altitude))
            .map(|(_, weight, cost)| weight * cost[cell])
            .sum::<f64>()
    });
    Ok(composite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::grid::Cell;

    fn layers(entries: Vec<(LayerKind, Grid<f64>)>) -> LayerSet {
        entries.into_iter().collect()
    }

    #[test]
    fn missing_weight_is_reported_not_defaulted() {
        let set = layers(vec![
            (LayerKind::Altitude, Grid::filled(3, 3, 0.0)),
            (LayerKind::HousingDensity, Grid::filled(3, 3, 0.0)),
        ]);
        let weights = WeightSet::new().with(LayerKind::Altitude, 1.0);
        let err = build_composite_cost(&set, 1.0, 1.0, &weights).unwrap_err();
        assert!(matches!(
            err,
            TerrapathError::MissingWeight(LayerKind::HousingDensity)
        ));
    }

    #[test]
    fn mismatched_dimensions_fail_before_scoring() {
        let set = layers(vec![
            (LayerKind::Altitude, Grid::filled(3, 3, 0.0)),
            (LayerKind::Water, Grid::filled(3, 4, 0.0)),
        ]);
        let weights = WeightSet::uniform(set.keys());
        let err = build_composite_cost(&set, 1.0, 1.0, &weights).unwrap_err();
        assert!(matches!(err, TerrapathError::DimensionMismatch { .. }));
    }

    #[test]
    fn empty_and_zero_sized_layer_sets_are_invalid() {
        let err = build_composite_cost(&LayerSet::new(), 1.0, 1.0, &WeightSet::new()).unwrap_err();
        assert!(matches!(err, TerrapathError::InvalidInput(_)));

        let set = layers(vec![(LayerKind::Altitude, Grid::filled(0, 0, 0.0))]);
        let err = build_composite_cost(&set, 1.0, 1.0, &WeightSet::uniform(set.keys()))
            .unwrap_err();
        assert!(matches!(err, TerrapathError::InvalidInput(_)));
    }

    #[test]
    fn non_positive_or_non_finite_cell_size_is_invalid() {
        let set = layers(vec![
            (LayerKind::Altitude, Grid::filled(3, 3, 0.0)),
            (LayerKind::Roads, Grid::filled(3, 3, 0.0)),
        ]);
        let weights = WeightSet::uniform(set.keys());
        for cell_size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                build_composite_cost(&set, cell_size, 1.0, &weights),
                Err(TerrapathError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            build_composite_cost(&set, 1.0, f64::NAN, &weights),
            Err(TerrapathError::InvalidInput(_))
        ));
    }

    #[test]
    fn negative_weight_is_invalid() {
        let set = layers(vec![(LayerKind::HousingDensity, Grid::filled(2, 2, 0.0))]);
        let weights = WeightSet::new().with(LayerKind::HousingDensity, -1.0);
        assert!(matches!(
            build_composite_cost(&set, 1.0, 1.0, &weights),
            Err(TerrapathError::InvalidInput(_))
        ));
    }

    #[test]
    fn weights_scale_each_layer() {
        let set = layers(vec![
            (LayerKind::Altitude, Grid::filled(2, 2, 0.0)),
            (LayerKind::HousingDensity, Grid::filled(2, 2, 255.0)),
        ]);
        let weights = WeightSet::new()
            .with(LayerKind::Altitude, 2.0)
            .with(LayerKind::HousingDensity, 0.5);
        let cost = build_composite_cost(&set, 1.0, 1.0, &weights).unwrap();
        // 2 * 1 (flat) + 0.5 * 9 (densest)
        assert!(cost.values().iter().all(|&c| (c - 6.5).abs() < 1e-12));
    }

    #[test]
    fn bridged_cells_drop_the_altitude_term() {
        let mut depth = Grid::filled(2, 2, 0.0);
        depth[Cell::new(1, 1)] = 100.0;
        let set = layers(vec![
            (LayerKind::Altitude, Grid::filled(2, 2, 0.0)),
            (LayerKind::Water, depth),
        ]);
        let weights = WeightSet::new()
            .with(LayerKind::Altitude, 3.0)
            .with(LayerKind::Water, 1.0);
        let cost = build_composite_cost(&set, 1.0, 1.0, &weights).unwrap();
        assert_eq!(cost[Cell::new(0, 0)], 3.0);
        assert!((cost[Cell::new(1, 1)] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn custom_layers_are_weighted_but_contribute_nothing() {
        let set = layers(vec![
            (LayerKind::Altitude, Grid::filled(2, 2, 0.0)),
            (LayerKind::from("vegetation"), Grid::filled(2, 2, 200.0)),
        ]);
        let weights = WeightSet::uniform(set.keys());
        let cost = build_composite_cost(&set, 1.0, 1.0, &weights).unwrap();
        assert!(cost.values().iter().all(|&c| c == 1.0));
    }

    #[test]
    fn weight_set_deserializes_from_a_plain_map() {
        let weights: WeightSet =
            serde_json::from_str(r#"{"altitude": 1.5, "roads": 0.25}"#).unwrap();
        assert_eq!(weights.get(&LayerKind::Altitude), Some(1.5));
        assert_eq!(weights.get(&LayerKind::Roads), Some(0.25));
        assert_eq!(weights.get(&LayerKind::Water), None);
    }
}
