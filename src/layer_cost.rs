//! Per-layer traversal cost scoring.
//!
//! Every scorer maps one raw layer onto the nominal cost range `1..=9`. A cost of `0` marks a
//! cell the layer has no opinion about (dry land for the water layer).

use std::fmt;

use crate::foundation::error::{TerrapathError, TerrapathResult};
use crate::foundation::grid::Grid;
use crate::frontier;

/// Steepest ascent, in degrees, before the altitude cost saturates.
pub const MAX_ASCENT_DEG: f64 = 60.0;
/// Descent, in degrees, at or beyond which the altitude cost saturates.
pub const MAX_DESCENT_DEG: f64 = -50.0;
/// Bridge support height in metres beyond which a crossing is infeasible.
pub const MAX_BRIDGE_SUPPORT_M: f64 = 200.0;
/// Preferred distance from a road, in the same unit as `cell_size`.
pub const IDEAL_ROAD_DISTANCE: f64 = 10.0;
/// Saturated cost.
pub const MAX_COST: f64 = 9.0;

/// Kind of geographic input layer.
///
/// `Custom` layers are accepted (and must be weighted) but no scorer exists for them, so they
/// contribute nothing to the composite.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayerKind {
    Altitude,
    Water,
    Roads,
    HousingDensity,
    Custom(String),
}

impl LayerKind {
    pub fn as_str(&self) -> &str {
        match self {
            LayerKind::Altitude => "altitude",
            LayerKind::Water => "water",
            LayerKind::Roads => "roads",
            LayerKind::HousingDensity => "housing_density",
            LayerKind::Custom(name) => name,
        }
    }
}

impl From<String> for LayerKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "altitude" => LayerKind::Altitude,
            "water" => LayerKind::Water,
            "roads" => LayerKind::Roads,
            "housing_density" => LayerKind::HousingDensity,
            _ => LayerKind::Custom(name),
        }
    }
}

impl From<&str> for LayerKind {
    fn from(name: &str) -> Self {
        LayerKind::from(name.to_owned())
    }
}

impl From<LayerKind> for String {
    fn from(kind: LayerKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score `raw` as a layer of `kind`. `None` for kinds without a scorer.
pub fn score_layer(
    kind: &LayerKind,
    raw: &Grid<f64>,
    cell_size: f64,
    altitude_scale: f64,
) -> TerrapathResult<Option<Grid<f64>>> {
    let cost = match kind {
        LayerKind::Altitude => altitude_cost(raw, cell_size, altitude_scale)?,
        LayerKind::Water => water_cost(raw, altitude_scale)?,
        LayerKind::Roads => roads_cost(raw, cell_size)?,
        LayerKind::HousingDensity => housing_density_cost(raw)?,
        LayerKind::Custom(_) => return Ok(None),
    };
    Ok(Some(cost))
}

/// Slope preference from the four axis-aligned neighbours of every cell.
pub fn altitude_cost(
    altitude: &Grid<f64>,
    cell_size: f64,
    altitude_scale: f64,
) -> TerrapathResult<Grid<f64>> {
    ensure_non_empty(altitude, "altitude")?;
    if altitude.width() < 2 || altitude.height() < 2 {
        return Err(TerrapathError::invalid_input(format!(
            "altitude layer must be at least 2x2 to evaluate slope, got {}x{}",
            altitude.width(),
            altitude.height()
        )));
    }

    let mut cost = Grid::filled(altitude.width(), altitude.height(), 0.0);
    for (cell, &here) in altitude.iter() {
        let mut greatest = f64::NEG_INFINITY;
        let mut smallest = f64::INFINITY;
        for n in altitude.neighbors4(cell) {
            let rise = (here - altitude[n]) * altitude_scale;
            let slope = (rise / cell_size).atan().to_degrees();
            greatest = greatest.max(slope);
            smallest = smallest.min(slope);
        }
        cost[cell] = slope_preference(greatest, smallest);
    }
    Ok(cost)
}

fn slope_preference(greatest: f64, smallest: f64) -> f64 {
    if greatest > MAX_ASCENT_DEG || smallest <= MAX_DESCENT_DEG {
        MAX_COST
    } else if greatest < 0.0 {
        1.0
    } else {
        1.0 + (greatest / MAX_ASCENT_DEG).powi(4) * 8.0
    }
}

/// Bridge cost for flooded cells; raw values are water depth in altitude units.
pub fn water_cost(depth: &Grid<f64>, altitude_scale: f64) -> TerrapathResult<Grid<f64>> {
    ensure_non_empty(depth, "water")?;
    Ok(depth.map(|&d| {
        if d == 0.0 {
            return 0.0;
        }
        let support = d * altitude_scale;
        if support > MAX_BRIDGE_SUPPORT_M {
            MAX_COST
        } else {
            2.0 + support / MAX_BRIDGE_SUPPORT_M * 6.0
        }
    }))
}

/// Distance-to-road preference. Cells with a raw value `<= 0` are road.
///
/// A layer without any road cell scores `0` everywhere.
pub fn roads_cost(roads: &Grid<f64>, cell_size: f64) -> TerrapathResult<Grid<f64>> {
    ensure_non_empty(roads, "roads")?;
    let on_road = roads.map(|&v| v <= 0.0);
    if on_road.count_set() == 0 {
        tracing::debug!("roads layer has no road cells; it contributes no cost");
        return Ok(Grid::filled(roads.width(), roads.height(), 0.0));
    }
    let distance = frontier::spread(&on_road, cell_size, |_| 0.0).values;
    Ok(distance.map(|&d| (IDEAL_ROAD_DISTANCE - d).abs()))
}

/// Linear ramp from 1 (empty) to 9 (densest, raw 255).
pub fn housing_density_cost(density: &Grid<f64>) -> TerrapathResult<Grid<f64>> {
    ensure_non_empty(density, "housing density")?;
    Ok(density.map(|&d| 1.0 + d * 8.0 / 255.0))
}

/// Derive a water-depth layer by flooding `altitude` up to `water_level` metres.
///
/// A cell's real altitude is `raw * altitude_scale + min_altitude`. Depths are returned in raw
/// altitude units so [`water_cost`] scales them back to metres.
pub fn water_depth_from_level(
    altitude: &Grid<f64>,
    altitude_scale: f64,
    min_altitude: f64,
    water_level: f64,
) -> TerrapathResult<Grid<f64>> {
    ensure_non_empty(altitude, "altitude")?;
    if altitude_scale <= 0.0 || !altitude_scale.is_finite() {
        return Err(TerrapathError::invalid_input(
            "altitude_scale must be > 0 to derive water depth",
        ));
    }
    Ok(altitude.map(|&raw| {
        let metres = raw * altitude_scale + min_altitude;
        if metres < water_level {
            (water_level - metres) / altitude_scale
        } else {
            0.0
        }
    }))
}

fn ensure_non_empty(grid: &Grid<f64>, what: &str) -> TerrapathResult<()> {
    if grid.is_empty() {
        return Err(TerrapathError::invalid_input(format!(
            "{what} layer has zero width or height"
        )));
    }
    Ok(())
}
