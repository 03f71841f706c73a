//! JSON analysis configuration read by the `terrapath` binary.
//!
//! ```json
//! {
//!   "layers": { "altitude": "altitude.png", "roads": "roads.png" },
//!   "weights": { "altitude": 1.0, "roads": 0.5 },
//!   "cell_size": 30.0,
//!   "altitude_range": { "min": 0.0, "max": 765.0 },
//!   "water_level": 120.0,
//!   "start": { "x": 0, "y": 0 },
//!   "destinations": [{ "x": 63, "y": 63 }]
//! }
//! ```
//!
//! Layer and mask paths are relative to the directory holding the configuration file. Housing
//! density images are read white for empty land (see [`raster::decode_layer_as`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::analysis::{AnalysisParams, AnalysisRequest};
use crate::composite::{LayerSet, WeightSet};
use crate::foundation::error::{TerrapathError, TerrapathResult};
use crate::foundation::grid::{Cell, Grid};
use crate::layer_cost::{LayerKind, water_depth_from_level};
use crate::raster;
use crate::trace::PathStrategy;

/// Real altitudes of the darkest (0) and brightest (255) raw altitude values.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AltitudeRange {
    pub min: f64,
    pub max: f64,
}

impl AltitudeRange {
    /// Metres per raw altitude unit.
    pub fn scale(&self) -> f64 {
        (self.max - self.min) / 255.0
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    pub layers: BTreeMap<LayerKind, PathBuf>,
    pub weights: WeightSet,
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    /// Explicit metres per raw altitude unit. Mutually exclusive with `altitude_range`.
    #[serde(default)]
    pub altitude_scale: Option<f64>,
    #[serde(default)]
    pub altitude_range: Option<AltitudeRange>,
    #[serde(default = "default_cost_distance")]
    pub cost_distance: f64,
    /// Flood the altitude layer up to this altitude (metres) to derive the water layer.
    #[serde(default)]
    pub water_level: Option<f64>,
    #[serde(default)]
    pub start: Option<Cell>,
    #[serde(default)]
    pub destinations: Vec<Cell>,
    #[serde(default)]
    pub destination_mask: Option<PathBuf>,
    #[serde(default)]
    pub path_strategy: PathStrategy,
    /// Extra weight sets analysed alongside `weights` as a batch.
    #[serde(default)]
    pub weight_variants: Vec<WeightSet>,
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_cell_size() -> f64 {
    30.0
}

fn default_cost_distance() -> f64 {
    1.0
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> TerrapathResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TerrapathError::serde(format!("parse analysis config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> TerrapathResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("open analysis config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> TerrapathResult<()> {
        if self.layers.is_empty() {
            return Err(TerrapathError::invalid_input("config lists no layers"));
        }
        if self.altitude_scale.is_some() && self.altitude_range.is_some() {
            return Err(TerrapathError::invalid_input(
                "set either altitude_scale or altitude_range, not both",
            ));
        }
        if self.water_level.is_some() {
            if !self.layers.contains_key(&LayerKind::Altitude) {
                return Err(TerrapathError::invalid_input(
                    "water_level needs an altitude layer",
                ));
            }
            if self.layers.contains_key(&LayerKind::Water) {
                return Err(TerrapathError::invalid_input(
                    "set either a water layer or water_level, not both",
                ));
            }
        }
        if !self.destinations.is_empty() && self.destination_mask.is_some() {
            return Err(TerrapathError::invalid_input(
                "set either destinations or destination_mask, not both",
            ));
        }
        self.params().validate()
    }

    pub fn altitude_scale(&self) -> f64 {
        match (self.altitude_scale, self.altitude_range) {
            (Some(scale), _) => scale,
            (None, Some(range)) => range.scale(),
            (None, None) => 1.0,
        }
    }

    /// Real altitude of a raw `0` cell.
    pub fn min_altitude(&self) -> f64 {
        self.altitude_range.map_or(0.0, |r| r.min)
    }

    pub fn params(&self) -> AnalysisParams {
        AnalysisParams {
            cell_size: self.cell_size,
            altitude_scale: self.altitude_scale(),
            cost_distance: self.cost_distance,
            path_strategy: self.path_strategy,
        }
    }

    /// `weights` followed by every entry of `weight_variants`.
    pub fn weight_sets(&self) -> impl Iterator<Item = &WeightSet> + '_ {
        std::iter::once(&self.weights).chain(self.weight_variants.iter())
    }

    /// Read every referenced raster relative to `base_dir` and build the requests.
    pub fn load_requests(&self, base_dir: &Path) -> TerrapathResult<Vec<AnalysisRequest>> {
        let mut layers = LayerSet::new();
        for (kind, rel) in &self.layers {
            let grid = raster::load_layer_as(kind, &base_dir.join(rel))?;
            tracing::debug!(layer = %kind, width = grid.width(), height = grid.height(), "layer loaded");
            layers.insert(kind.clone(), grid);
        }
        let mask = match &self.destination_mask {
            Some(rel) => Some(raster::load_mask(&base_dir.join(rel))?),
            None => None,
        };
        self.requests_with(layers, mask)
    }

    /// Build one request per weight set from already decoded layers.
    pub fn requests_with(
        &self,
        mut layers: LayerSet,
        destination_mask: Option<Grid<bool>>,
    ) -> TerrapathResult<Vec<AnalysisRequest>> {
        self.validate()?;

        if let Some(level) = self.water_level {
            let altitude = layers
                .get(&LayerKind::Altitude)
                .ok_or_else(|| TerrapathError::invalid_input("water_level needs an altitude layer"))?;
            let depth =
                water_depth_from_level(altitude, self.altitude_scale(), self.min_altitude(), level)?;
            layers.insert(LayerKind::Water, depth);
        }

        let (width, height) = layers
            .get(&LayerKind::Altitude)
            .or_else(|| layers.values().next())
            .map(Grid::dims)
            .ok_or_else(|| TerrapathError::invalid_input("config lists no layers"))?;
        if width == 0 || height == 0 {
            return Err(TerrapathError::invalid_input(
                "layers must have non-zero width and height",
            ));
        }

        let destinations = match destination_mask {
            Some(mask) => {
                mask.ensure_dims((width, height))?;
                mask
            }
            None if self.destinations.is_empty() => {
                Grid::mask_from_cells(width, height, [Cell::new(width - 1, height - 1)])?
            }
            None => Grid::mask_from_cells(width, height, self.destinations.iter().copied())?,
        };
        let start = self.start.unwrap_or_default();
        let params = self.params();

        Ok(self
            .weight_sets()
            .map(|weights| AnalysisRequest {
                layers: layers.clone(),
                weights: weights.clone(),
                params,
                destinations: destinations.clone(),
                start,
            })
            .collect())
    }
}
