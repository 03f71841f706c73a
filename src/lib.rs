//! Least-cost path analysis over weighted raster terrain layers.
//!
//! The pipeline scores each raw layer ([`layer_cost`]), blends the scores into one composite
//! cost surface ([`build_composite_cost`]), propagates accumulated cost outward from the
//! destination cells ([`propagate`]) and walks back down that field from a start cell
//! ([`trace_path`]). [`Analysis::run`] sequences the stages; [`raster`] and [`config`] are the
//! file-facing shell used by the `terrapath` binary.
#![forbid(unsafe_code)]

mod foundation;
mod frontier;

pub mod accumulate;
pub mod analysis;
pub mod composite;
pub mod config;
pub mod layer_cost;
pub mod raster;
pub mod trace;

pub use crate::accumulate::{CostDistance, propagate, propagate_with_predecessors};
pub use crate::analysis::{Analysis, AnalysisParams, AnalysisRequest, run_batch};
pub use crate::composite::{LayerSet, WeightSet, build_composite_cost, validate_layers};
pub use crate::config::AnalysisConfig;
pub use crate::foundation::error::{TerrapathError, TerrapathResult};
pub use crate::foundation::grid::{Adjacency, Cell, Grid};
pub use crate::layer_cost::{
    LayerKind, altitude_cost, housing_density_cost, roads_cost, score_layer, water_cost,
    water_depth_from_level,
};
pub use crate::trace::{PathStrategy, trace_path, trace_predecessors};
