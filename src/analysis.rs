use rayon::prelude::*;

use crate::accumulate::propagate_with_predecessors;
use crate::composite::{LayerSet, WeightSet, build_composite_cost};
use crate::foundation::error::{TerrapathError, TerrapathResult};
use crate::foundation::grid::{Cell, Grid};
use crate::trace::{PathStrategy, trace_path, trace_predecessors};

/// Scalar parameters of one analysis.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisParams {
    /// Side length of a cell in metres.
    pub cell_size: f64,
    /// Metres per raw altitude unit.
    pub altitude_scale: f64,
    /// Cost of one cardinal step between cells.
    pub cost_distance: f64,
    #[serde(default)]
    pub path_strategy: PathStrategy,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            cell_size: 30.0,
            altitude_scale: 1.0,
            cost_distance: 1.0,
            path_strategy: PathStrategy::SteepestDescent,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> TerrapathResult<()> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(TerrapathError::invalid_input("cell_size must be > 0"));
        }
        if !self.altitude_scale.is_finite() {
            return Err(TerrapathError::invalid_input(
                "altitude_scale must be finite",
            ));
        }
        if !self.cost_distance.is_finite() || self.cost_distance <= 0.0 {
            return Err(TerrapathError::invalid_input("cost_distance must be > 0"));
        }
        Ok(())
    }
}

/// Everything one analysis consumes.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub layers: LayerSet,
    pub weights: WeightSet,
    pub params: AnalysisParams,
    pub destinations: Grid<bool>,
    pub start: Cell,
}

/// The three grids produced by one analysis.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Analysis {
    composite_cost: Grid<f64>,
    accumulated_cost: Grid<f64>,
    path: Grid<bool>,
}

impl Analysis {
    /// Composite cost, cost distance, then path tracing. The first failing stage aborts the run.
    #[tracing::instrument(skip(request), fields(start_x = request.start.x, start_y = request.start.y))]
    pub fn run(request: &AnalysisRequest) -> TerrapathResult<Self> {
        request.params.validate()?;
        let AnalysisParams {
            cell_size,
            altitude_scale,
            cost_distance,
            path_strategy,
        } = request.params;

        let composite_cost =
            build_composite_cost(&request.layers, cell_size, altitude_scale, &request.weights)?;
        let field = propagate_with_predecessors(&request.destinations, &composite_cost, cost_distance)?;
        let path = match path_strategy {
            PathStrategy::SteepestDescent => trace_path(request.start, &field.accumulated)?,
            PathStrategy::Predecessor => {
                trace_predecessors(request.start, &field.predecessors, &request.destinations)?
            }
        };

        Ok(Self {
            composite_cost,
            accumulated_cost: field.accumulated,
            path,
        })
    }

    pub fn composite_cost(&self) -> &Grid<f64> {
        &self.composite_cost
    }

    pub fn accumulated_cost(&self) -> &Grid<f64> {
        &self.accumulated_cost
    }

    pub fn path(&self) -> &Grid<bool> {
        &self.path
    }

    /// `(composite_cost, accumulated_cost, path)`.
    pub fn into_parts(self) -> (Grid<f64>, Grid<f64>, Grid<bool>) {
        (self.composite_cost, self.accumulated_cost, self.path)
    }
}

/// Run independent analyses on a dedicated thread pool. Results keep the request order.
pub fn run_batch(
    requests: &[AnalysisRequest],
    threads: Option<usize>,
) -> TerrapathResult<Vec<TerrapathResult<Analysis>>> {
    let pool = build_thread_pool(threads)?;
    Ok(pool.install(|| requests.par_iter().map(Analysis::run).collect()))
}

fn build_thread_pool(threads: Option<usize>) -> TerrapathResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TerrapathError::invalid_input(
            "batch 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}
