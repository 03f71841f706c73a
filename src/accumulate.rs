use crate::foundation::error::{TerrapathError, TerrapathResult};
use crate::foundation::grid::{Cell, Grid};
use crate::frontier;

/// Accumulated cost plus, for every cell, the neighbour it was finalized from.
#[derive(Clone, Debug)]
pub struct CostDistance {
    pub accumulated: Grid<f64>,
    pub predecessors: Grid<Option<Cell>>,
}

/// Minimum accumulated cost from every cell to its nearest destination.
///
/// Each step costs `cost_distance` (times `sqrt(2)` diagonally) and entering a cell adds that
/// cell's composite cost. Destinations are exactly `0`.
pub fn propagate(
    destinations: &Grid<bool>,
    cost: &Grid<f64>,
    cost_distance: f64,
) -> TerrapathResult<Grid<f64>> {
    Ok(propagate_with_predecessors(destinations, cost, cost_distance)?.accumulated)
}

/// [`propagate`], also keeping the predecessor links needed for exact path reconstruction.
#[tracing::instrument(skip(destinations, cost))]
pub fn propagate_with_predecessors(
    destinations: &Grid<bool>,
    cost: &Grid<f64>,
    cost_distance: f64,
) -> TerrapathResult<CostDistance> {
    if cost.is_empty() {
        return Err(TerrapathError::invalid_input(
            "cost grid has zero width or height",
        ));
    }
    destinations.ensure_dims(cost.dims())?;
    if !cost_distance.is_finite() || cost_distance <= 0.0 {
        return Err(TerrapathError::invalid_input(format!(
            "cost_distance must be finite and > 0, got {cost_distance}"
        )));
    }
    if destinations.count_set() == 0 {
        return Err(TerrapathError::invalid_input(
            "destination mask has no destination cell",
        ));
    }

    let spread = frontier::spread(destinations, cost_distance, |cell| cost[cell]);
    tracing::debug!(finalized = spread.finalized, "cost distance propagated");
    Ok(CostDistance {
        accumulated: spread.values,
        predecessors: spread.via,
    })
}
