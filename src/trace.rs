use crate::foundation::error::{TerrapathError, TerrapathResult};
use crate::foundation::grid::{Cell, Grid};

/// How the path is recovered from a propagated cost field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStrategy {
    /// Greedy walk to the cheapest unvisited neighbour until a zero-cost cell is reached.
    /// Locally decreasing, not guaranteed optimal, can get stuck.
    #[default]
    SteepestDescent,
    /// Follow the predecessor links recorded during propagation. Exact shortest path.
    Predecessor,
}

/// Greedy steepest-descent walk from `start` down to a zero-cost cell.
#[tracing::instrument(skip(accumulated))]
pub fn trace_path(start: Cell, accumulated: &Grid<f64>) -> TerrapathResult<Grid<bool>> {
    ensure_start(start, accumulated.dims())?;

    let mut path = Grid::filled(accumulated.width(), accumulated.height(), false);
    let mut current = start;
    path[current] = true;
    let mut steps = 0usize;

    while accumulated[current] != 0.0 {
        let mut next: Option<(Cell, f64)> = None;
        for (n, _) in accumulated.neighbors8(current) {
            if path[n] {
                continue;
            }
            let value = accumulated[n];
            if next.is_none_or(|(_, best)| value < best) {
                next = Some((n, value));
            }
        }

        let Some((cell, _)) = next else {
            return Err(TerrapathError::PathTraceStuck {
                x: current.x,
                y: current.y,
            });
        };
        path[cell] = true;
        current = cell;
        steps += 1;
    }

    tracing::debug!(steps, end_x = current.x, end_y = current.y, "path traced");
    Ok(path)
}

/// Exact reconstruction: follow `predecessors` from `start` until a cell without one.
///
/// A cell without a predecessor must be a destination, otherwise the field never reached it.
pub fn trace_predecessors(
    start: Cell,
    predecessors: &Grid<Option<Cell>>,
    destinations: &Grid<bool>,
) -> TerrapathResult<Grid<bool>> {
    ensure_start(start, predecessors.dims())?;
    destinations.ensure_dims(predecessors.dims())?;

    let mut path = Grid::filled(predecessors.width(), predecessors.height(), false);
    let mut current = start;
    path[current] = true;
    while let Some(prev) = predecessors[current] {
        if path[prev] {
            return Err(TerrapathError::PathTraceStuck {
                x: current.x,
                y: current.y,
            });
        }
        path[prev] = true;
        current = prev;
    }
    if !destinations[current] {
        return Err(TerrapathError::PathTraceStuck {
            x: current.x,
            y: current.y,
        });
    }
    Ok(path)
}

fn ensure_start(start: Cell, (width, height): (usize, usize)) -> TerrapathResult<()> {
    if start.x >= width || start.y >= height {
        return Err(TerrapathError::invalid_input(format!(
            "start ({}, {}) is outside the {width}x{height} grid",
            start.x, start.y
        )));
    }
    Ok(())
}
