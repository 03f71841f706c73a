//! Multi-source Dijkstra plumbing shared by road distances and accumulated cost.
//!
//! The frontier is a binary min-heap with lazy deletion: a cell may be queued several times and
//! every entry but the cheapest is discarded when popped after the cell was finalized.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::foundation::grid::{Cell, Grid};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CellStatus {
    Unseen,
    Frontier,
    Finalized,
}

#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    tentative: f64,
    cell: Cell,
    via: Option<Cell>,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other.tentative.total_cmp(&self.tentative)
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cell popped from the frontier for finalization.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Settled {
    pub(crate) cell: Cell,
    pub(crate) tentative: f64,
    pub(crate) via: Option<Cell>,
}

pub(crate) struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
    status: Grid<CellStatus>,
    stale: usize,
}

impl Frontier {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            status: Grid::filled(width, height, CellStatus::Unseen),
            stale: 0,
        }
    }

    pub(crate) fn push(&mut self, cell: Cell, tentative: f64, via: Option<Cell>) {
        if self.status[cell] == CellStatus::Finalized {
            return;
        }
        self.status[cell] = CellStatus::Frontier;
        self.heap.push(FrontierEntry {
            tentative,
            cell,
            via,
        });
    }

    /// Pop the cheapest entry whose cell is not finalized yet and finalize it.
    pub(crate) fn settle_next(&mut self) -> Option<Settled> {
        while let Some(entry) = self.heap.pop() {
            if self.status[entry.cell] == CellStatus::Finalized {
                self.stale += 1;
                continue;
            }
            self.status[entry.cell] = CellStatus::Finalized;
            return Some(Settled {
                cell: entry.cell,
                tentative: entry.tentative,
                via: entry.via,
            });
        }
        None
    }

    pub(crate) fn is_finalized(&self, cell: Cell) -> bool {
        self.status[cell] == CellStatus::Finalized
    }

    pub(crate) fn stale_pops(&self) -> usize {
        self.stale
    }
}

/// Output of [`spread`].
pub(crate) struct Spread {
    /// Final value per cell; cells never reached keep `0.0`.
    pub(crate) values: Grid<f64>,
    /// Neighbour whose relaxation produced each cell's value. `None` for sources and unreached cells.
    pub(crate) via: Grid<Option<Cell>>,
    pub(crate) finalized: usize,
}

/// Spread outward from every `true` cell in `sources`.
///
/// A step to a cardinal neighbour adds `step`, a diagonal one `step * sqrt(2)`. When a non-source
/// cell is finalized its value becomes `tentative + entry_cost(cell)`; sources are pinned to `0`.
pub(crate) fn spread(
    sources: &Grid<bool>,
    step: f64,
    mut entry_cost: impl FnMut(Cell) -> f64,
) -> Spread {
    let (width, height) = sources.dims();
    let mut frontier = Frontier::new(width, height);
    for (cell, is_source) in sources.iter() {
        if *is_source {
            frontier.push(cell, 0.0, None);
        }
    }

    let mut values = Grid::filled(width, height, 0.0);
    let mut via = Grid::filled(width, height, None);
    let mut finalized = 0usize;

    while let Some(settled) = frontier.settle_next() {
        let cell = settled.cell;
        let value = if sources[cell] {
            0.0
        } else {
            settled.tentative + entry_cost(cell)
        };
        values[cell] = value;
        via[cell] = settled.via;
        finalized += 1;

        for (n, adjacency) in sources.neighbors8(cell) {
            if frontier.is_finalized(n) {
                continue;
            }
            frontier.push(n, value + step * adjacency.step_length(), Some(cell));
        }
    }

    tracing::debug!(
        finalized,
        stale = frontier.stale_pops(),
        width,
        height,
        "frontier drained"
    );

    Spread {
        values,
        via,
        finalized,
    }
}
