use std::ops::{Index, IndexMut};

use crate::foundation::error::{TerrapathError, TerrapathResult};

/// Integer cell coordinate, `x` across the width and `y` across the height.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    fn offset(self, dx: isize, dy: isize) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

impl From<(usize, usize)> for Cell {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}

/// How a neighbour touches the cell it was reached from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjacency {
    Cardinal,
    Diagonal,
}

impl Adjacency {
    /// Geometric length of one step, in cell units.
    pub fn step_length(self) -> f64 {
        match self {
            Adjacency::Cardinal => 1.0,
            Adjacency::Diagonal => std::f64::consts::SQRT_2,
        }
    }
}

// Neighbour visiting order is part of the tracer's tie-breaking contract.
const CARDINAL: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL: [(isize, isize); 4] = [(1, -1), (-1, -1), (1, 1), (-1, 1)];

/// Dense rectangular raster indexed `[x][y]`.
///
/// Storage is column-major (`x * height + y`) so iteration order matches nested
/// `for x { for y { .. } }` loops.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }
}

impl<T> Grid<T> {
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(Cell) -> T) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                cells.push(f(Cell::new(x, y)));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Build from `columns[x][y]`. Ragged input is rejected.
    pub fn from_columns(columns: Vec<Vec<T>>) -> TerrapathResult<Self> {
        let width = columns.len();
        let height = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != height) {
            return Err(TerrapathError::invalid_input(
                "grid columns must all have the same length",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: columns.into_iter().flatten().collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// `true` when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    pub fn get(&self, cell: Cell) -> Option<&T> {
        self.contains(cell).then(|| &self.cells[self.offset_of(cell)])
    }

    pub fn values(&self) -> &[T] {
        &self.cells
    }

    /// All coordinates in storage order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<T> {
        let height = self.height;
        (0..self.width).flat_map(move |x| (0..height).map(move |y| Cell::new(x, y)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, &T)> + '_ {
        self.cells().zip(self.cells.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(&mut f).collect(),
        }
    }

    /// In-bounds axis-aligned neighbours.
    pub fn neighbors4(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        CARDINAL
            .iter()
            .filter_map(move |&(dx, dy)| self.neighbor(cell, dx, dy))
    }

    /// In-bounds 8-connected neighbours, cardinal ones first.
    pub fn neighbors8(&self, cell: Cell) -> impl Iterator<Item = (Cell, Adjacency)> + '_ {
        let cardinal = CARDINAL.iter().map(|&d| (d, Adjacency::Cardinal));
        let diagonal = DIAGONAL.iter().map(|&d| (d, Adjacency::Diagonal));
        cardinal
            .chain(diagonal)
            .filter_map(move |((dx, dy), adj)| self.neighbor(cell, dx, dy).map(|n| (n, adj)))
    }

    /// Fail with [`TerrapathError::DimensionMismatch`] unless this grid is `expected` in size.
    pub fn ensure_dims(&self, expected: (usize, usize)) -> TerrapathResult<()> {
        if self.dims() != expected {
            return Err(TerrapathError::dimension_mismatch(expected, self.dims()));
        }
        Ok(())
    }

    fn neighbor(&self, cell: Cell, dx: isize, dy: isize) -> Option<Cell> {
        cell.offset(dx, dy).filter(|n| self.contains(*n))
    }

    fn offset_of(&self, cell: Cell) -> usize {
        cell.x * self.height + cell.y
    }
}

impl Grid<bool> {
    /// Mask with exactly the given cells set. Out-of-bounds cells are rejected.
    pub fn mask_from_cells(
        width: usize,
        height: usize,
        cells: impl IntoIterator<Item = Cell>,
    ) -> TerrapathResult<Self> {
        let mut mask = Self::filled(width, height, false);
        for cell in cells {
            if !mask.contains(cell) {
                return Err(TerrapathError::invalid_input(format!(
                    "cell ({}, {}) is outside the {width}x{height} grid",
                    cell.x, cell.y
                )));
            }
            mask[cell] = true;
        }
        Ok(mask)
    }

    /// Non-zero cells of an integer mask.
    pub fn from_nonzero(mask: &Grid<i32>) -> Self {
        mask.map(|v| *v != 0)
    }

    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|v| **v).count()
    }
}

impl<T> Index<Cell> for Grid<T> {
    type Output = T;

    fn index(&self, cell: Cell) -> &T {
        assert!(
            self.contains(cell),
            "cell ({}, {}) out of bounds for {}x{} grid",
            cell.x,
            cell.y,
            self.width,
            self.height
        );
        &self.cells[self.offset_of(cell)]
    }
}

impl<T> IndexMut<Cell> for Grid<T> {
    fn index_mut(&mut self, cell: Cell) -> &mut T {
        assert!(
            self.contains(cell),
            "cell ({}, {}) out of bounds for {}x{} grid",
            cell.x,
            cell.y,
            self.width,
            self.height
        );
        let offset = self.offset_of(cell);
        &mut self.cells[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_columns_indexes_x_then_y() {
        let g = Grid::from_columns(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(g.dims(), (2, 3));
        assert_eq!(g[Cell::new(0, 2)], 3);
        assert_eq!(g[Cell::new(1, 0)], 4);
    }

    #[test]
    fn from_columns_rejects_ragged_input() {
        let err = Grid::from_columns(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, TerrapathError::InvalidInput(_)));
    }

    #[test]
    fn corner_has_three_neighbours_and_centre_has_eight() {
        let g = Grid::filled(3, 3, 0u8);
        assert_eq!(g.neighbors8(Cell::new(0, 0)).count(), 3);
        assert_eq!(g.neighbors8(Cell::new(1, 1)).count(), 8);
        assert_eq!(g.neighbors4(Cell::new(0, 0)).count(), 2);
        assert_eq!(g.neighbors4(Cell::new(1, 0)).count(), 3);
    }

    #[test]
    fn neighbours_come_cardinal_first() {
        let g = Grid::filled(3, 3, 0u8);
        let adj: Vec<_> = g.neighbors8(Cell::new(1, 1)).map(|(_, a)| a).collect();
        assert!(adj[..4].iter().all(|a| *a == Adjacency::Cardinal));
        assert!(adj[4..].iter().all(|a| *a == Adjacency::Diagonal));
    }

    #[test]
    fn mask_from_cells_rejects_out_of_bounds() {
        assert!(Grid::mask_from_cells(2, 2, [Cell::new(2, 0)]).is_err());
        let m = Grid::mask_from_cells(2, 2, [Cell::new(1, 1)]).unwrap();
        assert_eq!(m.count_set(), 1);
        assert!(m[Cell::new(1, 1)]);
    }

    #[test]
    fn ensure_dims_reports_both_sizes() {
        let g = Grid::filled(3, 4, 0.0);
        let err = g.ensure_dims((3, 3)).unwrap_err();
        assert!(matches!(
            err,
            TerrapathError::DimensionMismatch {
                expected_width: 3,
                expected_height: 3,
                width: 3,
                height: 4
            }
        ));
    }
}
