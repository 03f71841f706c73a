use std::f64::consts::SQRT_2;

use terrapath::{
    Analysis, AnalysisParams, AnalysisRequest, Cell, Grid, LayerKind, LayerSet, PathStrategy,
    TerrapathError, WeightSet, propagate, propagate_with_predecessors,
};

fn terrain(width: usize, height: usize) -> LayerSet {
    let mut layers = LayerSet::new();
    layers.insert(
        LayerKind::Altitude,
        Grid::from_fn(width, height, |c| ((c.x * 7 + c.y * 13) % 23) as f64 * 4.0),
    );
    layers.insert(
        LayerKind::Roads,
        Grid::from_fn(width, height, |c| if c.x == width / 2 { 0.0 } else { 255.0 }),
    );
    layers.insert(
        LayerKind::HousingDensity,
        Grid::from_fn(width, height, |c| ((c.x + 2 * c.y) % 9) as f64 * 25.0),
    );
    layers
}

fn request(width: usize, height: usize, strategy: PathStrategy) -> AnalysisRequest {
    let layers = terrain(width, height);
    let weights = WeightSet::uniform(layers.keys());
    AnalysisRequest {
        layers,
        weights,
        params: AnalysisParams {
            cell_size: 30.0,
            altitude_scale: 2.0,
            cost_distance: 1.0,
            path_strategy: strategy,
        },
        destinations: Grid::mask_from_cells(width, height, [Cell::new(width - 1, height - 1)])
            .unwrap(),
        start: Cell::new(0, 0),
    }
}

fn is_neighbour(a: Cell, b: Cell) -> bool {
    a != b && a.x.abs_diff(b.x) <= 1 && a.y.abs_diff(b.y) <= 1
}

#[test]
fn uniform_cost_matches_closed_form() {
    let (k, cd) = (3.0, 2.0);
    let dest = Cell::new(4, 2);
    let mask = Grid::mask_from_cells(9, 7, [dest]).unwrap();
    let acc = propagate(&mask, &Grid::filled(9, 7, k), cd).unwrap();

    for (cell, value) in acc.iter() {
        let dx = cell.x.abs_diff(dest.x) as f64;
        let dy = cell.y.abs_diff(dest.y) as f64;
        let (lo, hi) = (dx.min(dy), dx.max(dy));
        let expected = k * hi + cd * (SQRT_2 * lo + (hi - lo));
        assert!(
            (value - expected).abs() < 1e-9,
            "{cell:?}: got {value}, expected {expected}"
        );
    }
}

#[test]
fn three_by_three_unit_grid() {
    let mask = Grid::mask_from_cells(3, 3, [Cell::new(2, 2)]).unwrap();
    let acc = propagate(&mask, &Grid::filled(3, 3, 1.0), 1.0).unwrap();
    assert_eq!(acc[Cell::new(2, 2)], 0.0);
    assert!((acc[Cell::new(2, 1)] - 2.0).abs() < 1e-12);
    assert!((acc[Cell::new(0, 0)] - (2.0 + 2.0 * SQRT_2)).abs() < 1e-12);
}

#[test]
fn accumulated_cost_is_locally_consistent() {
    let req = request(12, 10, PathStrategy::SteepestDescent);
    let analysis = Analysis::run(&req).unwrap();
    let cost = analysis.composite_cost();
    let acc = analysis.accumulated_cost();

    for (cell, value) in acc.iter() {
        if req.destinations[cell] {
            assert_eq!(*value, 0.0);
            continue;
        }
        let best = acc
            .neighbors8(cell)
            .map(|(n, adj)| acc[n] + req.params.cost_distance * adj.step_length())
            .fold(f64::INFINITY, f64::min);
        assert!(
            (value - (best + cost[cell])).abs() < 1e-9,
            "{cell:?} is not relaxed"
        );
    }
}

#[test]
fn steepest_descent_path_strictly_decreases() {
    let req = request(16, 11, PathStrategy::SteepestDescent);
    let analysis = Analysis::run(&req).unwrap();
    let acc = analysis.accumulated_cost();

    let mut cells: Vec<Cell> = analysis
        .path()
        .iter()
        .filter(|(_, on)| **on)
        .map(|(c, _)| c)
        .collect();
    cells.sort_by(|a, b| acc[*b].total_cmp(&acc[*a]));

    assert_eq!(cells.first(), Some(&req.start));
    assert_eq!(acc[*cells.last().unwrap()], 0.0);
    for pair in cells.windows(2) {
        assert!(acc[pair[0]] > acc[pair[1]]);
        assert!(is_neighbour(pair[0], pair[1]), "{pair:?} not adjacent");
    }
}

#[test]
fn predecessor_path_reaches_a_destination() {
    let req = request(16, 11, PathStrategy::Predecessor);
    let analysis = Analysis::run(&req).unwrap();
    let path = analysis.path();
    assert!(path[req.start]);
    assert!(path[Cell::new(15, 10)]);

    let field =
        propagate_with_predecessors(&req.destinations, analysis.composite_cost(), 1.0).unwrap();
    let mut cell = req.start;
    while let Some(prev) = field.predecessors[cell] {
        assert!(path[prev]);
        assert!(field.accumulated[prev] < field.accumulated[cell]);
        cell = prev;
    }
}

#[test]
fn every_grid_shares_the_input_dimensions() {
    let analysis = Analysis::run(&request(7, 5, PathStrategy::SteepestDescent)).unwrap();
    let (composite, accumulated, path) = analysis.into_parts();
    assert_eq!(composite.dims(), (7, 5));
    assert_eq!(accumulated.dims(), (7, 5));
    assert_eq!(path.dims(), (7, 5));
    assert!(composite.values().iter().all(|v| v.is_finite() && *v >= 0.0));
}

#[test]
fn unweighted_layer_is_reported() {
    let mut req = request(6, 6, PathStrategy::SteepestDescent);
    req.weights = WeightSet::new()
        .with(LayerKind::Altitude, 1.0)
        .with(LayerKind::HousingDensity, 1.0);
    assert!(matches!(
        Analysis::run(&req),
        Err(TerrapathError::MissingWeight(LayerKind::Roads))
    ));
}

#[test]
fn mismatched_layers_are_reported() {
    let mut req = request(6, 6, PathStrategy::SteepestDescent);
    req.layers
        .insert(LayerKind::HousingDensity, Grid::filled(6, 5, 0.0));
    assert!(matches!(
        Analysis::run(&req),
        Err(TerrapathError::DimensionMismatch { .. })
    ));
}

#[test]
fn zero_weight_layer_is_ignored() {
    let mut with_roads = request(8, 8, PathStrategy::SteepestDescent);
    with_roads.weights = with_roads.weights.clone().with(LayerKind::Roads, 0.0);
    let mut without_roads = with_roads.clone();
    without_roads.layers.remove(&LayerKind::Roads);

    let a = Analysis::run(&with_roads).unwrap();
    let b = Analysis::run(&without_roads).unwrap();
    assert_eq!(a.composite_cost(), b.composite_cost());
    assert_eq!(a.path(), b.path());
}
