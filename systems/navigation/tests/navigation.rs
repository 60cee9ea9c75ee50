use fieldsense_core::{CellCoord, Grid};
use fieldsense_navigation::{find_best_cell, Attractor, WeightedField};
use fieldsense_world::{InfluenceField, ObstacleMap};
use glam::Vec2;

fn unit_grid(width: u32, height: u32) -> Grid {
    Grid::new(Vec2::ZERO, width, height, 1.0)
}

fn cell_center(cell: CellCoord) -> Vec2 {
    Vec2::new(cell.x() as f32 + 0.5, cell.y() as f32 + 0.5)
}

fn field_with_peak(grid: &Grid, peak: CellCoord, value: f32) -> InfluenceField {
    let mut field = InfluenceField::new(grid, 0.0);
    field.inject(grid, cell_center(peak), value);
    field
}

fn assert_steps_are_adjacent(start: CellCoord, trail: &[CellCoord]) {
    let mut cursor = start;
    for step in trail {
        assert_eq!(
            cursor.manhattan_distance(*step),
            1,
            "trail steps must be 4-connected"
        );
        cursor = *step;
    }
}

#[test]
fn trail_climbs_to_the_single_peak() {
    let grid = unit_grid(10, 10);
    let obstacles = ObstacleMap::new(&grid);
    let peak = CellCoord::new(2, 2);
    let field = field_with_peak(&grid, peak, 5.0);
    let start = CellCoord::new(0, 0);

    let trail = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        start,
        10.0,
        None,
        0.0,
    );

    assert_eq!(trail.last().copied(), Some(peak));
    assert!(!trail.contains(&start), "start is excluded from the trail");
    assert_steps_are_adjacent(start, &trail);
}

#[test]
fn flat_field_returns_an_empty_trail() {
    let grid = unit_grid(8, 8);
    let obstacles = ObstacleMap::new(&grid);
    let field = InfluenceField::new(&grid, 0.0);

    let trail = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        CellCoord::new(4, 4),
        6.0,
        None,
        0.0,
    );

    assert!(trail.is_empty(), "no strict improvement over start");
}

#[test]
fn missing_fields_and_invalid_start_return_empty_trails() {
    let grid = unit_grid(8, 8);
    let obstacles = ObstacleMap::new(&grid);
    let field = field_with_peak(&grid, CellCoord::new(3, 3), 5.0);

    let no_fields = find_best_cell(
        &grid,
        &obstacles,
        &[],
        CellCoord::new(0, 0),
        6.0,
        None,
        0.0,
    );
    assert!(no_fields.is_empty());

    let bad_start = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        CellCoord::new(40, 40),
        6.0,
        None,
        0.0,
    );
    assert!(bad_start.is_empty());
}

#[test]
fn search_respects_the_radius_budget() {
    let grid = unit_grid(12, 1);
    let obstacles = ObstacleMap::new(&grid);
    let field = field_with_peak(&grid, CellCoord::new(9, 0), 5.0);

    let trail = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        CellCoord::new(0, 0),
        4.0,
        None,
        0.0,
    );

    assert!(
        trail.is_empty(),
        "a peak beyond the search radius is never reached"
    );
}

#[test]
fn obstacles_force_a_detour() {
    let grid = unit_grid(7, 7);
    let mut obstacles = ObstacleMap::new(&grid);
    // Wall across column 3, open only at the southern edge.
    for y in 0..6 {
        obstacles.add_height(CellCoord::new(3, y), 4.0);
    }
    let peak = CellCoord::new(6, 0);
    let field = field_with_peak(&grid, peak, 5.0);
    let start = CellCoord::new(0, 0);

    let trail = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        start,
        30.0,
        None,
        0.0,
    );

    assert_eq!(trail.last().copied(), Some(peak));
    assert_steps_are_adjacent(start, &trail);
    assert!(
        trail.iter().all(|cell| obstacles.is_passable(*cell)),
        "the trail never crosses a blocked cell"
    );
    assert!(
        trail.contains(&CellCoord::new(3, 6)),
        "the only opening in the wall is part of the trail"
    );
}

#[test]
fn least_bad_fallback_escapes_a_low_influence_depression() {
    let grid = unit_grid(8, 1);
    let obstacles = ObstacleMap::new(&grid);
    let mut field = InfluenceField::new(&grid, 0.0);
    field.inject(&grid, cell_center(CellCoord::new(1, 0)), 0.2);
    field.inject(&grid, cell_center(CellCoord::new(2, 0)), 0.5);
    field.inject(&grid, cell_center(CellCoord::new(3, 0)), 5.0);

    // Every step toward the peak scores below the threshold; the fallback
    // must keep the search climbing the faint gradient regardless.
    let trail = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        CellCoord::new(0, 0),
        10.0,
        None,
        1.0,
    );

    assert_eq!(
        trail,
        vec![
            CellCoord::new(1, 0),
            CellCoord::new(2, 0),
            CellCoord::new(3, 0),
        ]
    );
}

#[test]
fn winning_attractor_short_circuits_to_a_single_step_trail() {
    let grid = unit_grid(9, 9);
    let obstacles = ObstacleMap::new(&grid);
    let field = InfluenceField::new(&grid, 0.0);
    let attractor = Attractor {
        cell: CellCoord::new(4, 4),
        weight: 3.0,
    };

    let trail = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        CellCoord::new(0, 0),
        20.0,
        Some(attractor),
        0.0,
    );

    assert_eq!(trail, vec![attractor.cell]);
}

#[test]
fn stronger_field_level_outweighs_the_attractor() {
    let grid = unit_grid(9, 9);
    let obstacles = ObstacleMap::new(&grid);
    let peak = CellCoord::new(1, 1);
    let field = field_with_peak(&grid, peak, 10.0);
    let attractor = Attractor {
        cell: CellCoord::new(7, 7),
        weight: 2.0,
    };

    let trail = find_best_cell(
        &grid,
        &obstacles,
        &[WeightedField::new(&field, 1.0)],
        CellCoord::new(4, 4),
        20.0,
        Some(attractor),
        0.0,
    );

    assert_eq!(trail.last().copied(), Some(peak));
}

#[test]
fn weights_combine_fields_linearly() {
    let grid = unit_grid(10, 10);
    let obstacles = ObstacleMap::new(&grid);
    let food = field_with_peak(&grid, CellCoord::new(1, 1), 4.0);
    let danger = field_with_peak(&grid, CellCoord::new(8, 8), 6.0);
    let start = CellCoord::new(4, 4);

    // Danger dominates when weighted positively.
    let toward_danger = find_best_cell(
        &grid,
        &obstacles,
        &[
            WeightedField::new(&food, 1.0),
            WeightedField::new(&danger, 1.0),
        ],
        start,
        20.0,
        None,
        0.0,
    );
    assert_eq!(toward_danger.last().copied(), Some(CellCoord::new(8, 8)));

    // A negative weight turns the danger peak into a pit to avoid.
    let toward_food = find_best_cell(
        &grid,
        &obstacles,
        &[
            WeightedField::new(&food, 1.0),
            WeightedField::new(&danger, -1.0),
        ],
        start,
        20.0,
        None,
        0.0,
    );
    assert_eq!(toward_food.last().copied(), Some(CellCoord::new(1, 1)));
}

#[test]
fn destination_never_scores_below_the_start() {
    let grid = unit_grid(10, 10);
    let obstacles = ObstacleMap::new(&grid);
    let field = field_with_peak(&grid, CellCoord::new(6, 3), 5.0);
    let start = CellCoord::new(2, 7);
    let weighted = [WeightedField::new(&field, 1.0)];

    let trail = find_best_cell(&grid, &obstacles, &weighted, start, 15.0, None, 0.0);

    let score_at = |cell: CellCoord| field.level_at(cell);
    if let Some(destination) = trail.last() {
        assert!(
            score_at(*destination) >= score_at(start),
            "no-regression: the destination must not be worse than the start"
        );
    }
}
