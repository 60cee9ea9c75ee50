#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Gradient-ascent navigation over weighted influence fields.
//!
//! The navigator is a pure, synchronous, read-only system: it walks the
//! 4-connected neighborhood outward from a start cell, scores every visited
//! cell by the weighted sum of the supplied field levels, and reconstructs a
//! trail to the best-scoring cell it saw. It mutates nothing and should be
//! invoked between field ticks so that it never observes a half-updated
//! level buffer.

use std::collections::VecDeque;

use fieldsense_core::{CellCoord, Grid};
use fieldsense_world::{InfluenceField, ObstacleMap};

/// Influence field paired with the weight it contributes to the combined
/// navigation score.
#[derive(Clone, Copy, Debug)]
pub struct WeightedField<'a> {
    /// Field whose levels are sampled.
    pub field: &'a InfluenceField,
    /// Linear weight applied to every sampled level.
    pub weight: f32,
}

impl<'a> WeightedField<'a> {
    /// Pairs a field with a weight.
    #[must_use]
    pub const fn new(field: &'a InfluenceField, weight: f32) -> Self {
        Self { field, weight }
    }
}

/// Externally supplied target cell granted extra score, independent of any
/// field level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attractor {
    /// Cell treated as an immediate terminal goal when it wins the search.
    pub cell: CellCoord,
    /// Score added on top of the combined field influence at the cell.
    pub weight: f32,
}

/// Searches outward from `start` for the cell with the highest combined
/// influence and returns the trail leading to it.
///
/// The combined score of a cell is the weighted sum of every supplied
/// field's level there, plus the attractor weight when the cell is the
/// attractor. Expansion is bounded by cumulative path distance, not hop
/// count: neighbors are explored only while the distance walked so far is
/// strictly below `search_radius`. A neighbor joins the frontier when it is
/// passable, scores at least `min_influence`, and offers a new or strictly
/// shorter path; when no neighbor of a cell clears the threshold, the single
/// best-scoring neighbor is admitted anyway so the search can climb out of a
/// uniformly low-influence depression instead of stalling inside it.
///
/// The returned trail runs from the cell after `start` to the destination
/// inclusive. It is empty when `start` lies outside the grid, when no fields
/// are supplied, or when nothing scored strictly better than `start`. When
/// the attractor itself wins, the trail is `[attractor.cell]` directly:
/// reaching it is treated as an immediate goal regardless of path shape.
#[must_use]
pub fn find_best_cell(
    grid: &Grid,
    obstacles: &ObstacleMap,
    fields: &[WeightedField<'_>],
    start: CellCoord,
    search_radius: f32,
    attractor: Option<Attractor>,
    min_influence: f32,
) -> Vec<CellCoord> {
    if fields.is_empty() || !grid.in_bounds(start) {
        return Vec::new();
    }

    let combined = |cell: CellCoord| -> f32 {
        let mut score: f32 = fields
            .iter()
            .map(|weighted| weighted.field.level_at(cell) * weighted.weight)
            .sum();
        if let Some(attractor) = attractor {
            if attractor.cell == cell {
                score += attractor.weight;
            }
        }
        score
    };

    let cell_count = grid.cell_count();
    let mut distances = vec![f32::INFINITY; cell_count];
    let mut previous: Vec<Option<CellCoord>> = vec![None; cell_count];
    let mut frontier: VecDeque<CellCoord> = VecDeque::new();

    let Some(start_slot) = cell_index(grid, start) else {
        return Vec::new();
    };
    distances[start_slot] = 0.0;
    frontier.push_back(start);

    let mut best = start;
    let mut best_score = combined(start);

    while let Some(cell) = frontier.pop_front() {
        let score = combined(cell);
        if score > best_score {
            best = cell;
            best_score = score;
        }

        let Some(cell_slot) = cell_index(grid, cell) else {
            continue;
        };
        let walked = distances[cell_slot];
        if walked >= search_radius {
            continue;
        }
        let step_distance = walked + 1.0;

        let mut admitted_any = false;
        let mut least_bad: Option<(CellCoord, f32)> = None;

        for neighbor in grid.neighbors4(cell) {
            let neighbor_score = combined(neighbor);
            match least_bad {
                Some((_, recorded)) if recorded >= neighbor_score => {}
                _ => least_bad = Some((neighbor, neighbor_score)),
            }

            if neighbor_score < min_influence {
                continue;
            }
            if admit(
                obstacles,
                grid,
                neighbor,
                cell,
                step_distance,
                &mut distances,
                &mut previous,
                &mut frontier,
            ) {
                admitted_any = true;
            }
        }

        // Least-bad fallback: keep moving through a depression rather than
        // letting the search dead-end against the threshold.
        if !admitted_any {
            if let Some((fallback, _)) = least_bad {
                let _ = admit(
                    obstacles,
                    grid,
                    fallback,
                    cell,
                    step_distance,
                    &mut distances,
                    &mut previous,
                    &mut frontier,
                );
            }
        }
    }

    if best == start {
        return Vec::new();
    }
    if let Some(attractor) = attractor {
        if best == attractor.cell {
            return vec![attractor.cell];
        }
    }

    let mut trail = Vec::new();
    let mut cursor = best;
    while cursor != start {
        trail.push(cursor);
        let Some(slot) = cell_index(grid, cursor) else {
            break;
        };
        match previous[slot] {
            Some(step) => cursor = step,
            None => break,
        }
    }
    trail.reverse();
    trail
}

fn admit(
    obstacles: &ObstacleMap,
    grid: &Grid,
    neighbor: CellCoord,
    from: CellCoord,
    distance: f32,
    distances: &mut [f32],
    previous: &mut [Option<CellCoord>],
    frontier: &mut VecDeque<CellCoord>,
) -> bool {
    if !obstacles.is_passable(neighbor) {
        return false;
    }
    let Some(slot) = cell_index(grid, neighbor) else {
        return false;
    };
    // Covers both undiscovered cells and genuine relaxations.
    if distance >= distances[slot] {
        return false;
    }
    distances[slot] = distance;
    previous[slot] = Some(from);
    frontier.push_back(neighbor);
    true
}

fn cell_index(grid: &Grid, cell: CellCoord) -> Option<usize> {
    if !grid.in_bounds(cell) {
        return None;
    }
    let x = usize::try_from(cell.x()).ok()?;
    let y = usize::try_from(cell.y()).ok()?;
    let width = usize::try_from(grid.width()).ok()?;
    Some(y * width + x)
}
