#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the fieldsense engine.
//!
//! This crate defines the coordinate vocabulary and the grid topology service
//! that every other crate builds on. The [`Grid`] maps between continuous
//! world space and discrete cells, enumerates neighborhoods in a fixed order,
//! projects world-space rectangles onto the cells they cover, and runs the
//! generic obstacle-aware breadth-first fill that influence propagation is
//! layered on. It holds no field data of its own; one grid is shared
//! read-only by every influence field and the obstacle map.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Location of a single grid cell expressed as x and y indices.
///
/// The y axis grows southward: row 0 is the northern edge of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based horizontal index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based vertical index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Unique identifier assigned to an influence source by its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(u32);

impl SourceId {
    /// Creates a new source identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Axis-aligned rectangle expressed in world units.
///
/// A rectangle whose `min` exceeds its `max` on either axis covers nothing;
/// callers that project such a rectangle onto the grid observe an empty
/// footprint rather than an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRect {
    min: Vec2,
    max: Vec2,
}

impl WorldRect {
    /// Constructs a rectangle from its minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Constructs a rectangle centered on `center` with the provided size.
    #[must_use]
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Minimum corner of the rectangle.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Maximum corner of the rectangle.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Center point of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Reports whether the point lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Fixed neighborhood offsets in NW, N, NE, W, E, SW, S, SE order.
///
/// The order is load-bearing: traversals resolve ties by visiting neighbors
/// in this sequence, so it must stay stable.
const NEIGHBOR_OFFSETS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Orthogonal neighborhood offsets in N, W, E, S order.
const NEIGHBOR_OFFSETS_4: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Immutable mapping between continuous world space and discrete grid cells.
///
/// The grid is a pure coordinate and topology service: dimensions, cell size,
/// and origin are fixed at construction and it carries no per-cell state.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    cell_size: f32,
    origin: Vec2,
}

impl Grid {
    /// Creates a grid with explicit cell dimensions.
    ///
    /// A non-positive `cell_size` produces a degenerate zero-cell grid so
    /// that every subsequent query answers neutrally instead of panicking.
    #[must_use]
    pub fn new(origin: Vec2, width: u32, height: u32, cell_size: f32) -> Self {
        if cell_size <= 0.0 {
            return Self {
                width: 0,
                height: 0,
                cell_size: 0.0,
                origin,
            };
        }
        Self {
            width,
            height,
            cell_size,
            origin,
        }
    }

    /// Creates a grid covering a world-space extent, flooring the cell counts.
    #[must_use]
    pub fn from_world_size(origin: Vec2, world_size: Vec2, cell_size: f32) -> Self {
        if cell_size <= 0.0 {
            return Self::new(origin, 0, 0, cell_size);
        }
        let width = (world_size.x / cell_size).floor().max(0.0) as u32;
        let height = (world_size.y / cell_size).floor().max(0.0) as u32;
        Self::new(origin, width, height, cell_size)
    }

    /// Number of cells along the x axis.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of cells along the y axis.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Side length of a single square cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space position of the grid's minimum corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.width) * u64::from(self.height);
        usize::try_from(count).unwrap_or(0)
    }

    /// Reports whether the cell lies within the grid.
    #[must_use]
    pub const fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.x() < self.width && cell.y() < self.height
    }

    /// Maps a world-space point to the cell containing it.
    ///
    /// Returns `None` for points outside the grid.
    #[must_use]
    pub fn world_to_cell(&self, point: Vec2) -> Option<CellCoord> {
        if self.cell_size <= 0.0 {
            return None;
        }
        let relative = point - self.origin;
        let x = (relative.x / self.cell_size).floor();
        let y = (relative.y / self.cell_size).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let cell = CellCoord::new(x as u32, y as u32);
        self.in_bounds(cell).then_some(cell)
    }

    /// World-space position of the cell's minimum corner.
    #[must_use]
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec2 {
        self.origin
            + Vec2::new(
                cell.x() as f32 * self.cell_size,
                cell.y() as f32 * self.cell_size,
            )
    }

    /// World-space position of the cell's center.
    #[must_use]
    pub fn cell_center_world(&self, cell: CellCoord) -> Vec2 {
        self.cell_to_world(cell) + Vec2::splat(self.cell_size * 0.5)
    }

    /// In-bounds diagonal and orthogonal neighbors in NW, N, NE, W, E, SW,
    /// S, SE order.
    pub fn neighbors8(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        NEIGHBOR_OFFSETS_8
            .iter()
            .filter_map(move |&(dx, dy)| self.neighbor_towards(cell, dx, dy))
    }

    /// In-bounds orthogonal neighbors in N, W, E, S order.
    pub fn neighbors4(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        NEIGHBOR_OFFSETS_4
            .iter()
            .filter_map(move |&(dx, dy)| self.neighbor_towards(cell, dx, dy))
    }

    fn neighbor_towards(&self, cell: CellCoord, dx: i32, dy: i32) -> Option<CellCoord> {
        let x = i64::from(cell.x()) + i64::from(dx);
        let y = i64::from(cell.y()) + i64::from(dy);
        if x < 0 || y < 0 {
            return None;
        }
        let candidate = CellCoord::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        self.in_bounds(candidate).then_some(candidate)
    }

    /// Enumerates the in-bounds cells whose centers lie inside the rectangle.
    ///
    /// Used to seed multi-cell source footprints; a degenerate rectangle
    /// yields no cells.
    pub fn footprint_cells(&self, rect: WorldRect) -> impl Iterator<Item = CellCoord> + '_ {
        self.footprint_bounds(rect)
            .into_iter()
            .flat_map(|(x0, x1, y0, y1)| {
                (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| CellCoord::new(x, y)))
            })
            .filter(move |cell| rect.contains(self.cell_center_world(*cell)))
    }

    /// Clamped inclusive index bounds of the cells a rectangle may touch.
    fn footprint_bounds(&self, rect: WorldRect) -> Option<(u32, u32, u32, u32)> {
        if self.width == 0 || self.height == 0 || self.cell_size <= 0.0 {
            return None;
        }
        if rect.min().x > rect.max().x || rect.min().y > rect.max().y {
            return None;
        }

        let to_index = |value: f32| -> i64 { ((value / self.cell_size).floor()) as i64 };
        let min = rect.min() - self.origin;
        let max = rect.max() - self.origin;

        let clamp_x = |index: i64| index.clamp(0, i64::from(self.width) - 1) as u32;
        let clamp_y = |index: i64| index.clamp(0, i64::from(self.height) - 1) as u32;

        Some((
            clamp_x(to_index(min.x)),
            clamp_x(to_index(max.x)),
            clamp_y(to_index(min.y)),
            clamp_y(to_index(max.y)),
        ))
    }

    /// Runs a multi-seed breadth-first fill across the grid.
    ///
    /// Every in-bounds seed starts at depth 0. A cell is visited and expanded
    /// only while its settled depth is strictly below `max_depth`; expansion
    /// walks the 8-neighborhood and relaxes a neighbor whenever it is
    /// undiscovered or reachable at a strictly smaller depth, with
    /// `is_traversable` gating which neighbors may be entered at all.
    /// `on_visit` fires exactly once per settled cell, in dequeue order,
    /// before that cell's neighbors are expanded.
    pub fn breadth_first_fill<S, V, T>(
        &self,
        seeds: S,
        max_depth: u32,
        mut on_visit: V,
        mut is_traversable: T,
    ) -> FillDepths
    where
        S: IntoIterator<Item = CellCoord>,
        V: FnMut(CellCoord, u32),
        T: FnMut(CellCoord) -> bool,
    {
        let mut depths = FillDepths::new(self.width, self.height);
        let mut frontier: VecDeque<(CellCoord, u32)> = VecDeque::new();

        for seed in seeds {
            if !self.in_bounds(seed) {
                continue;
            }
            if depths.depth(seed) == Some(0) {
                continue;
            }
            depths.record(seed, 0);
            frontier.push_back((seed, 0));
        }

        while let Some((cell, queued_depth)) = frontier.pop_front() {
            // Superseded by a later relaxation at a smaller depth.
            if depths.depth(cell) != Some(queued_depth) {
                continue;
            }
            if queued_depth >= max_depth {
                continue;
            }

            on_visit(cell, queued_depth);

            let next_depth = queued_depth + 1;
            for neighbor in self.neighbors8(cell) {
                if !is_traversable(neighbor) {
                    continue;
                }
                match depths.depth(neighbor) {
                    Some(existing) if existing <= next_depth => continue,
                    _ => {}
                }
                depths.record(neighbor, next_depth);
                frontier.push_back((neighbor, next_depth));
            }
        }

        depths
    }
}

/// Dense per-cell depths produced by [`Grid::breadth_first_fill`].
///
/// Depths default to [`FillDepths::UNREACHED`] so callers can distinguish
/// untouched cells from cells settled at depth zero.
#[derive(Clone, Debug)]
pub struct FillDepths {
    width: u32,
    height: u32,
    depths: Vec<u32>,
}

impl FillDepths {
    /// Sentinel stored for cells the fill never reached.
    pub const UNREACHED: u32 = u32::MAX;

    fn new(width: u32, height: u32) -> Self {
        let count = u64::from(width) * u64::from(height);
        let count = usize::try_from(count).unwrap_or(0);
        Self {
            width,
            height,
            depths: vec![Self::UNREACHED; count],
        }
    }

    /// Width of the filled region in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the filled region in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Dense depths stored in row-major order, [`Self::UNREACHED`] where the
    /// fill never arrived.
    #[must_use]
    pub fn cells(&self) -> &[u32] {
        &self.depths
    }

    /// Depth settled for the provided cell, if the fill reached it.
    #[must_use]
    pub fn depth(&self, cell: CellCoord) -> Option<u32> {
        let index = self.index(cell)?;
        let depth = *self.depths.get(index)?;
        (depth != Self::UNREACHED).then_some(depth)
    }

    /// Reports whether the fill reached the provided cell.
    #[must_use]
    pub fn reached(&self, cell: CellCoord) -> bool {
        self.depth(cell).is_some()
    }

    fn record(&mut self, cell: CellCoord, depth: u32) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.depths.get_mut(index) {
                *slot = depth;
            }
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.x() < self.width && cell.y() < self.height {
            let x = usize::try_from(cell.x()).ok()?;
            let y = usize::try_from(cell.y()).ok()?;
            let width = usize::try_from(self.width).ok()?;
            Some(y * width + x)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn unit_grid(width: u32, height: u32) -> Grid {
        Grid::new(Vec2::ZERO, width, height, 1.0)
    }

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(5, 7));
    }

    #[test]
    fn source_id_round_trips_through_bincode() {
        assert_round_trip(&SourceId::new(42));
    }

    #[test]
    fn world_to_cell_floors_toward_origin() {
        let grid = Grid::new(Vec2::new(-5.0, -5.0), 10, 10, 1.0);
        assert_eq!(
            grid.world_to_cell(Vec2::new(-4.2, -4.9)),
            Some(CellCoord::new(0, 0))
        );
        assert_eq!(
            grid.world_to_cell(Vec2::new(0.0, 0.0)),
            Some(CellCoord::new(5, 5))
        );
        assert_eq!(grid.world_to_cell(Vec2::new(-5.1, 0.0)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(5.0, 0.0)), None);
    }

    #[test]
    fn cell_to_world_inverts_up_to_quantization() {
        let grid = Grid::new(Vec2::new(2.0, 3.0), 8, 8, 0.5);
        let cell = CellCoord::new(3, 6);
        let corner = grid.cell_to_world(cell);
        assert_eq!(grid.world_to_cell(corner), Some(cell));
        let center = grid.cell_center_world(cell);
        assert_eq!(grid.world_to_cell(center), Some(cell));
        assert!((center - corner).abs_diff_eq(Vec2::splat(0.25), f32::EPSILON));
    }

    #[test]
    fn degenerate_cell_size_produces_empty_grid() {
        let grid = Grid::new(Vec2::ZERO, 10, 10, 0.0);
        assert_eq!(grid.width(), 0);
        assert_eq!(grid.height(), 0);
        assert_eq!(grid.world_to_cell(Vec2::ZERO), None);
    }

    #[test]
    fn from_world_size_floors_cell_counts() {
        let grid = Grid::from_world_size(Vec2::ZERO, Vec2::new(10.5, 7.9), 1.0);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 7);
    }

    #[test]
    fn neighbors8_follow_documented_order() {
        let grid = unit_grid(5, 5);
        let neighbors: Vec<CellCoord> = grid.neighbors8(CellCoord::new(2, 2)).collect();
        assert_eq!(
            neighbors,
            vec![
                CellCoord::new(1, 1),
                CellCoord::new(2, 1),
                CellCoord::new(3, 1),
                CellCoord::new(1, 2),
                CellCoord::new(3, 2),
                CellCoord::new(1, 3),
                CellCoord::new(2, 3),
                CellCoord::new(3, 3),
            ]
        );
    }

    #[test]
    fn neighbors4_skip_out_of_bounds_candidates() {
        let grid = unit_grid(3, 3);
        let neighbors: Vec<CellCoord> = grid.neighbors4(CellCoord::new(0, 0)).collect();
        assert_eq!(neighbors, vec![CellCoord::new(1, 0), CellCoord::new(0, 1)]);
    }

    #[test]
    fn footprint_covers_cells_with_centers_inside() {
        let grid = unit_grid(10, 10);
        let rect = WorldRect::new(Vec2::new(1.0, 1.0), Vec2::new(4.0, 3.0));
        let cells: Vec<CellCoord> = grid.footprint_cells(rect).collect();
        assert_eq!(cells.len(), 6);
        assert!(cells.contains(&CellCoord::new(1, 1)));
        assert!(cells.contains(&CellCoord::new(3, 2)));
        assert!(!cells.contains(&CellCoord::new(4, 1)));
    }

    #[test]
    fn footprint_of_malformed_rect_is_empty() {
        let grid = unit_grid(10, 10);
        let rect = WorldRect::new(Vec2::new(4.0, 4.0), Vec2::new(1.0, 1.0));
        assert_eq!(grid.footprint_cells(rect).count(), 0);
    }

    #[test]
    fn footprint_clamps_to_grid_bounds() {
        let grid = unit_grid(4, 4);
        let rect = WorldRect::new(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 10.0));
        assert_eq!(grid.footprint_cells(rect).count(), 16);
    }

    #[test]
    fn fill_settles_depth_rings_around_a_seed() {
        let grid = unit_grid(7, 7);
        let seed = CellCoord::new(3, 3);
        let depths = grid.breadth_first_fill([seed], 3, |_, _| {}, |_| true);

        assert_eq!(depths.depth(seed), Some(0));
        assert_eq!(depths.depth(CellCoord::new(4, 3)), Some(1));
        assert_eq!(depths.depth(CellCoord::new(4, 4)), Some(1));
        assert_eq!(depths.depth(CellCoord::new(5, 5)), Some(2));
        assert_eq!(depths.depth(CellCoord::new(6, 3)), Some(3));
        assert!(!depths.reached(CellCoord::new(0, 3)));
    }

    #[test]
    fn fill_visits_each_cell_exactly_once() {
        let grid = unit_grid(6, 6);
        let seeds = [CellCoord::new(0, 0), CellCoord::new(1, 0)];
        let mut visits: Vec<(CellCoord, u32)> = Vec::new();
        let _ =
            grid.breadth_first_fill(seeds, 4, |cell, depth| visits.push((cell, depth)), |_| true);

        let mut seen = visits.iter().map(|(cell, _)| *cell).collect::<Vec<_>>();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total, "no cell may be visited twice");
    }

    #[test]
    fn fill_respects_traversability_gate() {
        let grid = unit_grid(5, 5);
        let blocked_column = 2;
        let depths = grid.breadth_first_fill(
            [CellCoord::new(0, 2)],
            10,
            |_, _| {},
            |cell| cell.x() != blocked_column,
        );

        assert!(depths.reached(CellCoord::new(1, 0)));
        assert!(!depths.reached(CellCoord::new(3, 2)));
        assert!(!depths.reached(CellCoord::new(4, 4)));
    }

    #[test]
    fn fill_stops_visiting_at_max_depth() {
        let grid = unit_grid(9, 9);
        let mut deepest = 0;
        let _ = grid.breadth_first_fill(
            [CellCoord::new(4, 4)],
            2,
            |_, depth| deepest = deepest.max(depth),
            |_| true,
        );
        assert_eq!(deepest, 1, "cells settled at max depth are not visited");
    }

    #[test]
    fn fill_relaxes_toward_the_closer_seed() {
        let grid = unit_grid(9, 1);
        let depths = grid.breadth_first_fill(
            [CellCoord::new(0, 0), CellCoord::new(8, 0)],
            10,
            |_, _| {},
            |_| true,
        );
        assert_eq!(depths.depth(CellCoord::new(2, 0)), Some(2));
        assert_eq!(depths.depth(CellCoord::new(6, 0)), Some(2));
        assert_eq!(depths.depth(CellCoord::new(4, 0)), Some(4));
    }

    #[test]
    fn fill_ignores_out_of_bounds_and_duplicate_seeds() {
        let grid = unit_grid(3, 3);
        let seeds = [
            CellCoord::new(1, 1),
            CellCoord::new(1, 1),
            CellCoord::new(9, 9),
        ];
        let mut visit_count = 0;
        let depths = grid.breadth_first_fill(seeds, 1, |_, _| visit_count += 1, |_| true);
        assert_eq!(visit_count, 1);
        assert_eq!(depths.depth(CellCoord::new(1, 1)), Some(0));
    }
}
