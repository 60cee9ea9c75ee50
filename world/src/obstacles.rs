//! Per-cell blocking heights consulted by propagation and navigation.

use fieldsense_core::{CellCoord, Grid, WorldRect};

/// Heights at or below this value count as passable terrain.
const PASSABLE_EPSILON: f32 = 1e-4;

/// Dense map from grid cell to blocking height.
///
/// A height of zero means the cell is passable; anything larger blocks both
/// influence propagation and navigation. Out-of-bounds queries answer with
/// zero rather than failing, so callers bounds-check separately when the
/// distinction matters.
#[derive(Clone, Debug)]
pub struct ObstacleMap {
    width: u32,
    height: u32,
    heights: Vec<f32>,
}

impl ObstacleMap {
    /// Creates an all-passable obstacle map sized to the provided grid.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            heights: vec![0.0; grid.cell_count()],
        }
    }

    /// Dimensions of the map in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Blocking height stored for the cell, zero when out of bounds.
    #[must_use]
    pub fn blocking_height(&self, cell: CellCoord) -> f32 {
        self.index(cell)
            .and_then(|index| self.heights.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Reports whether the cell can be traversed or propagated through.
    #[must_use]
    pub fn is_passable(&self, cell: CellCoord) -> bool {
        self.blocking_height(cell) <= PASSABLE_EPSILON
    }

    /// Raises the cell's blocking height by `delta`, clamping at zero.
    pub fn add_height(&mut self, cell: CellCoord, delta: f32) {
        self.adjust(cell, delta);
    }

    /// Lowers the cell's blocking height by `delta`, clamping at zero.
    pub fn remove_height(&mut self, cell: CellCoord, delta: f32) {
        self.adjust(cell, -delta);
    }

    /// Raises every cell covered by the world-space rectangle.
    ///
    /// Convenience for world setup, where obstacle authoring projects the
    /// bounds of scene geometry onto the grid.
    pub fn add_height_in_rect(&mut self, grid: &Grid, rect: WorldRect, height: f32) {
        for cell in grid.footprint_cells(rect) {
            self.adjust(cell, height);
        }
    }

    fn adjust(&mut self, cell: CellCoord, delta: f32) {
        let Some(index) = self.index(cell) else {
            return;
        };
        if let Some(slot) = self.heights.get_mut(index) {
            *slot = (*slot + delta).max(0.0);
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
