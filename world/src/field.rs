//! Persistent influence levels accumulated from registered sources.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use fieldsense_core::{CellCoord, Grid, SourceId};
use glam::Vec2;
use log::{debug, error, trace};
use thiserror::Error;

use crate::obstacles::ObstacleMap;
use crate::source::InfluenceSource;

/// Levels whose magnitude drops to or below this snap to exactly zero during
/// decay, preventing asymptotic never-reaches-zero drift.
const ZERO_SNAP_THRESHOLD: f32 = 0.1;

/// Error surfaced by [`InfluenceField::advance`] after the propagation join.
#[derive(Debug, Error)]
pub enum TickError {
    /// A source's propagation task panicked.
    ///
    /// Other sources' contributions were unaffected and the field keeps
    /// ticking normally on subsequent advances.
    #[error("propagation for source {id:?} failed: {message}")]
    SourcePropagationFailed {
        /// Identifier of the source whose propagation failed.
        id: SourceId,
        /// Panic payload rendered as text.
        message: String,
    },
}

/// Dense per-cell influence levels driven by registered sources.
///
/// The field owns two buffers sized to its grid: a transient contribution
/// buffer that every source adds into during a tick, and a persistent level
/// buffer that decays toward zero between contributions. Both store `f32`
/// bit patterns inside [`AtomicU32`] cells so that per-source propagation
/// tasks may write concurrently without lost updates.
///
/// The field must be advanced with the same [`Grid`] it was created from;
/// the grid is deliberately not owned so that many fields can share one.
#[derive(Debug)]
pub struct InfluenceField {
    width: u32,
    height: u32,
    decay_per_second: f32,
    contribution: Vec<AtomicU32>,
    level: Vec<AtomicU32>,
    sources: Vec<(SourceId, InfluenceSource)>,
}

impl InfluenceField {
    /// Creates a zeroed field sized to the provided grid.
    #[must_use]
    pub fn new(grid: &Grid, decay_per_second: f32) -> Self {
        let count = grid.cell_count();
        Self {
            width: grid.width(),
            height: grid.height(),
            decay_per_second: decay_per_second.max(0.0),
            contribution: zeroed_buffer(count),
            level: zeroed_buffer(count),
            sources: Vec::new(),
        }
    }

    /// Decay rate applied per second of tick time.
    #[must_use]
    pub const fn decay_per_second(&self) -> f32 {
        self.decay_per_second
    }

    /// Registers a source under the provided identifier.
    ///
    /// Returns `false` without touching the registry when the identifier is
    /// already registered, making repeated registration a no-op.
    pub fn register_source(&mut self, id: SourceId, source: InfluenceSource) -> bool {
        if self.source_index(id).is_some() {
            return false;
        }
        self.sources.push((id, source));
        true
    }

    /// Removes the source registered under the identifier.
    ///
    /// Returns `false` when no such source exists, making removal of a
    /// non-member a no-op.
    pub fn deregister_source(&mut self, id: SourceId) -> bool {
        let Some(index) = self.source_index(id) else {
            return false;
        };
        let _ = self.sources.remove(index);
        true
    }

    /// Number of currently registered sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Mutable access to a registered source so its owner can keep the
    /// footprint and direction current between ticks.
    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut InfluenceSource> {
        let index = self.source_index(id)?;
        self.sources.get_mut(index).map(|(_, source)| source)
    }

    fn source_index(&self, id: SourceId) -> Option<usize> {
        self.sources.iter().position(|(existing, _)| *existing == id)
    }

    /// Influence level stored for the cell, zero when out of bounds.
    #[must_use]
    pub fn level_at(&self, cell: CellCoord) -> f32 {
        self.index(cell)
            .and_then(|index| self.level.get(index))
            .map(atomic_load)
            .unwrap_or(0.0)
    }

    /// Influence level at a world-space point, zero outside the grid.
    #[must_use]
    pub fn level_at_world(&self, grid: &Grid, point: Vec2) -> f32 {
        grid.world_to_cell(point)
            .map(|cell| self.level_at(cell))
            .unwrap_or(0.0)
    }

    /// Contribution accumulated for the cell during the current tick.
    #[must_use]
    pub fn contribution_at(&self, cell: CellCoord) -> f32 {
        self.index(cell)
            .and_then(|index| self.contribution.get(index))
            .map(atomic_load)
            .unwrap_or(0.0)
    }

    /// Read-only snapshot view over the level buffer for visualization
    /// consumers.
    #[must_use]
    pub fn levels(&self) -> LevelView<'_> {
        LevelView { field: self }
    }

    /// Adds an impulse at a world-space point, outside the tick cycle.
    ///
    /// The impulse lands in the contribution buffer and is folded into the
    /// level immediately, then decays like any propagated influence. Points
    /// outside the grid are ignored.
    pub fn inject(&mut self, grid: &Grid, point: Vec2, value: f32) {
        let Some(cell) = grid.world_to_cell(point) else {
            return;
        };
        let Some(index) = self.index(cell) else {
            return;
        };
        let Some(slot) = self.contribution.get_mut(index) else {
            return;
        };
        let bits = slot.get_mut();
        let accumulated = f32::from_bits(*bits) + value;
        *bits = accumulated.to_bits();

        if let Some(level) = self.level.get_mut(index) {
            let level_bits = level.get_mut();
            if accumulated > f32::from_bits(*level_bits) {
                *level_bits = accumulated.to_bits();
            }
        }
    }

    /// Advances the field by one tick: decay, clear, propagate, join.
    ///
    /// Existing levels decay against the previous tick's fully-joined
    /// buffer, the contribution buffer is cleared, and every registered
    /// source then propagates on its own parallel task, accumulating
    /// falloff-weighted contributions and raising levels to the maximum of
    /// themselves and the contribution. The call returns only after every
    /// task has joined, so consumers reading afterwards always observe a
    /// complete tick. The exclusive borrow makes overlapping advances on one
    /// field unrepresentable.
    pub fn advance(
        &mut self,
        dt: Duration,
        grid: &Grid,
        obstacles: &ObstacleMap,
    ) -> Result<(), TickError> {
        self.decay(dt);
        self.clear_contribution();

        let failures: Mutex<Vec<(SourceId, String)>> = Mutex::new(Vec::new());
        let contribution = &self.contribution;
        let level = &self.level;

        rayon::scope(|scope| {
            for (id, source) in &self.sources {
                let failures = &failures;
                scope.spawn(move |_| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        propagate_source(grid, obstacles, source, contribution, level);
                    }));
                    if let Err(payload) = outcome {
                        let message = panic_message(payload);
                        error!("propagation for source {id:?} failed: {message}");
                        let mut failures = failures
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        failures.push((*id, message));
                    }
                });
            }
        });

        debug!(
            "field tick joined: {} sources, dt {:.3}s",
            self.sources.len(),
            dt.as_secs_f32()
        );

        let failures = failures
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match failures.into_iter().next() {
            Some((id, message)) => Err(TickError::SourcePropagationFailed { id, message }),
            None => Ok(()),
        }
    }

    fn decay(&mut self, dt: Duration) {
        let amount = self.decay_per_second * dt.as_secs_f32();
        if amount <= 0.0 {
            return;
        }
        for cell in &mut self.level {
            let bits = cell.get_mut();
            let value = f32::from_bits(*bits);
            if value == 0.0 {
                continue;
            }
            let magnitude = value.abs() - amount;
            let next = if magnitude <= ZERO_SNAP_THRESHOLD {
                0.0
            } else {
                magnitude.copysign(value)
            };
            *bits = next.to_bits();
        }
    }

    fn clear_contribution(&mut self) {
        for cell in &mut self.contribution {
            *cell.get_mut() = 0.0f32.to_bits();
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

/// Read-only view into a field's level buffer.
#[derive(Clone, Copy, Debug)]
pub struct LevelView<'a> {
    field: &'a InfluenceField,
}

impl<'a> LevelView<'a> {
    /// Level stored for the cell, zero when out of bounds.
    #[must_use]
    pub fn level(&self, cell: CellCoord) -> f32 {
        self.field.level_at(cell)
    }

    /// Dimensions of the underlying field in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.field.width, self.field.height)
    }

    /// Iterator over all levels in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.field.level.iter().map(atomic_load)
    }
}

/// Flood-fills one source's influence into the shared buffers.
fn propagate_source(
    grid: &Grid,
    obstacles: &ObstacleMap,
    source: &InfluenceSource,
    contribution: &[AtomicU32],
    level: &[AtomicU32],
) {
    if source.value == 0.0 || source.range == 0 {
        return;
    }
    let seeds: Vec<CellCoord> = grid.footprint_cells(source.footprint).collect();
    if seeds.is_empty() {
        return;
    }
    let seed_count = seeds.len();
    let center = source.footprint.center();
    let max_distance = source.range as f32;

    let _ = grid.breadth_first_fill(
        seeds,
        source.range,
        |cell, depth| {
            let Some(index) = buffer_index(grid, cell) else {
                return;
            };
            let falloff = source
                .falloff
                .value_at(depth as f32, source.value, max_distance);
            let bias = source.direction_factor(grid.cell_center_world(cell) - center);
            let amount = falloff * bias;
            if amount == 0.0 {
                return;
            }
            let Some(slot) = contribution.get(index) else {
                return;
            };
            let accumulated = atomic_add(slot, amount);
            if let Some(slot) = level.get(index) {
                atomic_max(slot, accumulated);
            }
        },
        |cell| obstacles.is_passable(cell),
    );

    trace!(
        "propagated {:?} source from {seed_count} seed cells to range {}",
        source.kind,
        source.range
    );
}

fn buffer_index(grid: &Grid, cell: CellCoord) -> Option<usize> {
    if !grid.in_bounds(cell) {
        return None;
    }
    let x = usize::try_from(cell.x()).ok()?;
    let y = usize::try_from(cell.y()).ok()?;
    let width = usize::try_from(grid.width()).ok()?;
    Some(y * width + x)
}

fn zeroed_buffer(count: usize) -> Vec<AtomicU32> {
    let mut buffer = Vec::with_capacity(count);
    buffer.resize_with(count, || AtomicU32::new(0.0f32.to_bits()));
    buffer
}

fn atomic_load(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

/// Adds `delta` with a compare-and-swap loop, returning the updated value.
///
/// A plain read-modify-write would lose concurrent additions from other
/// sources targeting the same cell.
fn atomic_add(cell: &AtomicU32, delta: f32) -> f32 {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = f32::from_bits(current) + delta;
        match cell.compare_exchange_weak(
            current,
            next.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(observed) => current = observed,
        }
    }
}

/// Raises the cell to `value` when it exceeds the stored level.
fn atomic_max(cell: &AtomicU32, value: f32) {
    let mut current = cell.load(Ordering::Relaxed);
    while value > f32::from_bits(current) {
        match cell.compare_exchange_weak(
            current,
            value.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("opaque panic payload")
    }
}
