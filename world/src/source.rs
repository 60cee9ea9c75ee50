//! Influence source records and their distance falloff profiles.

use fieldsense_core::WorldRect;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Kinds of actors that emit influence into the world.
///
/// Consumers weight fields per kind through [`Preferences`]; the engine
/// itself treats every kind identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// The player avatar.
    Player,
    /// Prey animals.
    Rabbit,
    /// Edible plant life.
    Vegetable,
    /// Predators.
    Wolf,
}

/// Value-by-distance profile applied while a source propagates outward.
///
/// Every profile is maximal at distance zero, exactly zero at the source's
/// range, and finite and monotonically decreasing in between, so propagation
/// fades smoothly into the surrounding field with no clipping artifact at
/// the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Falloff {
    /// Inverted quadratic bowl: `value / range² · (distance − range)²`.
    InvertedQuadratic,
    /// Exponential decay rescaled to reach exactly zero at the range.
    Exponential {
        /// Decay rate; larger values concentrate influence near the source.
        steepness: f32,
    },
}

impl Falloff {
    /// Influence contributed at `distance` from a source of strength
    /// `source_value` with reach `max_distance`.
    ///
    /// Degenerate configurations (non-positive range or steepness) yield
    /// zero everywhere rather than an error.
    #[must_use]
    pub fn value_at(self, distance: f32, source_value: f32, max_distance: f32) -> f32 {
        if max_distance <= 0.0 {
            return 0.0;
        }
        let distance = distance.max(0.0);
        if distance >= max_distance {
            return 0.0;
        }

        match self {
            Self::InvertedQuadratic => {
                let offset = distance - max_distance;
                source_value / (max_distance * max_distance) * offset * offset
            }
            Self::Exponential { steepness } => {
                if steepness <= 0.0 {
                    return 0.0;
                }
                let tail = (-steepness * max_distance).exp();
                source_value * ((-steepness * distance).exp() - tail) / (1.0 - tail)
            }
        }
    }
}

/// Influence emitter registered with exactly one field at a time.
///
/// The record is immutable while a tick runs; the owning entity keeps the
/// footprint rectangle and direction current between ticks through
/// [`crate::InfluenceField::source_mut`].
#[derive(Clone, Debug, PartialEq)]
pub struct InfluenceSource {
    /// Kind of actor emitting the influence.
    pub kind: SourceKind,
    /// Scalar strength contributed at the source itself.
    pub value: f32,
    /// Propagation reach measured in cells.
    pub range: u32,
    /// Distance falloff profile.
    pub falloff: Falloff,
    /// Optional direction (e.g. a velocity) biasing the contribution.
    pub direction: Option<Vec2>,
    /// World-space rectangle seeding the propagation at depth zero.
    pub footprint: WorldRect,
}

impl InfluenceSource {
    /// Creates an undirected source with the canonical quadratic falloff.
    #[must_use]
    pub const fn new(kind: SourceKind, value: f32, range: u32, footprint: WorldRect) -> Self {
        Self {
            kind,
            value,
            range,
            falloff: Falloff::InvertedQuadratic,
            direction: None,
            footprint,
        }
    }

    /// Directional scaling factor for a cell offset from the footprint
    /// center.
    ///
    /// Returns 1 for undirected sources and for degenerate offsets, and
    /// otherwise remaps the normalized dot product into `[0, 1]` so that
    /// cells ahead of the direction receive the full contribution and cells
    /// directly behind receive none.
    #[must_use]
    pub fn direction_factor(&self, offset: Vec2) -> f32 {
        let Some(direction) = self.direction else {
            return 1.0;
        };
        if direction.length_squared() <= f32::EPSILON || offset.length_squared() <= f32::EPSILON {
            return 1.0;
        }
        let alignment = direction.normalize().dot(offset.normalize());
        (alignment + 1.0) * 0.5
    }
}

/// Weight table mapping source kinds to navigation preferences.
///
/// Missing kinds weigh zero, mirroring a consumer that simply ignores
/// signals it has no opinion about.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    weights: Vec<(SourceKind, f32)>,
}

impl Preferences {
    /// Creates an empty preference table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            weights: Vec::new(),
        }
    }

    /// Sets the weight for a kind, replacing any previous entry.
    pub fn set_weight(&mut self, kind: SourceKind, weight: f32) {
        if let Some(entry) = self.weights.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = weight;
        } else {
            self.weights.push((kind, weight));
        }
    }

    /// Weight recorded for the kind, zero when absent.
    #[must_use]
    pub fn weight_for(&self, kind: SourceKind) -> f32 {
        self.weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, weight)| *weight)
            .unwrap_or(0.0)
    }
}
