//! Multi-channel sense bundle: presence, smell, and sound over one grid.

use std::time::Duration;

use fieldsense_core::{CellCoord, Grid, SourceId, WorldRect};
use glam::Vec2;

use crate::field::{InfluenceField, TickError};
use crate::obstacles::ObstacleMap;
use crate::source::{Falloff, InfluenceSource, SourceKind};

/// The three sensory channels a [`SenseField`] maintains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SenseChannel {
    /// Line-of-presence signal, typically short-lived.
    Presence,
    /// Scent trails, typically slow to fade.
    Smell,
    /// Sound impulses, typically wide but fleeting.
    Sound,
}

/// Per-channel decay rates applied each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SenseTuning {
    /// Decay applied to the presence channel, per second.
    pub presence_decay: f32,
    /// Decay applied to the smell channel, per second.
    pub smell_decay: f32,
    /// Decay applied to the sound channel, per second.
    pub sound_decay: f32,
}

impl Default for SenseTuning {
    fn default() -> Self {
        Self {
            presence_decay: 1.0,
            smell_decay: 1.0,
            sound_decay: 1.0,
        }
    }
}

/// Strength and reach a multi-channel source emits on one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelEmission {
    /// Scalar strength contributed at the source itself.
    pub value: f32,
    /// Propagation reach measured in cells.
    pub range: u32,
}

/// Specification for an actor that emits on every sense channel at once.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiSourceProfile {
    /// Kind of actor emitting the influence.
    pub kind: SourceKind,
    /// Shared world-space footprint seeding all three channels.
    pub footprint: WorldRect,
    /// Optional shared direction biasing all three channels.
    pub direction: Option<Vec2>,
    /// Presence emission parameters.
    pub presence: ChannelEmission,
    /// Smell emission parameters.
    pub smell: ChannelEmission,
    /// Sound emission parameters.
    pub sound: ChannelEmission,
}

/// Modifier weights applied when combining the three channels into one
/// score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelWeights {
    /// Multiplier applied to the presence level.
    pub presence: f32,
    /// Multiplier applied to the smell level.
    pub smell: f32,
    /// Multiplier applied to the sound level.
    pub sound: f32,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            presence: 1.0,
            smell: 1.0,
            sound: 1.0,
        }
    }
}

/// Bundle of presence, smell, and sound fields advanced as one unit.
///
/// All three channels share the caller's grid and obstacle map; a
/// multi-channel source registers one [`InfluenceSource`] per channel under
/// a single identifier, and the bundle keeps the three registries in step.
#[derive(Debug)]
pub struct SenseField {
    presence: InfluenceField,
    smell: InfluenceField,
    sound: InfluenceField,
}

impl SenseField {
    /// Creates zeroed channel fields sized to the provided grid.
    #[must_use]
    pub fn new(grid: &Grid, tuning: SenseTuning) -> Self {
        Self {
            presence: InfluenceField::new(grid, tuning.presence_decay),
            smell: InfluenceField::new(grid, tuning.smell_decay),
            sound: InfluenceField::new(grid, tuning.sound_decay),
        }
    }

    /// Read-only access to the presence channel.
    #[must_use]
    pub const fn presence(&self) -> &InfluenceField {
        &self.presence
    }

    /// Read-only access to the smell channel.
    #[must_use]
    pub const fn smell(&self) -> &InfluenceField {
        &self.smell
    }

    /// Read-only access to the sound channel.
    #[must_use]
    pub const fn sound(&self) -> &InfluenceField {
        &self.sound
    }

    /// Registers a multi-channel source on all three channels.
    ///
    /// Returns `false` without touching any registry when the identifier is
    /// already registered.
    pub fn register_source(&mut self, id: SourceId, profile: &MultiSourceProfile) -> bool {
        if !self.presence.register_source(id, channel_source(profile, profile.presence)) {
            return false;
        }
        let _ = self.smell.register_source(id, channel_source(profile, profile.smell));
        let _ = self.sound.register_source(id, channel_source(profile, profile.sound));
        true
    }

    /// Removes a multi-channel source from all three channels.
    pub fn deregister_source(&mut self, id: SourceId) -> bool {
        let removed = self.presence.deregister_source(id);
        let _ = self.smell.deregister_source(id);
        let _ = self.sound.deregister_source(id);
        removed
    }

    /// Number of registered multi-channel sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.presence.source_count()
    }

    /// Updates the shared footprint of a registered source on every channel.
    pub fn update_footprint(&mut self, id: SourceId, footprint: WorldRect) {
        for field in [&mut self.presence, &mut self.smell, &mut self.sound] {
            if let Some(source) = field.source_mut(id) {
                source.footprint = footprint;
            }
        }
    }

    /// Updates the shared direction of a registered source on every channel.
    pub fn update_direction(&mut self, id: SourceId, direction: Option<Vec2>) {
        for field in [&mut self.presence, &mut self.smell, &mut self.sound] {
            if let Some(source) = field.source_mut(id) {
                source.direction = direction;
            }
        }
    }

    /// Adds an impulse to a single channel at a world-space point.
    pub fn inject(&mut self, channel: SenseChannel, grid: &Grid, point: Vec2, value: f32) {
        self.channel_mut(channel).inject(grid, point, value);
    }

    /// Modifier-weighted sum of the three channel levels at a cell.
    #[must_use]
    pub fn combined_level(&self, cell: CellCoord, weights: ChannelWeights) -> f32 {
        self.presence.level_at(cell) * weights.presence
            + self.smell.level_at(cell) * weights.smell
            + self.sound.level_at(cell) * weights.sound
    }

    /// Advances all three channels by one tick and joins them.
    ///
    /// Channels tick concurrently; the call returns after every channel's
    /// own propagation join, surfacing the first failure if any.
    pub fn advance(
        &mut self,
        dt: Duration,
        grid: &Grid,
        obstacles: &ObstacleMap,
    ) -> Result<(), TickError> {
        let Self {
            presence,
            smell,
            sound,
        } = self;
        let (presence_result, (smell_result, sound_result)) = rayon::join(
            || presence.advance(dt, grid, obstacles),
            || {
                rayon::join(
                    || smell.advance(dt, grid, obstacles),
                    || sound.advance(dt, grid, obstacles),
                )
            },
        );
        presence_result?;
        smell_result?;
        sound_result?;
        Ok(())
    }

    fn channel_mut(&mut self, channel: SenseChannel) -> &mut InfluenceField {
        match channel {
            SenseChannel::Presence => &mut self.presence,
            SenseChannel::Smell => &mut self.smell,
            SenseChannel::Sound => &mut self.sound,
        }
    }
}

fn channel_source(profile: &MultiSourceProfile, emission: ChannelEmission) -> InfluenceSource {
    InfluenceSource {
        kind: profile.kind,
        value: emission.value,
        range: emission.range,
        falloff: Falloff::InvertedQuadratic,
        direction: profile.direction,
        footprint: profile.footprint,
    }
}
