#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative mutable influence state for the fieldsense engine.
//!
//! This crate owns everything that changes at runtime: the obstacle height
//! map, the influence sources registered by external actors, and the
//! influence fields whose per-cell levels accumulate from those sources each
//! tick and decay between contributions. Fields are advanced by an external
//! tick driver; between ticks, consumers read levels through cheap read-only
//! queries and views.

mod field;
mod obstacles;
mod sense;
mod source;

pub use field::{InfluenceField, LevelView, TickError};
pub use obstacles::ObstacleMap;
pub use sense::{
    ChannelEmission, ChannelWeights, MultiSourceProfile, SenseChannel, SenseField, SenseTuning,
};
pub use source::{Falloff, InfluenceSource, Preferences, SourceKind};
