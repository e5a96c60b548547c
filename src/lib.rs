#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod animator;
pub mod bounds;
pub mod builder;
pub mod config;
pub mod duplicates;
pub mod errors;
pub mod extraction;
pub mod ids;
pub mod mapping;
pub mod registry;
pub mod schedule;
pub mod tile;
pub mod utils;

pub use animation::{ElementTimeline, EntryTimeBehavior, Interpolation, KeyframeTrack};
pub use animator::{Animator, PlaybackState};
pub use bounds::BoundingBox;
pub use builder::TimelineBuilder;
pub use config::{AnimatorSettings, MaterialParameters};
pub use errors::{Result, TimelineError};
pub use ids::{AnimationKey, ElementId, ElementIndex, FeatureId, MaterialId, TileId};
pub use mapping::{HideReason, SceneMapping};
pub use registry::{ElementRegistry, Requirements};
pub use schedule::{AppearanceProfile, ProfileAction, Task, TimeRange};
pub use tile::{SceneTile, TileContent, TileStore};
