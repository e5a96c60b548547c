//! Schedule Input
//!
//! The shape of the data consumed from the schedule source: tasks with a time
//! range, an [`AppearanceProfile`] and an optional [`TransformAssignment`].
//! How that data is fetched or encoded is not this crate's concern.

pub mod profile;
pub mod task;

pub use profile::{ActiveAppearance, Appearance, AppearanceProfile, GrowthMode, ProfileAction};
pub use task::{PathAssignment, PathKeyframe, StaticPose, Task, TimeRange, TransformAssignment};
