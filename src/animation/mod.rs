//! Keyframe Animation
//!
//! Per-element timelines made of four keyframe tracks:
//!
//! - **Color**: [`ColorValue`], `None` keeps the source color
//! - **Visibility**: opacity in [0, 1]
//! - **Cutting plane**: [`PlaneValue`], possibly deferred until the animated
//!   group's bounding box is known
//! - **Transform**: [`TransformValue`] around an [`AnchorPoint`]
//!
//! Each keyframe carries an [`Interpolation`] mode describing the segment it
//! starts: `Step`, `Linear` or `Next`.
//!
//! # Example
//!
//! ```rust,ignore
//! use timeline4d::animation::{EntryTimeBehavior, Interpolation, KeyframeTrack};
//!
//! let mut alpha = KeyframeTrack::<f32>::new();
//! alpha.set(0.0, 0.0, Interpolation::Linear);
//! alpha.set(10.0, 1.0, Interpolation::Step);
//! assert_eq!(alpha.evaluate(5.0, EntryTimeBehavior::UseRightInterval), Some(0.5));
//! ```

pub mod plane;
pub mod timeline;
pub mod tracks;
pub mod transform;
pub mod values;

pub use plane::{GrowthStatus, PlaneValue};
pub use timeline::{ElementTimeline, TimelineState};
pub use tracks::{EntryTimeBehavior, Interpolation, Keyframe, KeyframeCursor, KeyframeTrack};
pub use transform::{AnchorPoint, TransformValue};
pub use values::{ColorValue, Interpolatable, VisibilityValue};
