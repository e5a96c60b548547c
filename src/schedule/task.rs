use glam::{Quat, Vec3};

use crate::animation::AnchorPoint;
use crate::errors::{Result, TimelineError};
use crate::schedule::profile::AppearanceProfile;

/// Closed time interval of a task, in seconds on the schedule's time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !(start.is_finite() && end.is_finite()) || end < start {
            return Err(TimelineError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A pose applied for the whole duration of a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticPose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// One keyframe of a 3D path, `relative_time` being a fraction of the task duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathKeyframe {
    pub relative_time: f64,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathAssignment {
    pub keyframes: Vec<PathKeyframe>,
    pub anchor: AnchorPoint,
    /// Walk the path from its end to its start.
    pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformAssignment {
    Static(StaticPose),
    Path(PathAssignment),
}

/// A schedule task bound to some elements, as delivered by the schedule source.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub time_range: TimeRange,
    pub profile: AppearanceProfile,
    pub transform: Option<TransformAssignment>,
}

impl Task {
    #[must_use]
    pub fn new(name: impl Into<String>, time_range: TimeRange, profile: AppearanceProfile) -> Self {
        Self {
            name: name.into(),
            time_range,
            profile,
            transform: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: TransformAssignment) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Checks what the type system cannot: ranges built without
    /// [`TimeRange::new`], out-of-range path keyframes.
    pub fn validate(&self) -> Result<()> {
        TimeRange::new(self.time_range.start, self.time_range.end)?;
        if let Some(TransformAssignment::Path(path)) = &self.transform
            && let Some(bad) = path
                .keyframes
                .iter()
                .find(|k| !(0.0..=1.0).contains(&k.relative_time))
        {
            return Err(TimelineError::InvalidPathKeyframe(bad.relative_time));
        }
        Ok(())
    }
}
