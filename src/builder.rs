//! Timeline Builder
//!
//! Turns schedule tasks into keyframes on an [`ElementTimeline`]. Each track
//! is handled by a pure function of the task's time range and appearance
//! profile, dispatching on [`ProfileAction`] and [`GrowthMode`].
//!
//! # Boundary keyframes
//!
//! Successive tasks bound to the same elements append to the same tracks. A
//! task therefore brackets its own range with "boundary" keyframes, placed one
//! `keyframe_epsilon` before its start or after its end, so that neither the
//! previous task's final state nor its own initial state leaks across the
//! exact boundary instant. Boundary keyframes are only emitted when the value
//! actually changes there.
//!
//! # Example
//!
//! ```rust,ignore
//! let builder = TimelineBuilder::new(&settings);
//! let mut timeline = ElementTimeline::new(key);
//! builder.add_task(&mut timeline, &task)?;
//! let needs = builder.requirements_of(&timeline);
//! ```

use glam::Vec3;

use crate::animation::{
    AnchorPoint, ElementTimeline, GrowthStatus, Interpolation, PlaneValue, TransformValue,
};
use crate::config::AnimatorSettings;
use crate::errors::Result;
use crate::registry::Requirements;
use crate::schedule::{
    AppearanceProfile, GrowthMode, PathAssignment, ProfileAction, StaticPose, Task, TimeRange,
    TransformAssignment,
};

/// Path positions closer than this are considered identical.
const PATH_POSITION_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct TimelineBuilder<'a> {
    settings: &'a AnimatorSettings,
}

impl<'a> TimelineBuilder<'a> {
    #[must_use]
    pub fn new(settings: &'a AnimatorSettings) -> Self {
        Self { settings }
    }

    #[inline]
    fn epsilon(&self) -> f64 {
        self.settings.keyframe_epsilon
    }

    /// Appends every track of `task` to `timeline`.
    pub fn add_task(&self, timeline: &mut ElementTimeline, task: &Task) -> Result<()> {
        task.validate()?;
        let range = &task.time_range;
        self.add_color(timeline, &task.profile, range);
        self.add_cutting_plane(timeline, &task.profile, range);
        self.add_visibility(timeline, &task.profile, range);
        if let Some(transform) = &task.transform {
            self.add_transform(timeline, transform, range);
        }
        timeline.mark_modified();
        log::trace!(
            "Task '{}' [{}, {}] added to timeline {:?}",
            task.name,
            range.start,
            range.end,
            timeline.key()
        );
        Ok(())
    }

    // ========================================================================
    // Color
    // ========================================================================

    pub fn add_color(&self, timeline: &mut ElementTimeline, profile: &AppearanceProfile, range: &TimeRange) {
        if profile.action == ProfileAction::Neutral {
            return;
        }
        let before = profile.start.color_value();
        let start = profile.active.base.color_value();
        let after = profile.finish.color_value();
        if profile.action == ProfileAction::Maintenance
            && before.is_none()
            && start.is_none()
            && after.is_none()
        {
            return;
        }

        let track = &mut timeline.color;
        if before != start {
            track.set(range.start - self.epsilon(), before, Interpolation::Step);
        }
        if range.end <= range.start {
            track.set(range.start, after, Interpolation::Step);
            return;
        }
        track.set(range.start, start, Interpolation::Step);
        if after != start {
            track.set(range.end + self.epsilon(), after, Interpolation::Step);
        } else {
            track.set(range.end, after, Interpolation::Step);
        }
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    pub fn add_visibility(&self, timeline: &mut ElementTimeline, profile: &AppearanceProfile, range: &TimeRange) {
        let eps = self.epsilon();
        let track = &mut timeline.visibility;
        if profile.action == ProfileAction::Neutral {
            track.set(range.start, 0.0, Interpolation::Step);
            return;
        }

        let opaque = |original: bool, alpha: f32| original || alpha == 1.0;
        let active = &profile.active;
        if profile.action == ProfileAction::Maintenance
            && opaque(profile.start.use_original_alpha, profile.start.alpha)
            && (active.base.use_original_alpha || (active.base.alpha == 1.0 && active.finish_alpha == 1.0))
            && opaque(profile.finish.use_original_alpha, profile.finish.alpha)
        {
            return;
        }

        let alpha_before = match profile.action {
            ProfileAction::Install | ProfileAction::Temporary => 0.0,
            _ => profile.start.alpha_value(),
        };
        let alpha_after = match profile.action {
            ProfileAction::Remove | ProfileAction::Temporary => 0.0,
            _ => profile.finish.alpha_value(),
        };

        if range.end - eps <= range.start {
            if alpha_before != alpha_after {
                track.set(range.start - eps, alpha_before, Interpolation::Step);
            }
            track.set(range.end, alpha_after, Interpolation::Step);
            return;
        }

        let start_alpha = active.start_alpha();
        let finish_alpha = active.end_alpha();
        if alpha_before != start_alpha {
            track.set(range.start - eps, alpha_before, Interpolation::Step);
        }
        if start_alpha == finish_alpha {
            track.set(range.start, start_alpha, Interpolation::Step);
        } else {
            track.set(range.start, start_alpha, Interpolation::Linear);
            track.set(range.end - eps, finish_alpha, Interpolation::Step);
        }
        if alpha_after != finish_alpha {
            track.set(range.end + eps, alpha_after, Interpolation::Step);
        }
    }

    // ========================================================================
    // Cutting plane
    // ========================================================================

    pub fn add_cutting_plane(&self, timeline: &mut ElementTimeline, profile: &AppearanceProfile, range: &TimeRange) {
        let eps = self.epsilon();
        let action = profile.action;
        if action == ProfileAction::Neutral || range.end - eps <= range.start {
            // Zero-length tasks are fully handled by visibility.
            return;
        }
        let track = &mut timeline.cutting_plane;
        let growth = profile.active.growth;
        if matches!(growth, GrowthMode::None | GrowthMode::Unknown) {
            if matches!(action, ProfileAction::Remove | ProfileAction::Maintenance) {
                track.set(range.start, PlaneValue::FULLY_GROWN, Interpolation::Step);
            }
            if matches!(action, ProfileAction::Install | ProfileAction::Maintenance) {
                track.set(range.end, PlaneValue::FULLY_GROWN, Interpolation::Step);
            }
            return;
        }
        let Some(normal) = growth.plane_normal() else {
            log::debug!("Degenerate growth direction {growth:?}, no cutting plane");
            return;
        };

        let visible_outside = action == ProfileAction::Maintenance;
        let invert = action == ProfileAction::Remove
            || (profile.active.invert_growth
                && matches!(action, ProfileAction::Maintenance | ProfileAction::Temporary));
        let (from, to) = if invert {
            (GrowthStatus::FullyGrown, GrowthStatus::FullyRemoved)
        } else {
            (GrowthStatus::FullyRemoved, GrowthStatus::FullyGrown)
        };

        if visible_outside && !invert {
            track.set(range.start, PlaneValue::FULLY_GROWN, Interpolation::Step);
        }
        track.set(
            range.start + eps,
            PlaneValue::Deferred { normal, status: from },
            Interpolation::Linear,
        );
        track.set(
            range.end - eps,
            PlaneValue::Deferred { normal, status: to },
            Interpolation::Step,
        );
        if visible_outside && invert {
            track.set(range.end, PlaneValue::FULLY_GROWN, Interpolation::Step);
        }
    }

    // ========================================================================
    // Transform
    // ========================================================================

    pub fn add_transform(&self, timeline: &mut ElementTimeline, assignment: &TransformAssignment, range: &TimeRange) {
        match assignment {
            TransformAssignment::Static(pose) => self.add_static_pose(timeline, pose, range),
            TransformAssignment::Path(path) => self.add_path(timeline, path, range),
        }
    }

    fn add_static_pose(&self, timeline: &mut ElementTimeline, pose: &StaticPose, range: &TimeRange) {
        let track = &mut timeline.transform;
        track.set(
            range.start,
            TransformValue::new(pose.position, pose.rotation, AnchorPoint::Static),
            Interpolation::Step,
        );
        track.set(range.end, TransformValue::DISABLED, Interpolation::Step);
    }

    fn add_path(&self, timeline: &mut ElementTimeline, path: &PathAssignment, range: &TimeRange) {
        let Some(first) = path.keyframes.first() else {
            return;
        };
        let relative_to = if path.anchor == AnchorPoint::Original {
            let identical = path.keyframes.iter().all(|k| {
                k.position.abs_diff_eq(first.position, PATH_POSITION_TOLERANCE)
                    && k.rotation.abs_diff_eq(first.rotation, PATH_POSITION_TOLERANCE)
            });
            if identical {
                log::debug!("3D path with identical keyframes ignored");
                return;
            }
            first.position
        } else {
            Vec3::ZERO
        };

        let duration = range.duration();
        let track = &mut timeline.transform;
        for key in &path.keyframes {
            let relative_time = if path.reverse {
                1.0 - key.relative_time
            } else {
                key.relative_time
            };
            track.set(
                range.start + relative_time * duration,
                TransformValue::new(key.position - relative_to, key.rotation, path.anchor),
                Interpolation::Linear,
            );
        }
    }

    // ========================================================================
    // Requirements
    // ========================================================================

    /// What the tiles rendering the timeline's elements must provide.
    #[must_use]
    pub fn requirements_of(&self, timeline: &ElementTimeline) -> Requirements {
        let mut needs = Requirements::empty();
        if !timeline.color.is_empty() || !timeline.visibility.is_empty() {
            needs |= Requirements::HIGHLIGHT_OPACITY;
        }
        if !timeline.cutting_plane.is_empty() {
            needs |= Requirements::CUTTING_PLANE;
        }
        if self.needs_partial_visibility(timeline) {
            needs |= Requirements::TRANSLUCENT;
        }
        if timeline.transform.keyframes().iter().any(|k| k.value.enabled) {
            needs |= Requirements::TRANSFORMABLE;
        }
        needs
    }

    fn needs_partial_visibility(&self, timeline: &ElementTimeline) -> bool {
        let hidden = self.settings.hidden_below_alpha;
        let opaque = self.settings.opaque_above_alpha;
        let keys = timeline.visibility.keyframes();
        keys.iter().enumerate().any(|(i, k)| {
            (k.value > hidden && k.value < opaque)
                || (k.interpolation == Interpolation::Linear
                    && keys.get(i + 1).is_some_and(|next| next.value != k.value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AnimationKey;

    #[test]
    fn degenerate_custom_growth_emits_nothing() {
        let settings = AnimatorSettings::default();
        let builder = TimelineBuilder::new(&settings);
        let mut timeline = ElementTimeline::new(AnimationKey(0));
        let mut profile = AppearanceProfile::original(ProfileAction::Install);
        profile.active.growth = GrowthMode::Custom(Vec3::ZERO);
        let range = TimeRange { start: 0.0, end: 10.0 };
        builder.add_cutting_plane(&mut timeline, &profile, &range);
        assert!(timeline.cutting_plane.is_empty());
    }

    #[test]
    fn linear_fade_needs_translucency() {
        let settings = AnimatorSettings::default();
        let builder = TimelineBuilder::new(&settings);
        let mut timeline = ElementTimeline::new(AnimationKey(0));
        timeline.visibility.set(0.0, 0.0, Interpolation::Linear);
        timeline.visibility.set(1.0, 1.0, Interpolation::Step);
        assert!(builder.requirements_of(&timeline).contains(Requirements::TRANSLUCENT));

        let mut steps = ElementTimeline::new(AnimationKey(1));
        steps.visibility.set(0.0, 0.0, Interpolation::Step);
        steps.visibility.set(1.0, 1.0, Interpolation::Step);
        let needs = builder.requirements_of(&steps);
        assert!(!needs.contains(Requirements::TRANSLUCENT));
        assert!(needs.contains(Requirements::HIGHLIGHT_OPACITY));
    }
}
