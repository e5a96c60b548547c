use crate::animation::plane::PlaneValue;
use crate::animation::tracks::{EntryTimeBehavior, KeyframeCursor, KeyframeTrack};
use crate::animation::transform::TransformValue;
use crate::animation::values::{ColorValue, VisibilityValue};
use crate::bounds::BoundingBox;
use crate::ids::{AnimationKey, ElementIndex};

/// Evaluated value of each track of a timeline. A `None` field means the track
/// is empty and has no effect at all.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimelineState {
    pub color: Option<ColorValue>,
    pub visibility: Option<VisibilityValue>,
    pub cutting_plane: Option<PlaneValue>,
    pub transform: Option<TransformValue>,
}

#[derive(Debug, Clone, Copy, Default)]
struct TrackCursors {
    color: KeyframeCursor,
    visibility: KeyframeCursor,
    cutting_plane: KeyframeCursor,
    transform: KeyframeCursor,
}

/// The four keyframe tracks animating one group of elements.
///
/// All tasks bound to the same group of elements append to the same timeline.
/// The mesh-bearing elements reached from the group (see
/// [`ElementRegistry::propagate_animation_key`](crate::registry::ElementRegistry::propagate_animation_key))
/// are kept sorted so that per-tick application order is stable.
#[derive(Debug, Clone)]
pub struct ElementTimeline {
    key: AnimationKey,
    pub color: KeyframeTrack<ColorValue>,
    pub visibility: KeyframeTrack<VisibilityValue>,
    pub cutting_plane: KeyframeTrack<PlaneValue>,
    pub transform: KeyframeTrack<TransformValue>,
    elements: Vec<ElementIndex>,
    modified: bool,
    group_box: Option<BoundingBox>,
    cursors: TrackCursors,
}

impl ElementTimeline {
    #[must_use]
    pub fn new(key: AnimationKey) -> Self {
        Self {
            key,
            color: KeyframeTrack::new(),
            visibility: KeyframeTrack::new(),
            cutting_plane: KeyframeTrack::new(),
            transform: KeyframeTrack::new(),
            elements: Vec::new(),
            modified: true,
            group_box: None,
            cursors: TrackCursors::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> AnimationKey {
        self.key
    }

    /// Mesh-bearing elements animated by this timeline, in index order.
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[ElementIndex] {
        &self.elements
    }

    #[must_use]
    pub fn contains(&self, element: ElementIndex) -> bool {
        self.elements.binary_search(&element).is_ok()
    }

    /// Returns `true` if the element was not animated yet.
    pub fn add_element(&mut self, element: ElementIndex) -> bool {
        match self.elements.binary_search(&element) {
            Ok(_) => false,
            Err(i) => {
                self.elements.insert(i, element);
                self.modified = true;
                true
            }
        }
    }

    pub fn remove_element(&mut self, element: ElementIndex) -> bool {
        match self.elements.binary_search(&element) {
            Ok(i) => {
                self.elements.remove(i);
                self.modified = true;
                true
            }
            Err(_) => false,
        }
    }

    #[inline]
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns the modified flag and clears it.
    pub fn take_modified(&mut self) -> bool {
        std::mem::take(&mut self.modified)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.color.is_empty()
            && self.visibility.is_empty()
            && self.cutting_plane.is_empty()
            && self.transform.is_empty()
    }

    /// Union of the time ranges of the four tracks.
    #[must_use]
    pub fn time_range(&self) -> Option<(f64, f64)> {
        [
            self.color.time_range(),
            self.visibility.time_range(),
            self.cutting_plane.time_range(),
            self.transform.time_range(),
        ]
        .into_iter()
        .flatten()
        .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
    }

    /// Whether some keyframe still waits for the group's bounding box.
    #[must_use]
    pub fn has_deferred(&self) -> bool {
        self.group_box.is_none()
            && (self
                .cutting_plane
                .keyframes()
                .iter()
                .any(|k| k.value.is_deferred())
                || self
                    .transform
                    .keyframes()
                    .iter()
                    .any(|k| k.value.enabled && k.value.anchor.is_deferred()))
    }

    /// Bounding box the deferred keyframes were resolved against, once known.
    #[inline]
    #[must_use]
    pub fn group_box(&self) -> Option<&BoundingBox> {
        self.group_box.as_ref()
    }

    /// Resolves every deferred keyframe against `group_box`. Only the first
    /// call with a valid box has an effect; later calls return `false`.
    pub fn finalize_deferred(&mut self, group_box: BoundingBox) -> bool {
        if self.group_box.is_some() || !group_box.is_valid() {
            return false;
        }
        for key in self.cutting_plane.keyframes_mut() {
            key.value = key.value.finalize(&group_box);
        }
        self.group_box = Some(group_box);
        true
    }

    /// Drops redundant trailing keyframes on every track.
    pub fn prune(&mut self) {
        self.color.prune();
        self.visibility.prune();
        self.cutting_plane.prune();
        self.transform.prune();
    }

    /// Evaluates all four tracks at `time`, using the timeline's own cursors.
    pub fn state_at(&mut self, time: f64, behavior: EntryTimeBehavior) -> TimelineState {
        let c = &mut self.cursors;
        TimelineState {
            color: self.color.evaluate_with_cursor(time, behavior, &mut c.color),
            visibility: self
                .visibility
                .evaluate_with_cursor(time, behavior, &mut c.visibility),
            cutting_plane: self
                .cutting_plane
                .evaluate_with_cursor(time, behavior, &mut c.cutting_plane),
            transform: self
                .transform
                .evaluate_with_cursor(time, behavior, &mut c.transform),
        }
    }
}
