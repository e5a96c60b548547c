//! Duplicate Resolver
//!
//! Elements sharing a source identity render the same real-world object. Once
//! any member of such a group is animated, the other members that have no
//! animation of their own are hidden for the whole schedule, so that a static
//! copy never shows next to its animated twin.
//!
//! Hidden duplicates all share one "hider" timeline holding a single
//! visibility keyframe at alpha 0.

use rustc_hash::FxHashSet;

use crate::animation::{ElementTimeline, Interpolation};
use crate::ids::{AnimationKey, ElementIndex};
use crate::registry::ElementRegistry;

/// What a binding changed in the set of hidden duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateChanges {
    pub hidden: Vec<ElementIndex>,
    pub revealed: Vec<ElementIndex>,
}

impl DuplicateChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty() && self.revealed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DuplicateResolver {
    non_animated: FxHashSet<ElementIndex>,
    hider: Option<AnimationKey>,
}

impl DuplicateResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the shared timeline hiding duplicates, once created.
    #[inline]
    #[must_use]
    pub fn hider_key(&self) -> Option<AnimationKey> {
        self.hider
    }

    pub fn set_hider_key(&mut self, key: AnimationKey) {
        self.hider = Some(key);
    }

    /// Whether the element carries an animation key of its own.
    #[must_use]
    pub fn is_animated(&self, registry: &ElementRegistry, index: ElementIndex) -> bool {
        registry
            .get(index)
            .is_some_and(|e| e.animation_keys().iter().any(|k| Some(*k) != self.hider))
    }

    #[must_use]
    pub fn is_hidden(&self, index: ElementIndex) -> bool {
        self.non_animated.contains(&index)
    }

    pub fn non_animated(&self) -> impl Iterator<Item = ElementIndex> + '_ {
        self.non_animated.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.non_animated.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.non_animated.is_empty()
    }

    /// Updates the hidden set after `bound` elements received an animation.
    ///
    /// Bound elements stop being hidden; their duplicates without animation
    /// start being hidden.
    pub fn on_elements_bound(&mut self, registry: &ElementRegistry, bound: &[ElementIndex]) -> DuplicateChanges {
        let mut changes = DuplicateChanges::default();
        for &index in bound {
            if self.non_animated.remove(&index) {
                changes.revealed.push(index);
            }
        }
        for &index in bound {
            for &twin in registry.duplicates_of(index) {
                if twin == index || self.is_animated(registry, twin) {
                    continue;
                }
                if self.non_animated.insert(twin) {
                    changes.hidden.push(twin);
                }
            }
        }
        if !changes.is_empty() {
            log::debug!(
                "Duplicates: {} newly hidden, {} revealed, {} hidden in total",
                changes.hidden.len(),
                changes.revealed.len(),
                self.non_animated.len()
            );
        }
        changes
    }

    /// Brings the hider timeline in line with the hidden set, with its single
    /// keyframe at `schedule_start`.
    pub fn sync_hider(&self, timeline: &mut ElementTimeline, schedule_start: f64) {
        let keyframes = timeline.visibility.keyframes();
        let up_to_date = keyframes.len() == 1 && keyframes[0].time == schedule_start;
        if !up_to_date {
            timeline.visibility.clear();
            timeline.visibility.set(schedule_start, 0.0, Interpolation::Step);
            timeline.mark_modified();
        }
        let stale: Vec<_> = timeline
            .elements()
            .iter()
            .copied()
            .filter(|e| !self.non_animated.contains(e))
            .collect();
        for element in stale {
            timeline.remove_element(element);
        }
        for &element in &self.non_animated {
            timeline.add_element(element);
        }
    }
}
