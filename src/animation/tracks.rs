use serde::{Deserialize, Serialize};

use crate::animation::values::Interpolatable;

/// How the segment starting at a keyframe is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold this keyframe's value until the next keyframe.
    Step,
    /// Blend towards the next keyframe's value.
    Linear,
    /// Use the next keyframe's value for the whole segment. Ends a transient
    /// override by deferring to whatever comes after it.
    Next,
}

/// Which segment a query falling exactly on a keyframe time belongs to.
///
/// A query at or after the last keyframe always returns the last keyframe,
/// whichever behavior is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntryTimeBehavior {
    /// The segment ending at that keyframe: the keyframe takes effect just after its time.
    UseLeftInterval,
    /// The segment starting at that keyframe: the keyframe applies from its own instant.
    #[default]
    UseRightInterval,
}

const MAX_SCAN_OFFSET: usize = 3;

/// Remembers where the previous lookup landed, so that monotonic playback
/// resolves the bracketing pair in O(1).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyframeCursor {
    /// Index of the first keyframe after the previous query time.
    pub last_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f64,
    pub value: T,
    pub interpolation: Interpolation,
}

/// A time-ordered sequence of keyframes for one animated property.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    keyframes: Vec<Keyframe<T>>,
}

impl<T: Interpolatable> Default for KeyframeTrack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keyframes: Vec::new(),
        }
    }

    /// Builds a track from unordered keyframes. Later duplicates of the same
    /// time replace earlier ones, as with [`set`](Self::set).
    #[must_use]
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe<T>>) -> Self {
        let mut track = Self::new();
        for k in keyframes {
            track.set(k.time, k.value, k.interpolation);
        }
        track
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    pub(crate) fn keyframes_mut(&mut self) -> &mut [Keyframe<T>] {
        &mut self.keyframes
    }

    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    /// Inserts a keyframe, keeping the track sorted. A keyframe already
    /// present at exactly `time` is replaced.
    pub fn set(&mut self, time: f64, value: T, interpolation: Interpolation) {
        let key = Keyframe {
            time,
            value,
            interpolation,
        };
        match self
            .keyframes
            .binary_search_by(|k| k.time.total_cmp(&time))
        {
            Ok(i) => self.keyframes[i] = key,
            Err(i) => self.keyframes.insert(i, key),
        }
    }

    /// First and last keyframe times.
    #[must_use]
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((self.keyframes.first()?.time, self.keyframes.last()?.time))
    }

    /// Index of the first keyframe lying after `time`, per `behavior`.
    fn locate(&self, time: f64, behavior: EntryTimeBehavior) -> usize {
        match behavior {
            EntryTimeBehavior::UseLeftInterval => self.keyframes.partition_point(|k| k.time < time),
            EntryTimeBehavior::UseRightInterval => {
                self.keyframes.partition_point(|k| k.time <= time)
            }
        }
    }

    #[inline]
    fn is_after(key_time: f64, time: f64, behavior: EntryTimeBehavior) -> bool {
        match behavior {
            EntryTimeBehavior::UseLeftInterval => key_time >= time,
            EntryTimeBehavior::UseRightInterval => key_time > time,
        }
    }

    /// Value of the track at `time`, or `None` for an empty track.
    ///
    /// Before the first keyframe the first value is held; at or after the last
    /// keyframe the last value is held.
    #[must_use]
    pub fn evaluate(&self, time: f64, behavior: EntryTimeBehavior) -> Option<T> {
        let last = self.keyframes.last()?;
        if time >= last.time {
            return Some(last.value);
        }
        let next = self.locate(time, behavior);
        Some(self.sample_segment(next, time))
    }

    /// Same as [`evaluate`](Self::evaluate), using and updating `cursor` to
    /// skip the binary search when the query time moved by a few keyframes at most.
    pub fn evaluate_with_cursor(
        &self,
        time: f64,
        behavior: EntryTimeBehavior,
        cursor: &mut KeyframeCursor,
    ) -> Option<T> {
        let last = self.keyframes.last()?;
        if time >= last.time {
            cursor.last_index = self.keyframes.len() - 1;
            return Some(last.value);
        }

        let len = self.keyframes.len();
        let start = cursor.last_index.min(len - 1);
        let after = |i: usize| Self::is_after(self.keyframes[i].time, time, behavior);

        let found = if after(start) {
            // Time went backwards (or stayed in the same segment)
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                let Some(n) = start.checked_sub(offset) else {
                    break;
                };
                if n == 0 || !after(n - 1) {
                    res = Some(n);
                    break;
                }
            }
            res
        } else {
            // Regular forward playback
            let mut res = None;
            for offset in 1..=MAX_SCAN_OFFSET {
                let n = start + offset;
                if n >= len {
                    break;
                }
                if after(n) {
                    res = Some(n);
                    break;
                }
            }
            res
        };

        let next = found.unwrap_or_else(|| self.locate(time, behavior));
        cursor.last_index = next;
        Some(self.sample_segment(next, time))
    }

    fn sample_segment(&self, next: usize, time: f64) -> T {
        if next == 0 {
            return self.keyframes[0].value;
        }
        let k0 = &self.keyframes[next - 1];
        let Some(k1) = self.keyframes.get(next) else {
            return k0.value;
        };
        match k0.interpolation {
            Interpolation::Step => k0.value,
            Interpolation::Next => k1.value,
            Interpolation::Linear => {
                let dt = k1.time - k0.time;
                let u = if dt > 1e-9 { (time - k0.time) / dt } else { 0.0 };
                T::interpolate_linear(k0.value, k1.value, u.clamp(0.0, 1.0) as f32)
            }
        }
    }
}

impl<T: Interpolatable + PartialEq> KeyframeTrack<T> {
    /// Drops trailing keyframes that repeat the value before them, keeping the
    /// very last keyframe so that the track's time range is unchanged.
    pub fn prune(&mut self) {
        let Some(last) = self.keyframes.last().copied() else {
            return;
        };
        let mut removed = false;
        while self.keyframes.len() >= 2 {
            let n = self.keyframes.len();
            if self.keyframes[n - 1].value != self.keyframes[n - 2].value {
                break;
            }
            self.keyframes.pop();
            removed = true;
        }
        if removed {
            self.keyframes.push(last);
        }
    }
}
