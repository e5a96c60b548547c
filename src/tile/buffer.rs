//! Feature-indexed property buffers.
//!
//! A property buffer is a dense array with one texel per feature index of a
//! tile. The rendering side samples it with the feature ID of each vertex,
//! which lets one draw call animate thousands of elements.
//!
//! Writes go to a staging copy. [`PropertyBuffer::commit`] publishes the whole
//! staging copy at once, so the rendering side never sees a half-written tick.

use bytemuck::Pod;

use crate::ids::FeatureId;
use crate::utils::ChangeTracker;

/// Channel index of alpha in BGRA texels.
pub const ALPHA: usize = 3;

/// Highlight texel meaning "no color override, fully visible".
pub const HIGHLIGHT_DISABLED: [u8; 4] = [0, 0, 0, 255];
/// Selection texel meaning "not selected, not hidden".
pub const SELECTION_DEFAULT: [u8; 4] = [0, 0, 0, 255];
/// Selection texel of a hidden element.
pub const SELECTION_HIDDEN: [u8; 4] = [0, 0, 0, 0];
/// Cutting-plane texel meaning "no clipping".
pub const PLANE_DISABLED: [f32; 4] = [0.0; 4];

#[derive(Debug, Clone)]
pub struct PropertyBuffer<T: Pod + PartialEq, const N: usize> {
    staged: Vec<[T; N]>,
    published: Vec<[T; N]>,
    dirty: bool,
    tracker: ChangeTracker,
    /// Set by the rendering side once its resource for this buffer exists.
    ready: bool,
}

/// 8-bit B, G, R, A texels (highlight and selection buffers).
pub type Bgra8Buffer = PropertyBuffer<u8, 4>;
/// 32-bit float plane equations `[nx, ny, nz, w]`.
pub type PlaneBuffer = PropertyBuffer<f32, 4>;

impl<T: Pod + PartialEq, const N: usize> PropertyBuffer<T, N> {
    /// Buffer addressing features `0..=max_feature`, every texel set to `fill`.
    #[must_use]
    pub fn new(max_feature: FeatureId, fill: [T; N]) -> Self {
        let len = max_feature.index() + 1;
        Self {
            staged: vec![fill; len],
            published: vec![fill; len],
            dirty: true,
            tracker: ChangeTracker::new(),
            ready: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Whether every feature up to `max_feature` has a texel.
    #[inline]
    #[must_use]
    pub fn covers(&self, max_feature: FeatureId) -> bool {
        max_feature.index() < self.staged.len()
    }

    /// Staged (not necessarily published) texel.
    #[inline]
    #[must_use]
    pub fn pixel(&self, feature: FeatureId) -> Option<[T; N]> {
        self.staged.get(feature.index()).copied()
    }

    #[inline]
    #[must_use]
    pub fn published_pixel(&self, feature: FeatureId) -> Option<[T; N]> {
        self.published.get(feature.index()).copied()
    }

    pub fn set_pixel(&mut self, feature: FeatureId, value: [T; N]) {
        match self.staged.get_mut(feature.index()) {
            Some(texel) => {
                if *texel != value {
                    *texel = value;
                    self.dirty = true;
                }
            }
            None => log::warn!(
                "Feature {} out of range for a property buffer of {} texels",
                feature.0,
                self.staged.len()
            ),
        }
    }

    pub fn set_pixels(&mut self, features: &[FeatureId], value: [T; N]) {
        for &f in features {
            self.set_pixel(f, value);
        }
    }

    /// Writes only the channels whose `mask` entry is set.
    pub fn set_pixels_masked(&mut self, features: &[FeatureId], value: [T; N], mask: [bool; N]) {
        for &f in features {
            let Some(mut texel) = self.pixel(f) else {
                self.set_pixel(f, value);
                continue;
            };
            for c in 0..N {
                if mask[c] {
                    texel[c] = value[c];
                }
            }
            self.set_pixel(f, texel);
        }
    }

    pub fn set_pixels_channel(&mut self, features: &[FeatureId], channel: usize, value: T) {
        for &f in features {
            if let Some(mut texel) = self.pixel(f) {
                texel[channel] = value;
                self.set_pixel(f, texel);
            }
        }
    }

    pub fn fill_with(&mut self, value: [T; N]) {
        if self.staged.iter().any(|t| *t != value) {
            self.staged.fill(value);
            self.dirty = true;
        }
    }

    pub fn fill_channel(&mut self, channel: usize, value: T) {
        for texel in &mut self.staged {
            if texel[channel] != value {
                texel[channel] = value;
                self.dirty = true;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Publishes staged texels. Returns `false` when nothing changed since the
    /// last commit.
    pub fn commit(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.published.clone_from(&self.staged);
        self.dirty = false;
        self.tracker.changed();
        true
    }

    #[inline]
    #[must_use]
    pub fn published(&self) -> &[[T; N]] {
        &self.published
    }

    /// Published texels as raw bytes, ready for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.published)
    }

    /// Incremented by every effective [`commit`](Self::commit).
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Whether the buffer can be attached to materials yet.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_invisible_until_commit() {
        let mut buf = Bgra8Buffer::new(FeatureId(3), HIGHLIGHT_DISABLED);
        assert!(buf.commit());
        let v0 = buf.version();

        buf.set_pixel(FeatureId(2), [1, 2, 3, 4]);
        assert_eq!(buf.published_pixel(FeatureId(2)), Some(HIGHLIGHT_DISABLED));
        assert!(buf.commit());
        assert_eq!(buf.published_pixel(FeatureId(2)), Some([1, 2, 3, 4]));
        assert_eq!(buf.version(), v0 + 1);
        assert!(!buf.commit());
    }

    #[test]
    fn out_of_range_write_is_ignored() {
        let mut buf = PlaneBuffer::new(FeatureId(1), PLANE_DISABLED);
        buf.commit();
        buf.set_pixel(FeatureId(9), [1.0; 4]);
        assert!(!buf.is_dirty());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn bytes_follow_texel_layout() {
        let mut buf = Bgra8Buffer::new(FeatureId(1), [0, 0, 0, 0]);
        buf.set_pixel(FeatureId(1), [9, 8, 7, 6]);
        buf.commit();
        assert_eq!(buf.as_bytes(), &[0, 0, 0, 0, 9, 8, 7, 6]);
    }

    #[test]
    fn masked_write_keeps_other_channels() {
        let mut buf = Bgra8Buffer::new(FeatureId(0), [10, 20, 30, 40]);
        buf.set_pixels_masked(&[FeatureId(0)], [1, 2, 3, 4], [true, false, true, false]);
        assert_eq!(buf.pixel(FeatureId(0)), Some([1, 20, 3, 40]));
    }
}
