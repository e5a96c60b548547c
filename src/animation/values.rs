use glam::{Quat, Vec3};

/// Values that a [`KeyframeTrack`](super::KeyframeTrack) can blend between two
/// keyframes of a `Linear` segment.
pub trait Interpolatable: Copy + Clone + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}

/// `None` is the "use the original value" sentinel: blending into or out of it
/// is a step, since there is no value to blend with.
impl<T: Interpolatable> Interpolatable for Option<T> {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        match (start, end) {
            (Some(a), Some(b)) => Some(T::interpolate_linear(a, b, t)),
            _ => start,
        }
    }
}

/// Color keyframe value: linear RGB in [0, 1], or `None` to keep the source color.
pub type ColorValue = Option<Vec3>;

/// Visibility keyframe value: opacity in [0, 1].
pub type VisibilityValue = f32;
