use glam::{Affine3A, Quat, Vec3};

use crate::animation::values::Interpolatable;
use crate::bounds::BoundingBox;

/// Reference point around which a transform keyframe rotates the animated group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorPoint {
    /// Keyframe positions are translations relative to the group's placement.
    Original,
    /// Static pose of a task; positions are relative, no deferred offset.
    Static,
    Center,
    MinX,
    MaxX,
    MinY,
    MaxY,
    MinZ,
    MaxZ,
    /// Explicit offset from the group's box center.
    Custom(Vec3),
}

impl AnchorPoint {
    /// Anchors whose offset depends on the group's bounding box.
    #[inline]
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        !matches!(self, Self::Original | Self::Static | Self::Custom(_))
    }

    #[inline]
    #[must_use]
    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Original | Self::Static)
    }

    /// Offset from the box center to the anchor, negated (the anchor is
    /// `center - offset`), matching how custom offsets are expressed.
    #[must_use]
    pub fn offset(&self, group_box: &BoundingBox) -> Vec3 {
        let e = if group_box.is_valid() {
            group_box.extents()
        } else {
            Vec3::ZERO
        };
        match *self {
            Self::Original | Self::Static | Self::Center => Vec3::ZERO,
            Self::MinX => Vec3::new(e.x, 0.0, 0.0),
            Self::MaxX => Vec3::new(-e.x, 0.0, 0.0),
            Self::MinY => Vec3::new(0.0, e.y, 0.0),
            Self::MaxY => Vec3::new(0.0, -e.y, 0.0),
            Self::MinZ => Vec3::new(0.0, 0.0, e.z),
            Self::MaxZ => Vec3::new(0.0, 0.0, -e.z),
            Self::Custom(offset) => offset,
        }
    }
}

/// Transform keyframe value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformValue {
    /// `false` restores the element's original placement.
    pub enabled: bool,
    pub position: Vec3,
    pub rotation: Quat,
    pub anchor: AnchorPoint,
}

impl TransformValue {
    pub const DISABLED: Self = Self {
        enabled: false,
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        anchor: AnchorPoint::Static,
    };

    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, anchor: AnchorPoint) -> Self {
        Self {
            enabled: true,
            position,
            rotation,
            anchor,
        }
    }

    /// World-space transform to compose after the geometry's original transform.
    #[must_use]
    pub fn to_affine(&self, group_box: &BoundingBox) -> Affine3A {
        if !self.enabled {
            return Affine3A::IDENTITY;
        }
        let center = if group_box.is_valid() {
            group_box.center()
        } else {
            Vec3::ZERO
        };
        let anchor = center - self.anchor.offset(group_box);
        let translation = if self.anchor.is_relative() {
            anchor + self.position
        } else {
            self.position
        };
        Affine3A::from_translation(translation)
            * Affine3A::from_quat(self.rotation)
            * Affine3A::from_translation(-anchor)
    }
}

impl Interpolatable for TransformValue {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        if !(start.enabled && end.enabled) {
            return start;
        }
        Self {
            enabled: true,
            position: start.position.lerp(end.position, t),
            rotation: start.rotation.slerp(end.rotation, t),
            anchor: start.anchor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_translation_moves_by_position() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::splat(2.0));
        let v = TransformValue::new(Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, AnchorPoint::Original);
        let p = v.to_affine(&b).transform_point3(Vec3::ONE);
        assert!((p - Vec3::new(6.0, 1.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_pivots_around_min_x_face() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::splat(2.0));
        // Anchor at (0, 1, 1); rotate 180 degrees around Z, absolute position at origin
        let v = TransformValue::new(
            Vec3::ZERO,
            Quat::from_rotation_z(std::f32::consts::PI),
            AnchorPoint::MinX,
        );
        let p = v.to_affine(&b).transform_point3(Vec3::new(2.0, 1.0, 1.0));
        assert!((p - Vec3::new(-2.0, 0.0, 0.0)).length() < 1e-4);
    }
}
