//! Cutting-plane keyframe values.
//!
//! Growth simulation reveals or hides an element progressively by moving a
//! clipping plane across its bounding box. Since boxes are only known once
//! geometry has streamed in, well after timelines are built, keyframes are
//! first emitted in symbolic form ([`PlaneValue::Deferred`]) and resolved into
//! an actual plane equation once the box of the animated group is known.
//!
//! The plane normal points into the half-space that is cut out: a point `p`
//! stays visible iff `dot(p, normal) <= w`.

use glam::{Quat, Vec3, Vec4};

use crate::animation::values::Interpolatable;
use crate::bounds::BoundingBox;

/// Where a growth-simulated element stands along its reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthStatus {
    /// Nothing is clipped.
    FullyGrown,
    /// Everything is clipped: the element is hidden.
    FullyRemoved,
    /// The plane cuts through the element.
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneValue {
    Resolved {
        normal: Vec3,
        w: f32,
        status: GrowthStatus,
    },
    /// Plane whose `w` will be anchored on the group's bounding box so that the
    /// element ends up in `status` (`FullyGrown` or `FullyRemoved`).
    Deferred { normal: Vec3, status: GrowthStatus },
}

impl PlaneValue {
    /// No clipping at all.
    pub const FULLY_GROWN: Self = Self::Resolved {
        normal: Vec3::ZERO,
        w: 0.0,
        status: GrowthStatus::FullyGrown,
    };

    #[inline]
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }

    #[must_use]
    pub fn status(&self) -> GrowthStatus {
        match *self {
            Self::Resolved { status, .. } | Self::Deferred { status, .. } => status,
        }
    }

    /// Anchors a deferred plane on `bbox` (expanded by 1% of its size so that
    /// the extreme faces are not clipped by rounding). Resolved values are
    /// returned unchanged.
    #[must_use]
    pub fn finalize(&self, bbox: &BoundingBox) -> Self {
        let Self::Deferred { normal, status } = *self else {
            return *self;
        };
        let expanded = bbox.expand_by(bbox.size() * 0.01);
        let towards_normal = |n: f32, lo: f32, hi: f32| if n > 0.0 { hi } else { lo };
        let position = match status {
            GrowthStatus::FullyRemoved => Vec3::new(
                towards_normal(normal.x, expanded.max.x, expanded.min.x),
                towards_normal(normal.y, expanded.max.y, expanded.min.y),
                towards_normal(normal.z, expanded.max.z, expanded.min.z),
            ),
            GrowthStatus::FullyGrown => Vec3::new(
                towards_normal(normal.x, expanded.min.x, expanded.max.x),
                towards_normal(normal.y, expanded.min.y, expanded.max.y),
                towards_normal(normal.z, expanded.min.z, expanded.max.z),
            ),
            GrowthStatus::Partial => {
                log::warn!("Deferred cutting plane with a partial status, anchoring at box center");
                expanded.center()
            }
        };
        Self::Resolved {
            normal,
            w: position.dot(normal),
            status,
        }
    }

    /// `[nx, ny, nz, w]`, as stored in the cutting-plane buffer. Deferred
    /// values have no equation yet and yield the disabled plane.
    #[must_use]
    pub fn equation(&self) -> Vec4 {
        match *self {
            Self::Resolved { normal, w, .. } => normal.extend(w),
            Self::Deferred { .. } => Vec4::ZERO,
        }
    }
}

impl Interpolatable for PlaneValue {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        let (
            Self::Resolved {
                normal: n0,
                w: w0,
                status: s0,
            },
            Self::Resolved {
                normal: n1,
                w: w1,
                status: s1,
            },
        ) = (start, end)
        else {
            return start;
        };
        if s0 == s1 && s0 != GrowthStatus::Partial {
            return start;
        }
        if n0 == Vec3::ZERO || n1 == Vec3::ZERO {
            return start;
        }
        let cos = n0.dot(n1);
        let (normal, w) = if cos >= 1.0 - 1e-6 {
            (n0, w0 + (w1 - w0) * t)
        } else if cos <= -1.0 + 1e-6 {
            // Same plane family seen from the other side
            (n0, w0 + (-w1 - w0) * t)
        } else {
            let arc = Quat::from_rotation_arc(n0, n1);
            (Quat::IDENTITY.slerp(arc, t) * n0, w0 + (w1 - w0) * t)
        };
        Self::Resolved {
            normal,
            w,
            status: GrowthStatus::Partial,
        }
    }
}
