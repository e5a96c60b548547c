use glam::{Affine3A, Vec3};

/// Axis-aligned bounding box in world space.
///
/// The default value is the empty box (`min = +inf`, `max = -inf`), which is
/// the identity for [`union`](Self::union) and reports `is_valid() == false`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half of [`size`](Self::size).
    #[must_use]
    pub fn extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn extend(&mut self, other: &BoundingBox) {
        if other.is_valid() {
            *self = self.union(other);
        }
    }

    /// Grows the box on every side by `amount` (absolute, per axis).
    #[must_use]
    pub fn expand_by(&self, amount: Vec3) -> Self {
        Self {
            min: self.min - amount,
            max: self.max + amount,
        }
    }

    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        if !self.is_valid() {
            return *self;
        }
        let mut out = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = matrix.transform_point3(corner);
            out.min = out.min.min(p);
            out.max = out.max.max(p);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_union_identity() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let mut acc = BoundingBox::EMPTY;
        assert!(!acc.is_valid());
        acc.extend(&b);
        assert_eq!(acc, b);
    }

    #[test]
    fn transform_translates_corners() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let t = b.transform(&Affine3A::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(t.min, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(t.max, Vec3::new(3.0, 1.0, 1.0));
    }
}
