use bitflags::bitflags;
use smallvec::SmallVec;

use crate::bounds::BoundingBox;
use crate::ids::{AnimationKey, ElementId, ElementIndex};

bitflags! {
    /// Capabilities an element's animation needs from the tiles rendering it.
    ///
    /// Flags are only ever added: they accumulate over every timeline bound to
    /// the element and survive tile unload, so that a reloaded tile gets the
    /// same setup again.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Requirements: u8 {
        /// Color and opacity through the highlight buffer.
        const HIGHLIGHT_OPACITY = 1 << 0;
        /// Growth simulation through the cutting-plane buffer.
        const CUTTING_PLANE     = 1 << 1;
        /// Partial opacity, needing a translucent material.
        const TRANSLUCENT       = 1 << 2;
        /// Rigid transform, needing geometry independent from its batch.
        const TRANSFORMABLE     = 1 << 3;
    }
}

impl Requirements {
    /// Requirements only satisfiable by extracting the element from its batch.
    pub const EXTRACTION: Self = Self::TRANSLUCENT.union(Self::TRANSFORMABLE);
}

/// A logical scene entity, possibly spread over many tiles.
///
/// Elements without geometry yet still exist as hierarchy nodes.
#[derive(Debug, Clone)]
pub struct SceneElement {
    pub id: ElementId,
    /// Whether some tile has reported geometry for this element.
    pub has_mesh: bool,
    pub(crate) parent: Option<ElementIndex>,
    pub(crate) sub_elements: SmallVec<[ElementIndex; 4]>,
    /// Index of the duplicate group this element belongs to, if any.
    pub(crate) duplicates: Option<usize>,
    pub(crate) animation_keys: SmallVec<[AnimationKey; 2]>,
    /// Union of the element's world-space boxes over every tile seen so far.
    pub bbox: BoundingBox,
    pub requirements: Requirements,
}

impl SceneElement {
    #[must_use]
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            has_mesh: false,
            parent: None,
            sub_elements: SmallVec::new(),
            duplicates: None,
            animation_keys: SmallVec::new(),
            bbox: BoundingBox::EMPTY,
            requirements: Requirements::empty(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ElementIndex> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn sub_elements(&self) -> &[ElementIndex] {
        &self.sub_elements
    }

    #[inline]
    #[must_use]
    pub fn animation_keys(&self) -> &[AnimationKey] {
        &self.animation_keys
    }

    #[inline]
    #[must_use]
    pub fn duplicate_group(&self) -> Option<usize> {
        self.duplicates
    }

    /// ORs `flags` in. Returns the flags that were not set before.
    pub fn require(&mut self, flags: Requirements) -> Requirements {
        let added = flags - self.requirements;
        self.requirements |= flags;
        added
    }
}
