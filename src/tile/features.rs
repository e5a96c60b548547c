use glam::Affine3A;
use smallvec::SmallVec;

use crate::ids::{ElementId, FeatureId};
use crate::tile::material::MaterialKey;

/// Tracks which of an owner's materials already have a buffer bound.
///
/// Material lists only grow while a tile is loaded, so a count of materials
/// already set up is enough to revisit only the ones added since. Creating
/// (or recreating) the buffer invalidates the count so that every material is
/// visited again.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureSetup {
    textures_set: usize,
    need_setup: bool,
}

impl TextureSetup {
    #[inline]
    #[must_use]
    pub fn should_update(&self, has_buffer: bool, material_count: usize) -> bool {
        has_buffer && (self.need_setup || material_count > self.textures_set)
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.need_setup = true;
        self.textures_set = 0;
    }

    #[inline]
    pub fn invalidate_if(&mut self, condition: bool) {
        if condition {
            self.invalidate();
        }
    }

    /// First material index still to set up.
    #[inline]
    #[must_use]
    pub fn pending_from(&self) -> usize {
        if self.need_setup { 0 } else { self.textures_set }
    }

    #[inline]
    pub fn mark_done(&mut self, material_count: usize) {
        self.textures_set = material_count;
        self.need_setup = false;
    }

    #[inline]
    #[must_use]
    pub fn textures_set(&self) -> usize {
        self.textures_set
    }
}

/// Setup state of the three tile buffers for one owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferSetups {
    pub highlight: TextureSetup,
    pub cutting_plane: TextureSetup,
    pub selection: TextureSetup,
}

/// A batched mesh fragment of a tile.
///
/// Fragments are referred to by their index in the tile; `alive` is cleared
/// when the rendering side reports the underlying mesh gone.
#[derive(Debug, Clone)]
pub struct MeshFragment {
    pub features: Vec<FeatureId>,
    pub material: MaterialKey,
    pub transform: Affine3A,
    pub alive: bool,
}

/// What renders one element inside one tile.
#[derive(Debug, Clone)]
pub struct ElementInTile {
    pub element: ElementId,
    /// Sorted, unique feature indices rendering the element in this tile.
    pub features: SmallVec<[FeatureId; 4]>,
    /// Indices of the fragments carrying at least one of `features`.
    pub fragments: SmallVec<[usize; 2]>,
    pub materials: SmallVec<[MaterialKey; 2]>,
    pub(crate) setups: BufferSetups,
    pub(crate) is_extracted: bool,
    pub(crate) extracted_rank: Option<usize>,
}

impl ElementInTile {
    #[must_use]
    pub fn new(element: ElementId) -> Self {
        Self {
            element,
            features: SmallVec::new(),
            fragments: SmallVec::new(),
            materials: SmallVec::new(),
            setups: BufferSetups::default(),
            is_extracted: false,
            extracted_rank: None,
        }
    }

    /// Whether the element's geometry in this tile was extracted from its batch.
    #[inline]
    #[must_use]
    pub fn is_extracted(&self) -> bool {
        self.is_extracted
    }

    #[inline]
    #[must_use]
    pub fn extracted_rank(&self) -> Option<usize> {
        self.extracted_rank
    }
}

/// Independent copy of one fragment's share of an element's geometry.
#[derive(Debug, Clone)]
pub struct ExtractedEntity {
    /// Index of the batched fragment this entity was cut from.
    pub source_fragment: usize,
    pub features: Vec<FeatureId>,
    pub material: MaterialKey,
    pub original_transform: Affine3A,
    pub world_transform: Affine3A,
    pub forced_alpha: f32,
    pub hidden: bool,
    pub(crate) currently_transformed: bool,
    pub(crate) setups: BufferSetups,
}

impl ExtractedEntity {
    #[must_use]
    pub fn new(source_fragment: usize, features: Vec<FeatureId>, material: MaterialKey, transform: Affine3A) -> Self {
        Self {
            source_fragment,
            features,
            material,
            original_transform: transform,
            world_transform: transform,
            forced_alpha: 1.0,
            hidden: false,
            currently_transformed: false,
            setups: BufferSetups::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        self.currently_transformed
    }

    /// Back to the batched look: original placement, opaque.
    pub fn reset(&mut self) {
        self.world_transform = self.original_transform;
        self.currently_transformed = false;
        self.forced_alpha = 1.0;
    }
}

/// All entities extracted for one element in one tile.
#[derive(Debug, Clone)]
pub struct ExtractedElement {
    pub element: ElementId,
    pub entities: Vec<ExtractedEntity>,
}
