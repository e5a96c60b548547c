use glam::Affine3A;

use crate::bounds::BoundingBox;
use crate::ids::{ElementId, FeatureId, MaterialId, TileId};
use crate::tile::material::BlendMode;

/// Which element a feature index renders, in a given tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMapping {
    pub feature: FeatureId,
    pub element: ElementId,
}

/// One batched mesh fragment of a freshly built tile.
#[derive(Debug, Clone)]
pub struct MeshContent {
    /// Feature indices present in the fragment's vertices.
    pub features: Vec<FeatureId>,
    pub material: Option<MaterialId>,
    pub blend: BlendMode,
    pub transform: Affine3A,
}

/// Everything the streaming side reports when a tile is built.
#[derive(Debug, Clone)]
pub struct TileContent {
    pub tile_id: TileId,
    pub max_feature_id: FeatureId,
    pub features: Vec<FeatureMapping>,
    pub meshes: Vec<MeshContent>,
    /// World-space boxes of the elements present, when known.
    pub element_bounds: Vec<(ElementId, BoundingBox)>,
}

impl TileContent {
    #[must_use]
    pub fn new(tile_id: TileId, max_feature_id: FeatureId) -> Self {
        Self {
            tile_id,
            max_feature_id,
            features: Vec::new(),
            meshes: Vec::new(),
            element_bounds: Vec::new(),
        }
    }

    /// Maps `feature` to `element`.
    #[must_use]
    pub fn with_feature(mut self, feature: u32, element: ElementId) -> Self {
        self.features.push(FeatureMapping {
            feature: FeatureId(feature),
            element,
        });
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, features: &[u32], blend: BlendMode) -> Self {
        self.meshes.push(MeshContent {
            features: features.iter().copied().map(FeatureId).collect(),
            material: None,
            blend,
            transform: Affine3A::IDENTITY,
        });
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, element: ElementId, bbox: BoundingBox) -> Self {
        self.element_bounds.push((element, bbox));
        self
    }
}
