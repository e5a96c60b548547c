//! Extraction Manager
//!
//! Promotes an element's geometry out of its tile's shared batch when the
//! batch-level encoding cannot express what its timeline needs: partial
//! opacity on opaque or masked materials, or a rigid transform.
//!
//! Extraction creates one [`ExtractedEntity`] per live fragment carrying the
//! element's features, each with its own material instance, then masks the
//! element's features out of the batch through the highlight alpha. It is
//! one-way for the lifetime of the tile: only [`SceneTile::unload`] drops the
//! extracted entities.

use crate::config::MaterialParameters;
use crate::ids::ElementId;
use crate::registry::Requirements;
use crate::tile::buffer::ALPHA;
use crate::tile::features::{ExtractedElement, ExtractedEntity};
use crate::tile::material::{BlendMode, MaterialInstance};
use crate::tile::{ElementRank, SceneTile, TileStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Entities were created, one per fragment.
    Extracted(usize),
    AlreadyExtracted,
    /// The tile holds no live fragment of the element. The requirement stays
    /// set on the element; a later reload may succeed.
    NoGeometry,
    /// The batch already expresses what the element needs.
    NotNeeded,
    NotInTile,
}

impl ExtractionOutcome {
    #[inline]
    #[must_use]
    pub fn entity_count(self) -> usize {
        match self {
            Self::Extracted(n) => n,
            _ => 0,
        }
    }
}

/// Whether the element, with `requirements`, has to leave the batch of this
/// tile.
#[must_use]
pub fn needs_extraction(tile: &SceneTile, rank: ElementRank, requirements: Requirements) -> bool {
    requirements.contains(Requirements::TRANSFORMABLE)
        || (requirements.contains(Requirements::TRANSLUCENT) && !tile.all_materials_translucent(rank))
}

/// Extracts `element` from the batch of `tile`.
///
/// Each entity gets a fresh material instance, translucent when `translucent`
/// is set, with its forced alpha at 1. Calling this again for an element
/// already extracted from the tile does nothing.
pub fn extract_element(
    tile: &mut SceneTile,
    element: ElementId,
    translucent: bool,
    params: &MaterialParameters,
) -> ExtractionOutcome {
    let Some(rank) = tile.rank_of(element) else {
        return ExtractionOutcome::NotInTile;
    };
    let Some(rec) = tile.element(rank) else {
        return ExtractionOutcome::NotInTile;
    };
    if rec.is_extracted() {
        return ExtractionOutcome::AlreadyExtracted;
    }

    let blend = if translucent { BlendMode::Translucent } else { BlendMode::Opaque };
    let element_features = rec.features.clone();
    let fragments = rec.fragments.clone();

    let mut entities = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let Some(mesh) = tile.meshes.get(fragment) else {
            continue;
        };
        if !mesh.alive {
            continue;
        }
        let features: Vec<_> = mesh
            .features
            .iter()
            .copied()
            .filter(|f| element_features.binary_search(f).is_ok())
            .collect();
        if features.is_empty() {
            continue;
        }
        let source = tile.materials.get(mesh.material).and_then(|m| m.source);
        let transform = mesh.transform;

        let mut material = MaterialInstance::new(source, blend);
        material.set_scalar(&params.forced_alpha, 1.0);
        material.set_scalar(&params.feature_id_index, 0.0);
        let material = tile.materials.insert(material);
        entities.push(ExtractedEntity::new(fragment, features, material, transform));
    }

    if entities.is_empty() {
        log::debug!("{}: no geometry to extract for element {}", tile.id(), element);
        return ExtractionOutcome::NoGeometry;
    }

    let count = entities.len();
    let extracted_rank = tile.extracted.len();
    tile.extracted.push(ExtractedElement { element, entities });
    if let Some(rec) = tile.element_mut(rank) {
        rec.is_extracted = true;
        rec.extracted_rank = Some(extracted_rank);
    }

    tile.ensure_highlights();
    if let Some(buf) = &mut tile.highlights {
        buf.set_pixels_channel(&element_features, ALPHA, 0);
    }
    tile.setup_materials(params);

    log::debug!(
        "{}: extracted element {} into {} entit{} ({})",
        tile.id(),
        element,
        count,
        if count == 1 { "y" } else { "ies" },
        if translucent { "translucent" } else { "opaque" }
    );
    ExtractionOutcome::Extracted(count)
}

/// Extracts the element from this tile if its requirements call for it.
pub fn check_and_extract_in_tile(
    tile: &mut SceneTile,
    element: ElementId,
    requirements: Requirements,
    params: &MaterialParameters,
) -> ExtractionOutcome {
    let Some(rank) = tile.rank_of(element) else {
        return ExtractionOutcome::NotInTile;
    };
    if tile.element(rank).is_some_and(|r| r.is_extracted()) {
        return ExtractionOutcome::AlreadyExtracted;
    }
    if !needs_extraction(tile, rank, requirements) {
        return ExtractionOutcome::NotNeeded;
    }
    let translucent = requirements.contains(Requirements::TRANSLUCENT);
    extract_element(tile, element, translucent, params)
}

/// Runs [`check_and_extract_in_tile`] for every loaded tile rendering each
/// of `elements`. Returns the number of entities created.
pub fn check_and_extract(
    store: &mut TileStore,
    elements: &[ElementId],
    requirements: Requirements,
    params: &MaterialParameters,
) -> usize {
    if !requirements.intersects(Requirements::EXTRACTION) {
        return 0;
    }
    let mut created = 0;
    for &element in elements {
        let keys: Vec<_> = store.tiles_of(element).to_vec();
        for key in keys {
            if let Some(tile) = store.get_mut(key) {
                created += check_and_extract_in_tile(tile, element, requirements, params).entity_count();
            }
        }
    }
    created
}
