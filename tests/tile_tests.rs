//! Tile & Extraction Tests
//!
//! Tests for:
//! - Tile build from streamed content, feature range validation
//! - Property buffer staging and commit
//! - Buffer creation driven by requirements
//! - Material setup gated on buffer readiness
//! - Element extraction (idempotence, translucent-only batches)
//! - TileStore element/tile bookkeeping across unload

use glam::Vec3;

use timeline4d::extraction::{self, ExtractionOutcome};
use timeline4d::tile::buffer::{ALPHA, HIGHLIGHT_DISABLED, PLANE_DISABLED};
use timeline4d::tile::{BlendMode, Bgra8Buffer, BufferChannel, SceneTile, TileStore};
use timeline4d::{
    BoundingBox, ElementId, FeatureId, MaterialParameters, Requirements, TileContent, TileId,
    TimelineError,
};

const WALL: ElementId = ElementId(0x10);
const DOOR: ElementId = ElementId(0x11);
const GLASS: ElementId = ElementId(0x12);

/// Tile 7: the wall spans two fragments, the door one opaque fragment and the
/// glass one translucent fragment.
fn content() -> TileContent {
    TileContent::new(TileId(7), FeatureId(5))
        .with_feature(0, WALL)
        .with_feature(1, WALL)
        .with_feature(2, DOOR)
        .with_feature(3, GLASS)
        .with_mesh(&[0, 2], BlendMode::Opaque)
        .with_mesh(&[1], BlendMode::Opaque)
        .with_mesh(&[3], BlendMode::Translucent)
        .with_bounds(WALL, BoundingBox::new(Vec3::ZERO, Vec3::ONE))
}

fn built_store() -> (TileStore, timeline4d::tile::TileKey) {
    let mut store = TileStore::new();
    let key = store.build_tile(&content()).unwrap();
    (store, key)
}

// ============================================================================
// Build
// ============================================================================

#[test]
fn build_maps_features_and_fragments() {
    let (store, key) = built_store();
    let tile = store.get(key).unwrap();

    assert!(tile.is_loaded());
    assert_eq!(tile.element_count(), 3);
    assert_eq!(tile.meshes().len(), 3);
    let wall = tile.find(WALL).unwrap();
    assert_eq!(wall.features.as_slice(), &[FeatureId(0), FeatureId(1)]);
    assert_eq!(wall.fragments.as_slice(), &[0, 1]);
    assert_eq!(wall.materials.len(), 2);
    assert!(tile.highlights().is_none(), "Buffers are created on demand");
}

#[test]
fn build_rejects_feature_out_of_range() {
    let mut store = TileStore::new();
    let bad = TileContent::new(TileId(1), FeatureId(1)).with_feature(4, WALL);
    assert!(matches!(
        store.build_tile(&bad),
        Err(TimelineError::FeatureOutOfRange { feature: 4, max: 1, .. })
    ));
    assert!(store.tiles_of(WALL).is_empty());
}

#[test]
fn store_tracks_tiles_of_elements_across_unload() {
    let (mut store, key) = built_store();
    assert_eq!(store.tiles_of(DOOR), &[key]);

    assert_eq!(store.unload(TileId(7)), Some(key));
    assert!(store.tiles_of(DOOR).is_empty());
    assert!(!store.by_id(TileId(7)).unwrap().is_loaded());

    let rebuilt = store.build_tile(&content()).unwrap();
    assert_eq!(rebuilt, key, "A rebuilt tile keeps its key");
    assert_eq!(store.tiles_of(DOOR), &[key]);
}

#[test]
fn visibility_of_unknown_tile_is_an_error() {
    let (mut store, _) = built_store();
    store.set_visible(TileId(7), true).unwrap();
    assert!(store.by_id(TileId(7)).unwrap().is_visible());
    assert!(matches!(
        store.set_visible(TileId(99), true),
        Err(TimelineError::UnknownTile(TileId(99)))
    ));
}

// ============================================================================
// Property buffers
// ============================================================================

#[test]
fn buffer_writes_are_staged_until_commit() {
    let mut buf = Bgra8Buffer::new(FeatureId(3), HIGHLIGHT_DISABLED);
    let before = buf.version();
    buf.set_pixel(FeatureId(2), [1, 2, 3, 4]);

    assert_eq!(buf.pixel(FeatureId(2)), Some([1, 2, 3, 4]));
    assert_eq!(buf.published_pixel(FeatureId(2)), Some(HIGHLIGHT_DISABLED));

    assert!(buf.commit());
    assert_eq!(buf.published_pixel(FeatureId(2)), Some([1, 2, 3, 4]));
    assert_ne!(buf.version(), before);
    assert!(!buf.commit(), "Nothing left to publish");
}

#[test]
fn masked_write_keeps_other_channels() {
    let mut buf = Bgra8Buffer::new(FeatureId(1), [10, 20, 30, 40]);
    buf.set_pixels_masked(&[FeatureId(0)], [0, 0, 0, 99], [false, false, false, true]);
    assert_eq!(buf.pixel(FeatureId(0)), Some([10, 20, 30, 99]));
    assert_eq!(buf.pixel(FeatureId(1)), Some([10, 20, 30, 40]));
}

#[test]
fn out_of_range_write_is_ignored() {
    let mut buf = Bgra8Buffer::new(FeatureId(1), HIGHLIGHT_DISABLED);
    buf.set_pixel(FeatureId(8), [0; 4]);
    assert_eq!(buf.len(), 2);
    assert!(buf.covers(FeatureId(1)));
    assert!(!buf.covers(FeatureId(2)));
}

// ============================================================================
// Buffers & materials
// ============================================================================

#[test]
fn requirements_drive_buffer_creation() {
    let (mut store, key) = built_store();
    let tile = store.get_mut(key).unwrap();

    assert!(!tile.ensure_buffers(Requirements::empty()));
    assert!(tile.ensure_buffers(Requirements::HIGHLIGHT_OPACITY));
    assert!(tile.highlights().is_some());
    assert!(tile.cutting_planes().is_none());

    assert!(tile.ensure_buffers(Requirements::HIGHLIGHT_OPACITY | Requirements::CUTTING_PLANE));
    let planes = tile.cutting_planes().unwrap();
    assert_eq!(planes.len(), 6);
    assert_eq!(planes.pixel(FeatureId(5)), Some(PLANE_DISABLED));
    assert!(!tile.ensure_buffers(Requirements::CUTTING_PLANE), "Nothing new to create");
}

#[test]
fn materials_bind_buffers_once_ready() {
    let params = MaterialParameters::default();
    let (mut store, key) = built_store();
    let tile = store.get_mut(key).unwrap();
    tile.ensure_buffers(Requirements::HIGHLIGHT_OPACITY);

    assert_eq!(tile.setup_materials(&params), 0, "Buffer not ready yet");

    tile.mark_buffers_ready();
    assert_eq!(tile.setup_materials(&params), 4);
    assert_eq!(tile.setup_materials(&params), 0, "Already set up");

    let wall = tile.find(WALL).unwrap();
    let material = tile.material(wall.materials[0]).unwrap();
    assert_eq!(material.buffer(&params.highlight_buffer), Some(BufferChannel::Highlight));
    assert_eq!(material.scalar(&params.feature_id_index), Some(0.0));
}

// ============================================================================
// Extraction
// ============================================================================

fn tile_mut(store: &mut TileStore, key: timeline4d::tile::TileKey) -> &mut SceneTile {
    store.get_mut(key).unwrap()
}

#[test]
fn extraction_creates_one_entity_per_fragment() {
    let params = MaterialParameters::default();
    let (mut store, key) = built_store();
    let tile = tile_mut(&mut store, key);

    let outcome = extraction::extract_element(tile, WALL, true, &params);
    assert_eq!(outcome, ExtractionOutcome::Extracted(2));

    let extracted = tile.extracted(WALL).unwrap();
    assert_eq!(extracted.entities.len(), 2);
    for entity in &extracted.entities {
        let material = tile.material(entity.material).unwrap();
        assert!(material.is_translucent());
        assert_eq!(material.scalar(&params.forced_alpha), Some(1.0));
    }
    let rank = tile.rank_of(WALL).unwrap();
    assert!(tile.element(rank).unwrap().is_extracted());

    // The batched copy is masked out.
    let highlights = tile.highlights().unwrap();
    assert_eq!(highlights.pixel(FeatureId(0)).unwrap()[ALPHA], 0);
    assert_eq!(highlights.pixel(FeatureId(2)).unwrap()[ALPHA], 255);
}

#[test]
fn extraction_only_keeps_own_features() {
    let params = MaterialParameters::default();
    let (mut store, key) = built_store();
    let tile = tile_mut(&mut store, key);

    extraction::extract_element(tile, DOOR, false, &params);
    let door = tile.extracted(DOOR).unwrap();
    assert_eq!(door.entities.len(), 1);
    assert_eq!(door.entities[0].features, vec![FeatureId(2)]);
    assert_eq!(door.entities[0].source_fragment, 0);
}

#[test]
fn extraction_is_idempotent() {
    let params = MaterialParameters::default();
    let (mut store, key) = built_store();
    let tile = tile_mut(&mut store, key);

    extraction::extract_element(tile, DOOR, false, &params);
    let materials = tile.find(DOOR).unwrap().materials.len();
    let again = extraction::extract_element(tile, DOOR, true, &params);

    assert_eq!(again, ExtractionOutcome::AlreadyExtracted);
    assert_eq!(tile.extracted_elements().count(), 1);
    assert_eq!(tile.find(DOOR).unwrap().materials.len(), materials);
}

#[test]
fn translucent_only_element_is_never_extracted_for_opacity() {
    let params = MaterialParameters::default();
    let (mut store, key) = built_store();
    let tile = tile_mut(&mut store, key);

    let outcome = extraction::check_and_extract_in_tile(tile, GLASS, Requirements::TRANSLUCENT, &params);
    assert_eq!(outcome, ExtractionOutcome::NotNeeded);
    assert!(tile.extracted(GLASS).is_none());

    let moved = extraction::check_and_extract_in_tile(tile, GLASS, Requirements::TRANSFORMABLE, &params);
    assert_eq!(moved, ExtractionOutcome::Extracted(1));
}

#[test]
fn dead_fragments_are_not_extracted() {
    let params = MaterialParameters::default();
    let (mut store, key) = built_store();
    let tile = tile_mut(&mut store, key);
    tile.mark_mesh_dead(1);

    assert_eq!(
        extraction::extract_element(tile, WALL, false, &params),
        ExtractionOutcome::Extracted(1)
    );
    assert_eq!(
        extraction::extract_element(tile, ElementId(0xdead), false, &params),
        ExtractionOutcome::NotInTile
    );
}

#[test]
fn check_and_extract_visits_every_tile() {
    let params = MaterialParameters::default();
    let mut store = TileStore::new();
    store.build_tile(&content()).unwrap();
    let other = TileContent::new(TileId(8), FeatureId(0))
        .with_feature(0, DOOR)
        .with_mesh(&[0], BlendMode::Opaque);
    store.build_tile(&other).unwrap();

    let created = extraction::check_and_extract(&mut store, &[DOOR], Requirements::TRANSFORMABLE, &params);
    assert_eq!(created, 2);
    assert_eq!(
        extraction::check_and_extract(&mut store, &[DOOR], Requirements::HIGHLIGHT_OPACITY, &params),
        0
    );
}

#[test]
fn reset_hides_extracted_entities() {
    let params = MaterialParameters::default();
    let (mut store, key) = built_store();
    let tile = tile_mut(&mut store, key);
    extraction::extract_element(tile, DOOR, false, &params);

    tile.reset_animation();
    tile.commit();
    let door = tile.extracted(DOOR).unwrap();
    assert!(door.entities.iter().all(|e| e.hidden && e.forced_alpha == 1.0));
}
