//! Element Registry Tests
//!
//! Tests for:
//! - Element identifier parsing (hexadecimal and decimal)
//! - Metadata row ingestion, malformed rows skipped and counted
//! - Hierarchy construction and cycle rejection
//! - Animation key propagation to descendants
//! - Duplicate grouping by source identity

use timeline4d::registry::metadata::{parse_parent_row, parse_source_row};
use timeline4d::registry::{ElementRegistry, HierarchyOutcome, RowReport};
use timeline4d::{AnimationKey, ElementId, TimelineError};

const MAX_DEPTH: usize = 1024;

fn id(raw: u64) -> ElementId {
    ElementId(raw)
}

// ============================================================================
// Identifiers & rows
// ============================================================================

#[test]
fn element_id_parses_hex_and_decimal() {
    assert_eq!(ElementId::parse("0x1a").unwrap(), id(26));
    assert_eq!(ElementId::parse("0X1A").unwrap(), id(26));
    assert_eq!(ElementId::parse(" 42 ").unwrap(), id(42));
    assert_eq!("0x20000001a2".parse::<ElementId>().unwrap(), id(0x2000_0001_a2));
    assert!(matches!(
        ElementId::parse("0xZZ"),
        Err(TimelineError::InvalidIdentifier(_))
    ));
}

#[test]
fn element_id_displays_as_hex() {
    assert_eq!(id(255).to_string(), "0xff");
}

#[test]
fn parent_row_needs_two_fields() {
    assert_eq!(parse_parent_row(&["0x1", "0x2"]).unwrap(), (id(1), id(2)));
    assert!(matches!(
        parse_parent_row(&["0x1"]),
        Err(TimelineError::MalformedRow { expected: 2, found: 1 })
    ));
}

#[test]
fn source_row_rejects_blank_identity() {
    assert_eq!(
        parse_source_row(&["0x3", " door-12 "]).unwrap(),
        (id(3), "door-12".to_owned())
    );
    assert!(parse_source_row(&["0x3", "  "]).is_err());
}

#[test]
fn malformed_rows_are_skipped() {
    let mut registry = ElementRegistry::new();
    let rows = vec![
        vec!["0x1"],
        vec!["zz", "0x2"],
        vec!["0x3", "0x4"],
        vec!["0x5", "0x4", "extra"],
    ];
    let (report, outcome) = registry.ingest_parent_rows(&rows, MAX_DEPTH);

    assert_eq!(report, RowReport { accepted: 1, skipped: 3 });
    assert_eq!(outcome, HierarchyOutcome::Linked(1));
    let child = registry.by_id(id(3)).unwrap();
    assert_eq!(child.parent(), registry.index_of(id(4)));
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn hierarchy_links_children_both_ways() {
    let mut registry = ElementRegistry::new();
    let links = [(id(2), id(1)), (id(3), id(1)), (id(4), id(3))];
    assert_eq!(registry.compute_hierarchy(&links, MAX_DEPTH), HierarchyOutcome::Linked(3));

    let root = registry.index_of(id(1)).unwrap();
    assert_eq!(registry.get(root).unwrap().sub_elements().len(), 2);
    assert_eq!(registry.by_id(id(4)).unwrap().parent(), registry.index_of(id(3)));
}

#[test]
fn hierarchy_cycle_leaves_batch_flat() {
    let mut registry = ElementRegistry::new();
    let links = [(id(1), id(2)), (id(2), id(3)), (id(3), id(1))];
    assert_eq!(registry.compute_hierarchy(&links, MAX_DEPTH), HierarchyOutcome::CycleDetected);

    for raw in 1..=3 {
        let element = registry.by_id(id(raw)).unwrap();
        assert_eq!(element.parent(), None, "Element {raw} should have no parent");
        assert!(element.sub_elements().is_empty());
    }
}

#[test]
fn hierarchy_cycle_keeps_earlier_batches() {
    let mut registry = ElementRegistry::new();
    registry.compute_hierarchy(&[(id(2), id(1))], MAX_DEPTH);
    let outcome = registry.compute_hierarchy(&[(id(1), id(2))], MAX_DEPTH);

    assert_eq!(outcome, HierarchyOutcome::CycleDetected);
    assert_eq!(registry.by_id(id(2)).unwrap().parent(), registry.index_of(id(1)));
    assert_eq!(registry.by_id(id(1)).unwrap().parent(), None);
}

#[test]
fn chain_deeper_than_limit_is_rejected() {
    let mut registry = ElementRegistry::new();
    // Deepest links first, so that the first walk covers the whole chain.
    let links: Vec<_> = (1..20).rev().map(|i| (id(i + 1), id(i))).collect();
    assert_eq!(registry.compute_hierarchy(&links, 5), HierarchyOutcome::CycleDetected);
}

#[test]
fn rejected_batch_restores_earlier_parents() {
    let mut registry = ElementRegistry::new();
    assert_eq!(registry.compute_hierarchy(&[(id(1), id(2))], MAX_DEPTH), HierarchyOutcome::Linked(1));

    // Re-parents 1 under 3, then closes 1 -> 3 -> 1.
    let outcome = registry.compute_hierarchy(&[(id(1), id(3)), (id(3), id(1))], MAX_DEPTH);
    assert_eq!(outcome, HierarchyOutcome::CycleDetected);

    let a = registry.index_of(id(1)).unwrap();
    let p = registry.index_of(id(2)).unwrap();
    let q = registry.index_of(id(3)).unwrap();
    let parent = registry.get(a).unwrap().parent();
    assert_eq!(parent, Some(p), "Expected parent {p:?}, got {parent:?}");
    assert_eq!(registry.get(p).unwrap().sub_elements(), &[a]);
    assert!(registry.get(q).unwrap().sub_elements().is_empty());
    assert_eq!(registry.get(q).unwrap().parent(), None);
}

#[test]
fn refused_set_parent_keeps_hierarchy() {
    let mut registry = ElementRegistry::new();
    let a = registry.register(id(1));
    let b = registry.register(id(2));
    registry.set_parent(b, a, MAX_DEPTH).unwrap();

    assert!(registry.set_parent(a, b, MAX_DEPTH).is_err());
    assert_eq!(registry.get(b).unwrap().parent(), Some(a));
    assert_eq!(registry.get(a).unwrap().parent(), None);
    assert_eq!(registry.get(a).unwrap().sub_elements(), &[b]);
    assert!(registry.get(b).unwrap().sub_elements().is_empty());
}

#[test]
fn set_parent_refuses_loops() {
    let mut registry = ElementRegistry::new();
    let a = registry.register(id(1));
    let b = registry.register(id(2));
    registry.set_parent(b, a, MAX_DEPTH).unwrap();
    assert!(matches!(
        registry.set_parent(a, b, MAX_DEPTH),
        Err(TimelineError::HierarchyCycle { .. })
    ));
    assert!(registry.set_parent(a, a, MAX_DEPTH).is_err());
}

#[test]
fn register_is_idempotent() {
    let mut registry = ElementRegistry::new();
    let first = registry.register(id(9));
    let second = registry.register(id(9));
    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
    assert!(matches!(
        registry.require_index(id(10)),
        Err(TimelineError::UnknownElement(e)) if e == id(10)
    ));
}

// ============================================================================
// Propagation
// ============================================================================

#[test]
fn propagation_reaches_mesh_descendants_once() {
    let mut registry = ElementRegistry::new();
    registry.compute_hierarchy(&[(id(2), id(1)), (id(3), id(2))], MAX_DEPTH);
    for raw in [2, 3] {
        let index = registry.index_of(id(raw)).unwrap();
        registry.get_mut(index).unwrap().has_mesh = true;
    }
    let root = registry.index_of(id(1)).unwrap();
    let key = AnimationKey(4);

    let first = registry.propagate_animation_key(root, key);
    let second = registry.propagate_animation_key(root, key);

    assert_eq!(first.len(), 2, "Only mesh-bearing elements are reached");
    assert_eq!(first, second);
    for raw in 1..=3 {
        let keys = registry.by_id(id(raw)).unwrap().animation_keys();
        assert_eq!(keys, &[key], "Element {raw} holds the key exactly once");
    }
    assert_eq!(registry.mesh_descendants(root), first);
}

// ============================================================================
// Duplicates
// ============================================================================

#[test]
fn duplicates_group_by_source_identity() {
    let mut registry = ElementRegistry::new();
    let rows = vec![
        vec!["0x1", "pump-A"],
        vec!["0x2", "pump-A"],
        vec!["0x3", "valve-B"],
        vec!["0x4", "pump-A"],
        vec!["0x5"],
    ];
    let report = registry.ingest_source_rows(&rows);
    assert_eq!(report, RowReport { accepted: 4, skipped: 1 });
    assert_eq!(registry.duplicate_group_count(), 1);

    let pump = registry.index_of(id(2)).unwrap();
    assert_eq!(registry.duplicates_of(pump).len(), 3);
    let valve = registry.index_of(id(3)).unwrap();
    assert!(registry.duplicates_of(valve).is_empty());
}
