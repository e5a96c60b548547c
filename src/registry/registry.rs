use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::bounds::BoundingBox;
use crate::errors::{Result, TimelineError};
use crate::ids::{AnimationKey, ElementId, ElementIndex};
use crate::registry::element::SceneElement;
use crate::registry::metadata::{self, RowReport};

/// Result of ingesting a batch of parent links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyOutcome {
    /// Every link of the batch was applied.
    Linked(usize),
    /// A cycle was found: none of the batch's links were kept.
    CycleDetected,
}

/// Canonical table of scene elements.
///
/// Elements live in a dense arena and refer to each other by [`ElementIndex`]:
/// parent links, sub-element lists and duplicate groups are all index-based.
/// Elements are never removed.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    elements: Vec<SceneElement>,
    by_id: FxHashMap<ElementId, ElementIndex>,
    /// Duplicate groups; the first member is the group's representative.
    duplicate_groups: Vec<SmallVec<[ElementIndex; 2]>>,
    /// Source identity -> first element seen with it.
    first_by_source: FxHashMap<String, ElementIndex>,
}

impl ElementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the index of `id`, registering a fresh element on first sight.
    pub fn register(&mut self, id: ElementId) -> ElementIndex {
        if let Some(&index) = self.by_id.get(&id) {
            return index;
        }
        let index = ElementIndex(self.elements.len() as u32);
        self.elements.push(SceneElement::new(id));
        self.by_id.insert(id, index);
        index
    }

    #[inline]
    #[must_use]
    pub fn index_of(&self, id: ElementId) -> Option<ElementIndex> {
        self.by_id.get(&id).copied()
    }

    /// Like [`index_of`](Self::index_of), as an error for the control surface.
    pub fn require_index(&self, id: ElementId) -> Result<ElementIndex> {
        self.index_of(id).ok_or(TimelineError::UnknownElement(id))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: ElementIndex) -> Option<&SceneElement> {
        self.elements.get(index.index())
    }

    #[inline]
    pub fn get_mut(&mut self, index: ElementIndex) -> Option<&mut SceneElement> {
        self.elements.get_mut(index.index())
    }

    #[must_use]
    pub fn by_id(&self, id: ElementId) -> Option<&SceneElement> {
        self.index_of(id).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementIndex, &SceneElement)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementIndex(i as u32), e))
    }

    /// Flags the element as rendered by some tile and grows its box.
    pub fn record_geometry(&mut self, index: ElementIndex, bbox: &BoundingBox) {
        if let Some(element) = self.get_mut(index) {
            element.has_mesh = true;
            element.bbox.extend(bbox);
        }
    }

    /// Union of the boxes of `elements`; empty if none is known yet.
    #[must_use]
    pub fn group_bounding_box(&self, elements: &[ElementIndex]) -> BoundingBox {
        let mut bbox = BoundingBox::EMPTY;
        for &index in elements {
            if let Some(e) = self.get(index) {
                bbox.extend(&e.bbox);
            }
        }
        bbox
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Links `child` under `parent`, refusing links that would close a loop.
    ///
    /// Goes through the same cycle check as [`compute_hierarchy`](Self::compute_hierarchy),
    /// as a batch of one link: on refusal the hierarchy is left untouched.
    pub fn set_parent(&mut self, child: ElementIndex, parent: ElementIndex, max_depth: usize) -> Result<()> {
        match self.apply_links(&[(child, parent)], max_depth) {
            Ok(_) => Ok(()),
            Err(_) => Err(TimelineError::HierarchyCycle {
                child: self.elements[child.index()].id,
                parent: self.elements[parent.index()].id,
            }),
        }
    }

    fn link(&mut self, child: ElementIndex, parent: ElementIndex) {
        self.unlink(child);
        self.elements[child.index()].parent = Some(parent);
        let subs = &mut self.elements[parent.index()].sub_elements;
        if !subs.contains(&child) {
            subs.push(child);
        }
    }

    fn unlink(&mut self, child: ElementIndex) {
        if let Some(parent) = self.elements[child.index()].parent.take() {
            self.elements[parent.index()]
                .sub_elements
                .retain(|c| *c != child);
        }
    }

    /// Applies `links`, then checks the whole hierarchy for cycles. On a cycle
    /// every child gets back the parent it had before the batch, and the
    /// element the walk stopped on is returned.
    fn apply_links(
        &mut self,
        links: &[(ElementIndex, ElementIndex)],
        max_depth: usize,
    ) -> std::result::Result<usize, ElementIndex> {
        let mut previous = Vec::with_capacity(links.len());
        for &(child, parent) in links {
            previous.push((child, self.elements[child.index()].parent));
            self.link(child, parent);
        }

        let Some(culprit) = self.find_cycle(max_depth) else {
            return Ok(links.len());
        };
        // Reverse order, so a child linked twice ends on its oldest parent.
        for (child, parent) in previous.into_iter().rev() {
            match parent {
                Some(parent) => self.link(child, parent),
                None => self.unlink(child),
            }
        }
        Err(culprit)
    }

    /// Applies a batch of `(child, parent)` links, then checks the whole
    /// hierarchy for cycles.
    ///
    /// Every element is walked up its parent chain at most `max_depth` steps,
    /// skipping chains already proven acyclic. If a cycle (or a chain longer
    /// than `max_depth`) is found, the whole batch is discarded: links set by
    /// earlier batches are restored as they were.
    pub fn compute_hierarchy(&mut self, links: &[(ElementId, ElementId)], max_depth: usize) -> HierarchyOutcome {
        let indices: Vec<_> = links
            .iter()
            .map(|&(child, parent)| (self.register(child), self.register(parent)))
            .collect();

        match self.apply_links(&indices, max_depth) {
            Ok(linked) => HierarchyOutcome::Linked(linked),
            Err(culprit) => {
                log::warn!(
                    "Hierarchy cycle detected around element {}: discarding all {} parent links of the batch",
                    self.elements[culprit.index()].id,
                    indices.len()
                );
                HierarchyOutcome::CycleDetected
            }
        }
    }

    fn find_cycle(&self, max_depth: usize) -> Option<ElementIndex> {
        // 0: unvisited, u32::MAX: proven acyclic, otherwise the walk that visited it
        const ACYCLIC: u32 = u32::MAX;
        let mut visited = vec![0_u32; self.elements.len()];
        let mut walk_id = 0_u32;
        for start in 0..self.elements.len() {
            if visited[start] != 0 {
                continue;
            }
            walk_id += 1;
            let mut path = Vec::new();
            let mut cursor = Some(start);
            let mut depth = 0;
            while let Some(current) = cursor {
                match visited[current] {
                    ACYCLIC => break,
                    w if w == walk_id => return Some(ElementIndex(current as u32)),
                    _ => {}
                }
                if depth > max_depth {
                    return Some(ElementIndex(current as u32));
                }
                visited[current] = walk_id;
                path.push(current);
                cursor = self.elements[current].parent.map(ElementIndex::index);
                depth += 1;
            }
            for node in path {
                visited[node] = ACYCLIC;
            }
        }
        None
    }

    /// Parses `[element, parent]` rows and applies them as one batch.
    pub fn ingest_parent_rows<R, S>(&mut self, rows: &[R], max_depth: usize) -> (RowReport, HierarchyOutcome)
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let (links, report) = metadata::parse_rows(rows, "parent", metadata::parse_parent_row);
        let outcome = self.compute_hierarchy(&links, max_depth);
        (report, outcome)
    }

    // ========================================================================
    // Animation binding propagation
    // ========================================================================

    /// Records `key` on `start` and all of its descendants, and returns the
    /// mesh-bearing elements reached. Each element holds a given key at most
    /// once, so propagating twice changes nothing.
    pub fn propagate_animation_key(&mut self, start: ElementIndex, key: AnimationKey) -> Vec<ElementIndex> {
        let mut reached = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            if !seen.insert(index) {
                continue;
            }
            let Some(element) = self.elements.get_mut(index.index()) else {
                continue;
            };
            if !element.animation_keys.contains(&key) {
                element.animation_keys.push(key);
            }
            if element.has_mesh {
                reached.push(index);
            }
            stack.extend(element.sub_elements.iter().copied());
        }
        reached.sort_unstable();
        reached
    }

    /// Mesh-bearing descendants of `start` (itself included), without
    /// recording anything.
    #[must_use]
    pub fn mesh_descendants(&self, start: ElementIndex) -> Vec<ElementIndex> {
        let mut reached = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            if !seen.insert(index) {
                continue;
            }
            let Some(element) = self.get(index) else {
                continue;
            };
            if element.has_mesh {
                reached.push(index);
            }
            stack.extend(element.sub_elements.iter().copied());
        }
        reached.sort_unstable();
        reached
    }

    // ========================================================================
    // Duplicates
    // ========================================================================

    /// Groups elements sharing a source identity. The first element seen with
    /// an identity is its group's representative; later ones are appended to
    /// the representative's group.
    pub fn compute_duplicates(&mut self, sources: &[(ElementId, String)]) {
        for (id, source) in sources {
            let index = self.register(*id);
            let Some(&first) = self.first_by_source.get(source) else {
                self.first_by_source.insert(source.clone(), index);
                continue;
            };
            if first == index {
                continue;
            }
            let group = match self.elements[first.index()].duplicates {
                Some(group) => group,
                None => {
                    let group = self.duplicate_groups.len();
                    self.duplicate_groups.push(SmallVec::from_slice(&[first]));
                    self.elements[first.index()].duplicates = Some(group);
                    group
                }
            };
            if !self.duplicate_groups[group].contains(&index) {
                self.duplicate_groups[group].push(index);
                self.elements[index.index()].duplicates = Some(group);
            }
        }
    }

    /// Parses `[element, source identity]` rows and groups duplicates.
    pub fn ingest_source_rows<R, S>(&mut self, rows: &[R]) -> RowReport
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let (sources, report) = metadata::parse_rows(rows, "source identity", metadata::parse_source_row);
        self.compute_duplicates(&sources);
        report
    }

    /// Every member of the element's duplicate group, itself included; empty
    /// when the element has no duplicate.
    #[must_use]
    pub fn duplicates_of(&self, index: ElementIndex) -> &[ElementIndex] {
        self.get(index)
            .and_then(|e| e.duplicates)
            .and_then(|g| self.duplicate_groups.get(g))
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn duplicate_group_count(&self) -> usize {
        self.duplicate_groups.len()
    }
}
