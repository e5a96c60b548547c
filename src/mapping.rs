//! Scene Mapping
//!
//! [`SceneMapping`] is the single-writer object the host calls into: it owns
//! the element registry, the tile store, the timelines, the duplicate
//! resolver and the settings, and exposes the notifications of the streaming
//! side together with the binding, selection and hiding entry points.
//!
//! Per-tick evaluation is driven separately by the
//! [`Animator`](crate::animator::Animator).
//!
//! # Example
//!
//! ```rust,ignore
//! let mut scene = SceneMapping::new(AnimatorSettings::default())?;
//! scene.ingest_parent_rows(&parent_rows);
//! scene.on_tile_built(&content)?;
//! scene.bind_task(&[ElementId(0x20000001a2)], &task)?;
//!
//! let mut animator = Animator::new();
//! animator.play(&mut scene);
//! animator.tick(&mut scene, 1.0 / 60.0);
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::ElementTimeline;
use crate::builder::TimelineBuilder;
use crate::config::AnimatorSettings;
use crate::duplicates::DuplicateResolver;
use crate::errors::{Result, TimelineError};
use crate::extraction;
use crate::ids::{AnimationKey, ElementId, ElementIndex, TileId};
use crate::registry::{ElementRegistry, HierarchyOutcome, Requirements, RowReport};
use crate::schedule::Task;
use crate::tile::buffer::SELECTION_DEFAULT;
use crate::tile::{TileContent, TileKey, TileStore};

/// Why an element is hidden from the user. Reasons combine: an element is
/// shown only when no reason hides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HideReason {
    /// Explicit user choice.
    User,
    /// Its category is switched off.
    Category,
    /// Its model is switched off.
    Model,
}

impl HideReason {
    pub const ALL: [Self; 3] = [Self::User, Self::Category, Self::Model];
}

#[derive(Debug)]
pub struct SceneMapping {
    pub(crate) settings: AnimatorSettings,
    pub(crate) registry: ElementRegistry,
    pub(crate) tiles: TileStore,
    /// Indexed by [`AnimationKey`].
    pub(crate) timelines: Vec<ElementTimeline>,
    by_group: FxHashMap<Vec<ElementIndex>, AnimationKey>,
    pub(crate) duplicates: DuplicateResolver,
    selected: Option<ElementId>,
    hidden: FxHashMap<HideReason, FxHashSet<ElementId>>,
    full_update_requested: bool,
}

impl SceneMapping {
    pub fn new(settings: AnimatorSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            registry: ElementRegistry::new(),
            tiles: TileStore::new(),
            timelines: Vec::new(),
            by_group: FxHashMap::default(),
            duplicates: DuplicateResolver::new(),
            selected: None,
            hidden: FxHashMap::default(),
            full_update_requested: true,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimatorSettings {
        &self.settings
    }

    /// Replaces the settings. Everything is re-evaluated on the next tick.
    pub fn set_settings(&mut self, settings: AnimatorSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.full_update_requested = true;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn tiles(&self) -> &TileStore {
        &self.tiles
    }

    #[inline]
    #[must_use]
    pub fn timelines(&self) -> &[ElementTimeline] {
        &self.timelines
    }

    #[must_use]
    pub fn timeline(&self, key: AnimationKey) -> Option<&ElementTimeline> {
        self.timelines.get(key.index())
    }

    #[inline]
    #[must_use]
    pub fn duplicates(&self) -> &DuplicateResolver {
        &self.duplicates
    }

    /// Timelines animating `element`, the duplicate hider included.
    #[must_use]
    pub fn timelines_of(&self, element: ElementId) -> Vec<&ElementTimeline> {
        let Some(index) = self.registry.index_of(element) else {
            return Vec::new();
        };
        self.timelines.iter().filter(|t| t.contains(index)).collect()
    }

    /// Earliest start and latest end over every bound task.
    #[must_use]
    pub fn schedule_range(&self) -> Option<(f64, f64)> {
        let hider = self.duplicates.hider_key();
        self.timelines
            .iter()
            .filter(|t| Some(t.key()) != hider)
            .filter_map(ElementTimeline::time_range)
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
    }

    pub fn request_full_update(&mut self) {
        self.full_update_requested = true;
    }

    pub(crate) fn take_full_update_request(&mut self) -> bool {
        std::mem::take(&mut self.full_update_requested)
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn ingest_parent_rows<R, S>(&mut self, rows: &[R]) -> (RowReport, HierarchyOutcome)
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.registry
            .ingest_parent_rows(rows, self.settings.hierarchy_max_depth)
    }

    pub fn ingest_source_rows<R, S>(&mut self, rows: &[R]) -> RowReport
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.registry.ingest_source_rows(rows)
    }

    // ========================================================================
    // Streaming notifications
    // ========================================================================

    /// A tile finished building (or was rebuilt after an unload).
    ///
    /// Registers its elements, links them to the timelines they already
    /// belong to through their animation keys, hides the static duplicates
    /// of elements animated for the first time, and re-applies the
    /// requirements accumulated on them: buffers are created and elements
    /// needing it are extracted again.
    pub fn on_tile_built(&mut self, content: &TileContent) -> Result<TileKey> {
        let key = self.tiles.build_tile(content)?;

        for (id, bbox) in &content.element_bounds {
            let index = self.registry.register(*id);
            self.registry.record_geometry(index, bbox);
        }

        let builder = TimelineBuilder::new(&self.settings);
        let ids: Vec<ElementId> = self
            .tiles
            .get(key)
            .map(|t| t.elements().map(|(_, rec)| rec.element).collect())
            .unwrap_or_default();
        let mut newly_animated = Vec::new();
        for &id in &ids {
            let index = self.registry.register(id);
            if let Some(element) = self.registry.get_mut(index) {
                element.has_mesh = true;
            }
            let keys: Vec<AnimationKey> = self
                .registry
                .get(index)
                .map(|e| e.animation_keys().to_vec())
                .unwrap_or_default();
            for animation_key in keys {
                let Some(timeline) = self.timelines.get_mut(animation_key.index()) else {
                    continue;
                };
                if timeline.add_element(index) {
                    newly_animated.push(index);
                }
                let needs = builder.requirements_of(timeline);
                if let Some(element) = self.registry.get_mut(index) {
                    element.require(needs);
                }
            }
        }

        newly_animated.sort_unstable();
        newly_animated.dedup();
        self.resolve_duplicates(&newly_animated);
        self.replicate_requirements(key, &ids);
        self.repaint_selection(key, &ids);
        self.full_update_requested = true;
        Ok(key)
    }

    fn replicate_requirements(&mut self, key: TileKey, ids: &[ElementId]) {
        let Some(tile) = self.tiles.get_mut(key) else {
            return;
        };
        let mut extracted = 0;
        for &id in ids {
            let requirements = self
                .registry
                .by_id(id)
                .map_or(Requirements::empty(), |e| e.requirements);
            let hidden_duplicate = self
                .registry
                .index_of(id)
                .is_some_and(|i| self.duplicates.is_hidden(i));
            if hidden_duplicate {
                tile.ensure_highlights();
            }
            if requirements.is_empty() {
                continue;
            }
            tile.ensure_buffers(requirements);
            extracted += extraction::check_and_extract_in_tile(tile, id, requirements, &self.settings.material_parameters)
                .entity_count();
        }
        tile.setup_materials(&self.settings.material_parameters);
        if extracted > 0 {
            log::debug!("{}: {} entities re-extracted on build", tile.id(), extracted);
        }
    }

    pub fn on_tile_visibility_changed(&mut self, id: TileId, visible: bool) -> Result<()> {
        self.tiles.set_visible(id, visible)
    }

    /// Drops the tile's payload. Element requirements are kept for the next
    /// build. Returns `false` for a tile never built.
    pub fn on_tile_unloaded(&mut self, id: TileId) -> bool {
        self.tiles.unload(id).is_some()
    }

    /// The rendering side created the GPU resources of the tile's buffers.
    /// Returns the number of material instances that got a buffer attached.
    pub fn on_tile_buffers_ready(&mut self, id: TileId) -> Result<usize> {
        let key = self.tiles.require_key(id)?;
        let Some(tile) = self.tiles.get_mut(key) else {
            return Err(TimelineError::UnknownTile(id));
        };
        tile.mark_buffers_ready();
        Ok(tile.setup_materials(&self.settings.material_parameters))
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Adds `task` to the timeline animating `elements` (creating it on first
    /// use) and returns that timeline's key.
    ///
    /// The binding propagates to every descendant of the elements. Loaded
    /// tiles get the buffers the timeline needs; extraction happens lazily
    /// when the timeline is first evaluated in a state requiring it.
    pub fn bind_task(&mut self, elements: &[ElementId], task: &Task) -> Result<AnimationKey> {
        if elements.is_empty() {
            return Err(TimelineError::EmptyBinding);
        }
        task.validate()?;

        let mut group: Vec<ElementIndex> = elements.iter().map(|&id| self.registry.register(id)).collect();
        group.sort_unstable();
        group.dedup();

        let key = match self.by_group.get(&group) {
            Some(&key) => key,
            None => {
                let key = AnimationKey(self.timelines.len() as u32);
                self.timelines.push(ElementTimeline::new(key));
                self.by_group.insert(group.clone(), key);
                key
            }
        };

        let mut reached = Vec::new();
        for &index in &group {
            reached.extend(self.registry.propagate_animation_key(index, key));
        }

        let builder = TimelineBuilder::new(&self.settings);
        let Some(timeline) = self.timelines.get_mut(key.index()) else {
            return Err(TimelineError::EmptyBinding);
        };
        for &index in &reached {
            timeline.add_element(index);
        }
        builder.add_task(timeline, task)?;
        let needs = builder.requirements_of(timeline);
        let animated = timeline.elements().to_vec();

        for &index in &animated {
            if let Some(element) = self.registry.get_mut(index) {
                element.require(needs);
            }
        }

        self.resolve_duplicates(&animated);
        self.ensure_buffers_for(&animated);
        log::debug!(
            "Task '{}' bound to {} element(s), {} animated mesh element(s), needs {:?}",
            task.name,
            group.len(),
            animated.len(),
            needs
        );
        Ok(key)
    }

    fn resolve_duplicates(&mut self, animated: &[ElementIndex]) {
        let changes = self.duplicates.on_elements_bound(&self.registry, animated);
        if self.duplicates.is_empty() && self.duplicates.hider_key().is_none() {
            return;
        }
        let hider = match self.duplicates.hider_key() {
            Some(key) => key,
            None => {
                let key = AnimationKey(self.timelines.len() as u32);
                self.timelines.push(ElementTimeline::new(key));
                self.duplicates.set_hider_key(key);
                key
            }
        };
        let start = self.schedule_range().map_or(0.0, |(start, _)| start);
        if let Some(timeline) = self.timelines.get_mut(hider.index()) {
            self.duplicates.sync_hider(timeline, start);
        }
        for &index in &changes.hidden {
            if let Some(element) = self.registry.get_mut(index) {
                element.require(Requirements::HIGHLIGHT_OPACITY);
            }
        }
        self.ensure_buffers_for(&changes.hidden);
    }

    fn ensure_buffers_for(&mut self, elements: &[ElementIndex]) {
        for &index in elements {
            let Some(element) = self.registry.get(index) else {
                continue;
            };
            let (id, requirements) = (element.id, element.requirements);
            let keys = self.tiles.tiles_of(id).to_vec();
            for key in keys {
                if let Some(tile) = self.tiles.get_mut(key)
                    && tile.ensure_buffers(requirements)
                {
                    tile.setup_materials(&self.settings.material_parameters);
                }
            }
        }
    }

    // ========================================================================
    // Selection & Hiding
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn selected_element(&self) -> Option<ElementId> {
        self.selected
    }

    /// Selects `element` (or clears the selection with `None`). Returns
    /// whether the new selection was painted in at least one tile: elements
    /// masked out by the animation cannot be selected, unless extracted.
    pub fn select_element(&mut self, element: Option<ElementId>) -> Result<bool> {
        if let Some(id) = element {
            self.registry.require_index(id)?;
        }
        if let Some(previous) = self.selected.take() {
            for key in self.tiles.tiles_of(previous).to_vec() {
                if let Some(tile) = self.tiles.get_mut(key)
                    && let Some(rank) = tile.rank_of(previous)
                {
                    tile.paint_selection(rank, SELECTION_DEFAULT);
                    tile.commit_selection();
                }
            }
        }
        let Some(id) = element else {
            return Ok(false);
        };
        let color = self.settings.selection_color;
        let mut painted = false;
        for key in self.tiles.tiles_of(id).to_vec() {
            let Some(tile) = self.tiles.get_mut(key) else {
                continue;
            };
            let Some(rank) = tile.rank_of(id) else {
                continue;
            };
            let extracted = tile.element(rank).is_some_and(|r| r.is_extracted());
            if tile.is_masked(rank) && !extracted {
                continue;
            }
            let needs = tile.paint_selection(rank, color);
            if needs.created {
                tile.setup_materials(&self.settings.material_parameters);
            }
            tile.commit_selection();
            painted = true;
        }
        self.selected = Some(id);
        Ok(painted)
    }

    #[must_use]
    pub fn is_hidden(&self, element: ElementId) -> bool {
        self.hidden.values().any(|set| set.contains(&element))
    }

    /// Replaces the set of elements hidden for `reason`.
    pub fn hide_elements<I>(&mut self, elements: I, reason: HideReason)
    where
        I: IntoIterator<Item = ElementId>,
    {
        let new_set: FxHashSet<ElementId> = elements.into_iter().collect();
        let old_set = self.hidden.insert(reason, new_set).unwrap_or_default();
        let touched: FxHashSet<ElementId> = old_set
            .iter()
            .chain(self.hidden.get(&reason).into_iter().flatten())
            .copied()
            .collect();
        for id in touched {
            let hidden = self.is_hidden(id);
            self.paint_hidden(id, hidden);
        }
    }

    fn paint_hidden(&mut self, id: ElementId, hidden: bool) {
        for key in self.tiles.tiles_of(id).to_vec() {
            let Some(tile) = self.tiles.get_mut(key) else {
                continue;
            };
            let Some(rank) = tile.rank_of(id) else {
                continue;
            };
            if tile.paint_hidden(rank, hidden).created {
                tile.setup_materials(&self.settings.material_parameters);
            }
            tile.commit_selection();
        }
    }

    /// Paints the current selection and hidden elements into a fresh tile.
    fn repaint_selection(&mut self, key: TileKey, ids: &[ElementId]) {
        let color = self.settings.selection_color;
        let selected = self.selected;
        let hidden: Vec<ElementId> = ids.iter().copied().filter(|&id| self.is_hidden(id)).collect();
        let Some(tile) = self.tiles.get_mut(key) else {
            return;
        };
        let mut created = false;
        if let Some(id) = selected
            && let Some(rank) = tile.rank_of(id)
        {
            created |= tile.paint_selection(rank, color).created;
        }
        for id in hidden {
            if let Some(rank) = tile.rank_of(id) {
                created |= tile.paint_hidden(rank, true).created;
            }
        }
        if created {
            tile.setup_materials(&self.settings.material_parameters);
        }
        tile.commit_selection();
    }
}
