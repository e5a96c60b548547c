use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::config::MaterialParameters;
use crate::errors::{Result, TimelineError};
use crate::ids::{ElementId, FeatureId, TileId};
use crate::registry::Requirements;
use crate::tile::buffer::{
    ALPHA, Bgra8Buffer, HIGHLIGHT_DISABLED, PLANE_DISABLED, PlaneBuffer, SELECTION_DEFAULT, SELECTION_HIDDEN,
};
use crate::tile::content::TileContent;
use crate::tile::features::{BufferSetups, ElementInTile, ExtractedElement, MeshFragment, TextureSetup};
use crate::tile::material::{BufferChannel, MaterialInstance, MaterialKey};
use crate::tile::store::TileKey;

/// Dense position of an [`ElementInTile`] inside its tile.
///
/// Ranks are stable for as long as the tile stays loaded; the per-tick code
/// addresses elements by rank rather than by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRank(pub(crate) u32);

impl ElementRank {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which buffers changed while applying an update to a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferNeeds {
    pub created: bool,
    pub changed: bool,
}

impl BufferNeeds {
    pub fn merge(&mut self, other: BufferNeeds) {
        self.created |= other.created;
        self.changed |= other.changed;
    }
}

/// Per-tile animation state.
///
/// A tile owns the elements it renders (with two indices over the same
/// records: identity for bootstrap, rank for the hot path), its batched mesh
/// fragments and material instances, the elements extracted from its batch,
/// and the three feature-indexed property buffers. Buffers are created lazily,
/// the first time an element of the tile needs them.
#[derive(Debug)]
pub struct SceneTile {
    key: TileKey,
    id: TileId,
    max_feature_id: Option<FeatureId>,
    visible: bool,
    loaded: bool,

    pub(crate) elements: Vec<ElementInTile>,
    element_ranks: FxHashMap<ElementId, ElementRank>,
    pub(crate) extracted: Vec<ExtractedElement>,

    pub(crate) meshes: Vec<MeshFragment>,
    pub(crate) materials: SlotMap<MaterialKey, MaterialInstance>,

    pub(crate) highlights: Option<Bgra8Buffer>,
    pub(crate) cutting_planes: Option<PlaneBuffer>,
    pub(crate) selection: Option<Bgra8Buffer>,
}

impl SceneTile {
    #[must_use]
    pub fn new(key: TileKey, id: TileId) -> Self {
        Self {
            key,
            id,
            max_feature_id: None,
            visible: false,
            loaded: false,
            elements: Vec::new(),
            element_ranks: FxHashMap::default(),
            extracted: Vec::new(),
            meshes: Vec::new(),
            materials: SlotMap::with_key(),
            highlights: None,
            cutting_planes: None,
            selection: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn key(&self) -> TileKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Highest feature index of the tile, or `None` when it has no feature.
    #[inline]
    #[must_use]
    pub fn max_feature_id(&self) -> Option<FeatureId> {
        self.max_feature_id
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[inline]
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn rank_of(&self, element: ElementId) -> Option<ElementRank> {
        self.element_ranks.get(&element).copied()
    }

    #[must_use]
    pub fn find(&self, element: ElementId) -> Option<&ElementInTile> {
        self.rank_of(element).and_then(|r| self.element(r))
    }

    #[inline]
    #[must_use]
    pub fn element(&self, rank: ElementRank) -> Option<&ElementInTile> {
        self.elements.get(rank.index())
    }

    #[inline]
    pub fn element_mut(&mut self, rank: ElementRank) -> Option<&mut ElementInTile> {
        self.elements.get_mut(rank.index())
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementRank, &ElementInTile)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementRank(i as u32), e))
    }

    #[must_use]
    pub fn extracted(&self, element: ElementId) -> Option<&ExtractedElement> {
        let rank = self.find(element)?.extracted_rank()?;
        self.extracted.get(rank)
    }

    pub fn extracted_elements(&self) -> impl Iterator<Item = &ExtractedElement> {
        self.extracted.iter()
    }

    #[inline]
    #[must_use]
    pub fn meshes(&self) -> &[MeshFragment] {
        &self.meshes
    }

    /// Flags a fragment as gone on the rendering side.
    pub fn mark_mesh_dead(&mut self, fragment: usize) {
        if let Some(mesh) = self.meshes.get_mut(fragment) {
            mesh.alive = false;
        }
    }

    #[must_use]
    pub fn material(&self, key: MaterialKey) -> Option<&MaterialInstance> {
        self.materials.get(key)
    }

    #[inline]
    #[must_use]
    pub fn highlights(&self) -> Option<&Bgra8Buffer> {
        self.highlights.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn cutting_planes(&self) -> Option<&PlaneBuffer> {
        self.cutting_planes.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn selection(&self) -> Option<&Bgra8Buffer> {
        self.selection.as_ref()
    }

    // ========================================================================
    // Build / Unload
    // ========================================================================

    /// Fills the tile from freshly streamed content.
    ///
    /// Every feature index must be at most `content.max_feature_id`. A tile
    /// that was loaded already is cleared first.
    pub fn build(&mut self, content: &TileContent) -> Result<()> {
        let max = content.max_feature_id;
        let out_of_range = content
            .features
            .iter()
            .map(|m| m.feature)
            .chain(content.meshes.iter().flat_map(|m| m.features.iter().copied()))
            .find(|f| f.0 > max.0);
        if let Some(feature) = out_of_range {
            return Err(TimelineError::FeatureOutOfRange {
                tile: self.id,
                feature: feature.0,
                max: max.0,
            });
        }

        if self.loaded {
            self.unload();
        }

        let mut owner: FxHashMap<FeatureId, ElementRank> = FxHashMap::default();
        for mapping in &content.features {
            let rank = self.ensure_element(mapping.element);
            match owner.get(&mapping.feature) {
                Some(&other) if other != rank => {
                    log::warn!(
                        "{}: feature {} already maps to another element, ignoring {}",
                        self.id,
                        mapping.feature.0,
                        mapping.element
                    );
                }
                Some(_) => {}
                None => {
                    owner.insert(mapping.feature, rank);
                    self.elements[rank.index()].features.push(mapping.feature);
                }
            }
        }

        for (index, mesh) in content.meshes.iter().enumerate() {
            let material = self.materials.insert(MaterialInstance::new(mesh.material, mesh.blend));
            let mut features = mesh.features.clone();
            features.sort_unstable();
            features.dedup();
            for feature in &features {
                let Some(&rank) = owner.get(feature) else {
                    continue;
                };
                let rec = &mut self.elements[rank.index()];
                if !rec.fragments.contains(&index) {
                    rec.fragments.push(index);
                }
                if !rec.materials.contains(&material) {
                    rec.materials.push(material);
                }
            }
            self.meshes.push(MeshFragment {
                features,
                material,
                transform: mesh.transform,
                alive: true,
            });
        }

        for rec in &mut self.elements {
            rec.features.sort_unstable();
        }

        self.max_feature_id = Some(max);
        self.loaded = true;
        log::debug!(
            "{} built: {} elements, {} fragments, max feature {}",
            self.id,
            self.elements.len(),
            self.meshes.len(),
            max.0
        );
        Ok(())
    }

    fn ensure_element(&mut self, element: ElementId) -> ElementRank {
        if let Some(&rank) = self.element_ranks.get(&element) {
            return rank;
        }
        let rank = ElementRank(self.elements.len() as u32);
        self.elements.push(ElementInTile::new(element));
        self.element_ranks.insert(element, rank);
        rank
    }

    /// Drops the tile's payload: elements, fragments, materials, extracted
    /// entities and buffers. The tile record itself stays.
    pub fn unload(&mut self) {
        if !self.loaded {
            return;
        }
        log::debug!(
            "{} unloaded ({} elements, {} extracted)",
            self.id,
            self.elements.len(),
            self.extracted.len()
        );
        self.elements.clear();
        self.element_ranks.clear();
        self.extracted.clear();
        self.meshes.clear();
        self.materials.clear();
        self.highlights = None;
        self.cutting_planes = None;
        self.selection = None;
        self.max_feature_id = None;
        self.loaded = false;
        self.visible = false;
    }

    // ========================================================================
    // Buffer creation
    // ========================================================================

    fn invalidate_setups(&mut self, setup: impl Fn(&mut BufferSetups) -> &mut TextureSetup) {
        for rec in &mut self.elements {
            setup(&mut rec.setups).invalidate();
        }
        for extracted in &mut self.extracted {
            for entity in &mut extracted.entities {
                setup(&mut entity.setups).invalidate();
            }
        }
    }

    /// Creates the highlight buffer if missing, or recreates it when it no
    /// longer covers every feature. Returns `true` on (re)creation.
    pub fn ensure_highlights(&mut self) -> bool {
        let Some(max) = self.max_feature_id else {
            return false;
        };
        if let Some(buf) = &self.highlights {
            if buf.covers(max) {
                return false;
            }
            log::warn!("{}: highlight buffer too small for feature {}, recreating it", self.id, max.0);
        }
        self.highlights = Some(Bgra8Buffer::new(max, HIGHLIGHT_DISABLED));
        // Extracted elements stay masked in the batch.
        if let Some(buf) = &mut self.highlights {
            for rec in self.elements.iter().filter(|r| r.is_extracted) {
                buf.set_pixels_channel(&rec.features, ALPHA, 0);
            }
        }
        self.invalidate_setups(|s| &mut s.highlight);
        true
    }

    pub fn ensure_cutting_planes(&mut self) -> bool {
        let Some(max) = self.max_feature_id else {
            return false;
        };
        if let Some(buf) = &self.cutting_planes {
            if buf.covers(max) {
                return false;
            }
            log::warn!("{}: cutting plane buffer too small for feature {}, recreating it", self.id, max.0);
        }
        self.cutting_planes = Some(PlaneBuffer::new(max, PLANE_DISABLED));
        self.invalidate_setups(|s| &mut s.cutting_plane);
        true
    }

    pub fn ensure_selection(&mut self) -> bool {
        let Some(max) = self.max_feature_id else {
            return false;
        };
        if let Some(buf) = &self.selection {
            if buf.covers(max) {
                return false;
            }
            log::warn!("{}: selection buffer too small for feature {}, recreating it", self.id, max.0);
        }
        self.selection = Some(Bgra8Buffer::new(max, SELECTION_DEFAULT));
        self.invalidate_setups(|s| &mut s.selection);
        true
    }

    /// Creates the buffers an element with `requirements` needs.
    ///
    /// Every animated channel needs the highlight buffer: fully removed
    /// growth and extraction both mask features through its alpha.
    pub fn ensure_buffers(&mut self, requirements: Requirements) -> bool {
        let mut created = false;
        if !requirements.is_empty() {
            created |= self.ensure_highlights();
        }
        if requirements.contains(Requirements::CUTTING_PLANE) {
            created |= self.ensure_cutting_planes();
        }
        created
    }

    // ========================================================================
    // Materials
    // ========================================================================

    /// Whether every material rendering the element here is translucent
    /// already, so partial opacity needs no extraction.
    #[must_use]
    pub fn all_materials_translucent(&self, rank: ElementRank) -> bool {
        self.element(rank).is_some_and(|rec| {
            !rec.materials.is_empty()
                && rec
                    .materials
                    .iter()
                    .all(|&m| self.materials.get(m).is_some_and(MaterialInstance::is_translucent))
        })
    }

    /// Attaches every ready buffer to the materials that do not have it yet.
    ///
    /// Buffers not reported ready are skipped and retried by a later call.
    /// Returns the number of material instances touched.
    pub fn setup_materials(&mut self, params: &MaterialParameters) -> usize {
        let Self {
            elements,
            extracted,
            materials,
            highlights,
            cutting_planes,
            selection,
            ..
        } = self;
        let channels = [
            (
                highlights.as_ref().is_some_and(|b| b.is_ready()),
                BufferChannel::Highlight,
                params.highlight_buffer.as_str(),
            ),
            (
                cutting_planes.as_ref().is_some_and(|b| b.is_ready()),
                BufferChannel::CuttingPlane,
                params.cutting_plane_buffer.as_str(),
            ),
            (
                selection.as_ref().is_some_and(|b| b.is_ready()),
                BufferChannel::Selection,
                params.selection_buffer.as_str(),
            ),
        ];

        let mut touched = 0;
        let mut attach = |setups: &mut BufferSetups, owned: &[MaterialKey]| {
            for &(ready, channel, parameter) in &channels {
                let setup = match channel {
                    BufferChannel::Highlight => &mut setups.highlight,
                    BufferChannel::CuttingPlane => &mut setups.cutting_plane,
                    BufferChannel::Selection => &mut setups.selection,
                };
                if !setup.should_update(ready, owned.len()) {
                    continue;
                }
                for &key in owned.get(setup.pending_from()..).unwrap_or_default() {
                    if let Some(material) = materials.get_mut(key) {
                        material.bind_buffer(parameter, channel);
                        material.set_scalar(&params.feature_id_index, 0.0);
                        touched += 1;
                    }
                }
                setup.mark_done(owned.len());
            }
        };

        for rec in elements.iter_mut() {
            attach(&mut rec.setups, &rec.materials);
        }
        for element in extracted.iter_mut() {
            for entity in &mut element.entities {
                attach(&mut entity.setups, std::slice::from_ref(&entity.material));
            }
        }
        touched
    }

    /// Rendering side acknowledgement that the GPU resources of every
    /// existing buffer are usable.
    pub fn mark_buffers_ready(&mut self) {
        if let Some(b) = &mut self.highlights {
            b.mark_ready();
        }
        if let Some(b) = &mut self.cutting_planes {
            b.mark_ready();
        }
        if let Some(b) = &mut self.selection {
            b.mark_ready();
        }
    }

    // ========================================================================
    // Commit / Reset
    // ========================================================================

    /// Publishes staged writes of every buffer. Returns `true` if any buffer
    /// changed.
    pub fn commit(&mut self) -> bool {
        let mut changed = false;
        if let Some(b) = &mut self.highlights {
            changed |= b.commit();
        }
        if let Some(b) = &mut self.cutting_planes {
            changed |= b.commit();
        }
        if let Some(b) = &mut self.selection {
            changed |= b.commit();
        }
        changed
    }

    /// Publishes the selection buffer alone, leaving a half-applied
    /// animation tick unpublished.
    pub fn commit_selection(&mut self) -> bool {
        self.selection.as_mut().is_some_and(Bgra8Buffer::commit)
    }

    /// Brings animated buffers and extracted entities back to their neutral
    /// state. Extraction itself is kept.
    pub fn reset_animation(&mut self) {
        if let Some(b) = &mut self.highlights {
            b.fill_with(HIGHLIGHT_DISABLED);
        }
        if let Some(b) = &mut self.cutting_planes {
            b.fill_with(PLANE_DISABLED);
        }
        for extracted in &mut self.extracted {
            for entity in &mut extracted.entities {
                entity.reset();
                entity.hidden = true;
            }
        }
    }

    // ========================================================================
    // Selection and hiding
    // ========================================================================

    /// Whether the element's first feature is masked out of the batch by the
    /// highlight buffer (hidden by the animation, or extracted).
    #[must_use]
    pub fn is_masked(&self, rank: ElementRank) -> bool {
        let (Some(rec), Some(buf)) = (self.element(rank), &self.highlights) else {
            return false;
        };
        rec.features
            .first()
            .and_then(|&f| buf.published_pixel(f))
            .is_some_and(|texel| texel[ALPHA] == 0)
    }

    /// Paints the color channels of the element's features in the selection
    /// buffer, creating it if needed. Alpha, which carries hiding, is kept.
    pub fn paint_selection(&mut self, rank: ElementRank, bgra: [u8; 4]) -> BufferNeeds {
        let mut needs = BufferNeeds::default();
        let Some(features) = self.element(rank).map(|r| r.features.clone()) else {
            return needs;
        };
        if features.is_empty() {
            return needs;
        }
        needs.created = self.ensure_selection();
        if let Some(buf) = &mut self.selection {
            buf.set_pixels_masked(&features, bgra, [true, true, true, false]);
            needs.changed = buf.is_dirty();
        }
        needs
    }

    /// Shows or hides the element through the selection buffer's alpha.
    pub fn paint_hidden(&mut self, rank: ElementRank, hidden: bool) -> BufferNeeds {
        let mut needs = BufferNeeds::default();
        let Some(features) = self.element(rank).map(|r| r.features.clone()) else {
            return needs;
        };
        if features.is_empty() || (!hidden && self.selection.is_none()) {
            return needs;
        }
        needs.created = self.ensure_selection();
        if let Some(buf) = &mut self.selection {
            let alpha = if hidden { SELECTION_HIDDEN[ALPHA] } else { SELECTION_DEFAULT[ALPHA] };
            buf.set_pixels_channel(&features, ALPHA, alpha);
            needs.changed = buf.is_dirty();
        }
        needs
    }
}
