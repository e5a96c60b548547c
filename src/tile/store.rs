use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::errors::{Result, TimelineError};
use crate::ids::{ElementId, TileId};
use crate::tile::content::TileContent;
use crate::tile::tile::SceneTile;

new_key_type! {
    /// Stable handle of a tile for the whole session.
    pub struct TileKey;
}

/// Every tile seen during the session.
///
/// Tile records are never removed: unloading only clears their payload, and a
/// later build of the same [`TileId`] reuses the record and its key.
#[derive(Debug, Default)]
pub struct TileStore {
    tiles: SlotMap<TileKey, SceneTile>,
    by_id: FxHashMap<TileId, TileKey>,
    /// Loaded tiles rendering each element.
    element_tiles: FxHashMap<ElementId, SmallVec<[TileKey; 4]>>,
}

impl TileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub fn key_of(&self, id: TileId) -> Option<TileKey> {
        self.by_id.get(&id).copied()
    }

    pub fn require_key(&self, id: TileId) -> Result<TileKey> {
        self.key_of(id).ok_or(TimelineError::UnknownTile(id))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: TileKey) -> Option<&SceneTile> {
        self.tiles.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: TileKey) -> Option<&mut SceneTile> {
        self.tiles.get_mut(key)
    }

    #[must_use]
    pub fn by_id(&self, id: TileId) -> Option<&SceneTile> {
        self.key_of(id).and_then(|k| self.get(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileKey, &SceneTile)> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TileKey, &mut SceneTile)> {
        self.tiles.iter_mut()
    }

    /// Loaded tiles rendering `element`.
    #[must_use]
    pub fn tiles_of(&self, element: ElementId) -> &[TileKey] {
        self.element_tiles
            .get(&element)
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    /// Builds (or rebuilds) the tile `content.tile_id` and indexes its
    /// elements. Returns the tile's key.
    pub fn build_tile(&mut self, content: &TileContent) -> Result<TileKey> {
        let key = match self.by_id.get(&content.tile_id) {
            Some(&key) => key,
            None => {
                let key = self
                    .tiles
                    .insert_with_key(|key| SceneTile::new(key, content.tile_id));
                self.by_id.insert(content.tile_id, key);
                key
            }
        };
        let Some(tile) = self.tiles.get_mut(key) else {
            return Err(TimelineError::UnknownTile(content.tile_id));
        };
        let previous: Vec<ElementId> = tile.elements().map(|(_, rec)| rec.element).collect();
        tile.build(content)?;
        for element in previous {
            self.forget_element(element, key);
        }
        let Some(tile) = self.tiles.get(key) else {
            return Err(TimelineError::UnknownTile(content.tile_id));
        };
        for (_, rec) in tile.elements() {
            let tiles = self.element_tiles.entry(rec.element).or_default();
            if !tiles.contains(&key) {
                tiles.push(key);
            }
        }
        Ok(key)
    }

    /// Clears the tile's payload. Unknown tiles are ignored.
    pub fn unload(&mut self, id: TileId) -> Option<TileKey> {
        let key = self.key_of(id)?;
        self.forget_elements(key);
        if let Some(tile) = self.tiles.get_mut(key) {
            tile.unload();
        }
        Some(key)
    }

    pub fn set_visible(&mut self, id: TileId, visible: bool) -> Result<()> {
        let key = self.require_key(id)?;
        if let Some(tile) = self.tiles.get_mut(key) {
            tile.set_visible(visible);
        }
        Ok(())
    }

    fn forget_elements(&mut self, key: TileKey) {
        let Some(tile) = self.tiles.get(key) else {
            return;
        };
        let elements: Vec<ElementId> = tile.elements().map(|(_, rec)| rec.element).collect();
        for element in elements {
            self.forget_element(element, key);
        }
    }

    fn forget_element(&mut self, element: ElementId, key: TileKey) {
        if let Some(tiles) = self.element_tiles.get_mut(&element) {
            tiles.retain(|k| *k != key);
            if tiles.is_empty() {
                self.element_tiles.remove(&element);
            }
        }
    }
}
