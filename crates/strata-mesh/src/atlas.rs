//! Texture atlas lookup used to resolve face UVs.

use rustc_hash::FxHashMap;
use strata_voxel::BlockRegistry;

/// Resolves a tile name to its `[min_u, min_v, max_u, max_v]` rectangle.
pub trait TextureAtlas: Send + Sync {
    fn uvs(&self, texture: &str) -> [f32; 4];
}

/// Name of the tile returned for unknown textures. Always slot 0.
pub const MISSING_TILE: &str = "missing";

/// A uniform grid of equally sized tiles, filled row by row.
#[derive(Clone, Debug)]
pub struct GridAtlas {
    columns: u32,
    rows: u32,
    tiles: FxHashMap<String, u32>,
}

impl GridAtlas {
    /// An atlas holding only the missing tile.
    pub fn new(columns: u32, rows: u32) -> Self {
        let mut tiles = FxHashMap::default();
        tiles.insert(MISSING_TILE.to_string(), 0);
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
            tiles,
        }
    }

    /// Lays out every tile the registry's blocks reference, in registration
    /// order, on a square-ish grid just large enough to hold them.
    pub fn from_registry(registry: &BlockRegistry) -> Self {
        let mut names: Vec<&str> = Vec::new();
        for block in registry.iter() {
            for name in block.textures.tile_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        let slots = names.len() as u32 + 1;
        let columns = (slots as f32).sqrt().ceil() as u32;
        let rows = slots.div_ceil(columns.max(1));
        let mut atlas = Self::new(columns, rows);
        for name in names {
            atlas.insert(name);
        }
        atlas
    }

    /// Assigns the next free slot to `name`. Returns its slot, or `None` if
    /// the grid is full. Re-inserting a name returns its existing slot.
    pub fn insert(&mut self, name: &str) -> Option<u32> {
        if let Some(&slot) = self.tiles.get(name) {
            return Some(slot);
        }
        let slot = self.tiles.len() as u32;
        if slot >= self.columns * self.rows {
            tracing::warn!("texture atlas full, '{}' will render as missing", name);
            return None;
        }
        self.tiles.insert(name.to_string(), slot);
        Some(slot)
    }

    /// Slot of a named tile.
    pub fn slot(&self, name: &str) -> Option<u32> {
        self.tiles.get(name).copied()
    }

    /// Number of tiles assigned, including the missing tile.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Grid dimensions as `(columns, rows)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn rect(&self, slot: u32) -> [f32; 4] {
        let tile_u = 1.0 / self.columns as f32;
        let tile_v = 1.0 / self.rows as f32;
        let u = (slot % self.columns) as f32 * tile_u;
        let v = (slot / self.columns) as f32 * tile_v;
        [u, v, u + tile_u, v + tile_v]
    }
}

impl TextureAtlas for GridAtlas {
    fn uvs(&self, texture: &str) -> [f32; 4] {
        self.rect(self.slot(texture).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rects() {
        let mut atlas = GridAtlas::new(4, 2);
        atlas.insert("a");
        atlas.insert("b");
        assert_eq!(atlas.uvs("a"), [0.25, 0.0, 0.5, 0.5]);
        assert_eq!(atlas.uvs("b"), [0.5, 0.0, 0.75, 0.5]);
        for _ in 0..3 {
            atlas.insert(&format!("t{}", atlas.len()));
        }
        assert_eq!(atlas.slot("t5"), Some(5));
        assert_eq!(atlas.uvs("t5"), [0.25, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_unknown_texture_uses_missing_tile() {
        let atlas = GridAtlas::new(2, 2);
        assert_eq!(atlas.uvs("nope"), atlas.uvs(MISSING_TILE));
        assert_eq!(atlas.uvs("nope"), [0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_full_atlas_rejects_new_tiles() {
        let mut atlas = GridAtlas::new(1, 2);
        assert_eq!(atlas.insert("a"), Some(1));
        assert_eq!(atlas.insert("a"), Some(1));
        assert_eq!(atlas.insert("b"), None);
    }

    #[test]
    fn test_from_registry_holds_every_tile() {
        let registry = BlockRegistry::with_defaults();
        let atlas = GridAtlas::from_registry(&registry);
        for block in registry.iter() {
            for name in block.textures.tile_names() {
                assert!(atlas.slot(name).is_some(), "missing tile {name}");
            }
        }
        let (columns, rows) = atlas.dimensions();
        assert!((columns * rows) as usize >= atlas.len());
    }
}
