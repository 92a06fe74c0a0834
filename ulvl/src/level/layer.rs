//! Tile layers

use super::value::Attributes;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a tile. Meaning is up to the game.
pub type TileId = u32;

/// Tile id of an empty cell.
pub const EMPTY_TILE: TileId = 0;

/// A rectangular grid of tiles, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    /// Layer name (the layer "type" in older files).
    pub name: String,
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
    /// Per-layer metadata.
    pub properties: Attributes,
}

impl TileLayer {
    /// Create an empty layer of the given size.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            tiles: vec![EMPTY_TILE; cell_count(width, height)],
            properties: Attributes::new(),
        }
    }

    /// Create a layer from existing row-major tile data.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayer`] if `tiles.len()` is not `width * height`.
    pub fn from_tiles(
        name: impl Into<String>,
        width: u32,
        height: u32,
        tiles: Vec<TileId>,
    ) -> Result<Self> {
        let expected = cell_count(width, height);
        if tiles.len() != expected {
            return Err(Error::invalid_layer(format!(
                "{} tiles supplied for a {width}x{height} layer (expected {expected})",
                tiles.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            tiles,
            properties: Attributes::new(),
        })
    }

    /// Builder-style setter for layer properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Attributes) -> Self {
        self.properties = properties;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major tile data.
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Consume the layer, returning its tile data.
    pub fn into_tiles(self) -> Vec<TileId> {
        self.tiles
    }

    /// Tile storage matches the declared size. Only false for a layer built
    /// by deserializing untrusted data.
    pub(crate) fn is_consistent(&self) -> bool {
        self.tiles.len() == cell_count(self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Tile at (x, y), or `None` when outside the layer.
    pub fn get(&self, x: u32, y: u32) -> Option<TileId> {
        self.index(x, y).map(|i| self.tiles[i])
    }

    /// Set the tile at (x, y).
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayer`] if (x, y) is outside the layer.
    pub fn set(&mut self, x: u32, y: u32, tile: TileId) -> Result<()> {
        let Some(i) = self.index(x, y) else {
            return Err(Error::invalid_layer(format!(
                "cell ({x}, {y}) is outside the {}x{} layer '{}'",
                self.width, self.height, self.name
            )));
        };
        self.tiles[i] = tile;
        Ok(())
    }

    /// Set every cell to `tile`.
    pub fn fill(&mut self, tile: TileId) {
        self.tiles.fill(tile);
    }

    /// Set every cell to [`EMPTY_TILE`].
    pub fn clear(&mut self) {
        self.fill(EMPTY_TILE);
    }

    /// True when no cell holds a tile.
    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(|&t| t == EMPTY_TILE)
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[TileId]> {
        // chunks() panics on 0; a zero-width layer has no rows anyway
        self.tiles.chunks(self.width.max(1) as usize)
    }

    /// Distinct non-empty tile ids in this layer.
    pub fn palette(&self) -> BTreeSet<TileId> {
        self.tiles.iter().copied().filter(|&t| t != EMPTY_TILE).collect()
    }

    /// Resize the layer, keeping every surviving cell at the same (x, y).
    ///
    /// Cells outside the new bounds are dropped; new cells are empty. Layers
    /// inside a [`Level`](super::Level) are resized through
    /// [`Level::resize`](super::Level::resize) so they never disagree with it.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }

        let mut tiles = vec![EMPTY_TILE; cell_count(width, height)];
        let copy_w = self.width.min(width) as usize;
        let copy_h = self.height.min(height) as usize;
        for y in 0..copy_h {
            let src = y * self.width as usize;
            let dst = y * width as usize;
            tiles[dst..dst + copy_w].copy_from_slice(&self.tiles[src..src + copy_w]);
        }

        self.width = width;
        self.height = height;
        self.tiles = tiles;
    }
}

pub(crate) fn cell_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_layer_is_empty() {
        let layer = TileLayer::new("ground", 3, 2);
        assert_eq!(layer.dimensions(), (3, 2));
        assert_eq!(layer.tiles().len(), 6);
        assert!(layer.is_empty());
    }

    #[test]
    fn test_from_tiles_length_mismatch() {
        let err = TileLayer::from_tiles("bad", 2, 2, vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::InvalidLayer { .. }));
    }

    #[test]
    fn test_get_set() {
        let mut layer = TileLayer::new("ground", 2, 2);
        layer.set(1, 0, 5).unwrap();
        assert_eq!(layer.get(1, 0), Some(5));
        assert_eq!(layer.tiles(), &[0, 5, 0, 0]);
        assert_eq!(layer.get(2, 0), None);
        assert!(layer.set(0, 2, 1).is_err());
    }

    #[test]
    fn test_resize_clips_and_pads() {
        let mut layer = TileLayer::from_tiles("g", 3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();

        layer.resize(2, 3);
        assert_eq!(layer.tiles(), &[1, 2, 4, 5, 0, 0]);

        layer.resize(4, 1);
        assert_eq!(layer.tiles(), &[1, 2, 0, 0]);
    }

    #[test]
    fn test_rows_and_palette() {
        let layer = TileLayer::from_tiles("g", 2, 2, vec![1, 0, 0, 2]).unwrap();
        let rows: Vec<&[TileId]> = layer.rows().collect();
        assert_eq!(rows, vec![&[1, 0][..], &[0, 2][..]]);
        assert_eq!(layer.palette().into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_zero_sized_layer() {
        let layer = TileLayer::new("nothing", 0, 4);
        assert_eq!(layer.rows().count(), 0);
        assert!(layer.is_empty());
    }
}
