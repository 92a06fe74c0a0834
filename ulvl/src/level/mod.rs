//! The format-independent level model
//!
//! Every codec decodes into, and encodes from, a [`Level`]: an ordered stack
//! of [`TileLayer`]s that all share the level's dimensions, plus a list of
//! [`LevelObject`]s and some metadata.

mod layer;
mod object;
mod value;

pub use layer::{EMPTY_TILE, TileId, TileLayer};
pub(crate) use layer::cell_count;
pub use object::LevelObject;
pub use value::{AttributeValue, Attributes};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A complete level: tile layers, objects and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Level name or title.
    pub name: String,
    width: u32,
    height: u32,
    /// Level-wide metadata.
    pub properties: Attributes,
    layers: Vec<TileLayer>,
    /// Placed objects, in insertion order.
    pub objects: Vec<LevelObject>,
}

impl Level {
    /// Create a level with no layers and no objects.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            properties: Attributes::new(),
            layers: Vec::new(),
            objects: Vec::new(),
        }
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

    /// Tile layers in rendering order, bottom first.
    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&TileLayer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut TileLayer> {
        self.layers.get_mut(index)
    }

    /// First layer with the given name.
    pub fn layer_by_name(&self, name: &str) -> Option<&TileLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Append a layer on top of the stack.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayer`] if the layer's size differs from the level's.
    pub fn add_layer(&mut self, layer: TileLayer) -> Result<()> {
        if layer.dimensions() != self.dimensions() {
            return Err(Error::invalid_layer(format!(
                "layer '{}' is {}x{} but the level is {}x{}",
                layer.name,
                layer.width(),
                layer.height(),
                self.width,
                self.height
            )));
        }
        if !layer.is_consistent() {
            return Err(Error::invalid_layer(format!(
                "layer '{}' tile data does not match its size",
                layer.name
            )));
        }
        self.layers.push(layer);
        Ok(())
    }

    /// Append a new empty layer and return it for editing.
    pub fn push_empty_layer(&mut self, name: impl Into<String>) -> &mut TileLayer {
        self.layers.push(TileLayer::new(name, self.width, self.height));
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }

    /// Remove the layer at `index`, shifting the layers above it down.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayer`] if `index` is out of range.
    pub fn remove_layer(&mut self, index: usize) -> Result<TileLayer> {
        if index >= self.layers.len() {
            return Err(Error::invalid_layer(format!(
                "layer index {index} out of range ({} layers)",
                self.layers.len()
            )));
        }
        Ok(self.layers.remove(index))
    }

    pub fn add_object(&mut self, object: LevelObject) {
        self.objects.push(object);
    }

    /// Remove the object at `index`, keeping the order of the rest.
    pub fn remove_object(&mut self, index: usize) -> Option<LevelObject> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }

    pub fn objects_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a LevelObject> {
        self.objects.iter().filter(move |o| o.kind == kind)
    }

    /// Resize the level and every layer in it.
    ///
    /// Layers are clipped or padded with [`EMPTY_TILE`]; objects are left
    /// where they are, even if they end up out of bounds. This is the only
    /// way to change a layer's size once it belongs to a level:
    ///
    /// ```compile_fail
    /// let mut level = ulvl::Level::new("a", 2, 2);
    /// level.push_empty_layer("ground").resize(3, 3);
    /// ```
    pub fn resize(&mut self, width: u32, height: u32) {
        for layer in &mut self.layers {
            layer.resize(width, height);
        }
        self.width = width;
        self.height = height;
    }

    /// Distinct non-empty tile ids used anywhere in the level, ascending.
    pub fn tile_palette(&self) -> BTreeSet<TileId> {
        self.layers.iter().flat_map(|l| l.tiles().iter().copied()).filter(|&t| t != EMPTY_TILE).collect()
    }

    /// Check the layer invariants.
    ///
    /// Levels built through this API always pass; a level deserialized from
    /// elsewhere might not.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayer`] describing the first offending layer.
    pub fn validate(&self) -> Result<()> {
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.dimensions() != self.dimensions() {
                return Err(Error::invalid_layer(format!(
                    "layer {i} ('{}') is {}x{} but the level is {}x{}",
                    layer.name,
                    layer.width(),
                    layer.height(),
                    self.width,
                    self.height
                )));
            }
            if !layer.is_consistent() {
                return Err(Error::invalid_layer(format!(
                    "layer {i} ('{}') tile data does not match its size",
                    layer.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Level {
        let mut level = Level::new("test", 2, 2);
        level
            .add_layer(TileLayer::from_tiles("ground", 2, 2, vec![1, 0, 0, 2]).unwrap())
            .unwrap();
        level.push_empty_layer("decor").set(0, 1, 7).unwrap();
        level.add_object(LevelObject::new("coin", 1.0, 0.0));
        level
    }

    #[test]
    fn test_add_layer_dimension_mismatch() {
        let mut level = Level::new("test", 2, 2);
        let err = level.add_layer(TileLayer::new("wide", 3, 2)).unwrap_err();
        assert!(matches!(err, Error::InvalidLayer { .. }));
        assert!(level.layers().is_empty());
    }

    #[test]
    fn test_remove_layer_shifts() {
        let mut level = sample();
        level.push_empty_layer("top");

        let removed = level.remove_layer(0).unwrap();
        assert_eq!(removed.name, "ground");
        let names: Vec<&str> = level.layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["decor", "top"]);

        assert!(level.remove_layer(5).is_err());
    }

    #[test]
    fn test_resize_keeps_layers_consistent() {
        let mut level = sample();
        level.resize(3, 1);

        assert_eq!(level.dimensions(), (3, 1));
        assert!(level.layers().iter().all(|l| l.dimensions() == (3, 1)));
        assert_eq!(level.layer(0).unwrap().tiles(), &[1, 0, 0]);
        assert!(level.validate().is_ok());
        // objects are never moved or dropped
        assert_eq!(level.objects.len(), 1);
    }

    #[test]
    fn test_layer_edits_keep_level_shape() {
        let mut level = sample();
        let layer = level.layer_mut(0).unwrap();
        layer.fill(4);
        layer.set(1, 1, 9).unwrap();
        assert!(layer.set(2, 0, 9).is_err());
        layer.clear();

        assert_eq!(level.layer(0).unwrap().dimensions(), (2, 2));
        assert!(level.validate().is_ok());
    }

    #[test]
    fn test_palette_and_lookup() {
        let level = sample();
        assert_eq!(level.tile_palette().into_iter().collect::<Vec<_>>(), vec![1, 2, 7]);
        assert!(level.layer_by_name("decor").is_some());
        assert_eq!(level.objects_of_kind("coin").count(), 1);
    }

    #[test]
    fn test_remove_object() {
        let mut level = sample();
        level.add_object(LevelObject::new("enemy", 0.0, 0.0));
        assert_eq!(level.remove_object(0).unwrap().kind, "coin");
        assert_eq!(level.objects[0].kind, "enemy");
        assert!(level.remove_object(4).is_none());
    }

    #[test]
    fn test_validate_catches_deserialized_mismatch() {
        let json = r#"{
            "name": "broken", "width": 2, "height": 2, "properties": {},
            "layers": [{"name": "g", "width": 2, "height": 2, "tiles": [1, 2, 3], "properties": {}}],
            "objects": []
        }"#;
        let level: Level = serde_json::from_str(json).unwrap();
        assert!(matches!(level.validate(), Err(Error::InvalidLayer { .. })));
    }
}
