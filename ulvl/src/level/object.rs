//! Placed level objects

use super::value::{AttributeValue, Attributes};
use serde::{Deserialize, Serialize};

/// A positioned, typed entity (enemy, item, trigger, ...).
///
/// Positions are in tile units and may lie outside the level bounds; formats
/// that allow off-map placement keep it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelObject {
    /// Object type identifier. The vocabulary belongs to the game.
    pub kind: String,
    pub x: f64,
    pub y: f64,
    /// Optional layer / depth index.
    pub z: Option<i32>,
    /// Extra per-object data that doesn't map onto the common fields.
    pub attributes: Attributes,
}

impl LevelObject {
    #[must_use]
    pub fn new(kind: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            kind: kind.into(),
            x,
            y,
            z: None,
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn with_z(mut self, z: i32) -> Self {
        self.z = Some(z);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Whether the position lies within `[0, width) x [0, height)`.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        (0.0..f64::from(width)).contains(&self.x) && (0.0..f64::from(height)).contains(&self.y)
    }
}
