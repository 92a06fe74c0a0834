//! JSL document structures

use crate::formats::common::Compression;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of the `format` key in every current JSL document.
pub const JSL_FORMAT_TAG: &str = "jsl";

/// Container version written by this library.
pub const JSL_VERSION: u64 = 2;

/// A JSL (JSON Level) document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JslDocument {
    /// Always [`JSL_FORMAT_TAG`].
    pub format: String,
    /// Container version.
    pub version: u64,
    /// Level name.
    #[serde(default)]
    pub name: String,
    /// Level width in tiles.
    pub width: u32,
    /// Level height in tiles.
    pub height: u32,
    /// Number of entries in `layers`.
    pub layer_count: usize,
    /// Number of entries in `objects`.
    pub object_count: usize,
    /// Level-wide metadata.
    #[serde(default)]
    pub properties: IndexMap<String, JslAttribute>,
    /// Tile layers, bottom first.
    #[serde(default)]
    pub layers: Vec<JslLayer>,
    /// Level objects in order.
    #[serde(default)]
    pub objects: Vec<JslObject>,
}

/// A tile layer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JslLayer {
    #[serde(default)]
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Compression of the tile words; zlib when absent.
    #[serde(default)]
    pub compression: Compression,
    /// Base64 of the (compressed) little-endian tile words.
    pub tiles: String,
    #[serde(default)]
    pub properties: IndexMap<String, JslAttribute>,
}

/// An object record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JslObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: Option<i32>,
    #[serde(default)]
    pub attributes: IndexMap<String, JslAttribute>,
}

/// A typed attribute: `{ "type": "int", "value": 3 }`.
///
/// `value` stays a raw JSON value so that non-finite floats, which JSON
/// numbers cannot express, can be carried as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JslAttribute {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
}

impl JslDocument {
    /// Creates an empty current-version document for a level of the given size.
    #[must_use]
    pub fn new(name: String, width: u32, height: u32) -> Self {
        JslDocument {
            format: JSL_FORMAT_TAG.to_string(),
            version: JSL_VERSION,
            name,
            width,
            height,
            layer_count: 0,
            object_count: 0,
            properties: IndexMap::new(),
            layers: Vec::new(),
            objects: Vec::new(),
        }
    }
}
