//! Import of un-versioned (v1) JSL documents
//!
//! The first-generation layout has no header. Level metadata is a single `meta`
//! value, objects are grouped by type with one meta value each, and layers
//! carry a column count instead of explicit dimensions:
//!
//! ```json
//! {
//!     "meta": {"title": "Old"},
//!     "objects": {"coin": [{"x": 1, "y": 0}, null]},
//!     "layers": [{"type": "ground", "columns": 2, "tiles": "<base64 zlib>", "meta": null}]
//! }
//! ```

use crate::error::{Error, Result};
use crate::formats::Format;
use crate::formats::common::{Compression, decode_base64};
use crate::level::{AttributeValue, Attributes, Level, LevelObject, TileLayer, cell_count};
use serde_json::{Map, Value};

/// Key used when a meta value is a single scalar.
const META_KEY: &str = "meta";

/// Padding layers to a common size may grow the decoded tile count at most
/// this many times.
const MAX_PADDING_FACTOR: usize = 16;

pub(super) fn import(fields: &Map<String, Value>) -> Result<Level> {
    let properties = match fields.get("meta") {
        Some(meta) => meta_to_attributes(meta, "level meta")?,
        None => Attributes::new(),
    };

    let layers = match fields.get("layers") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(layers)) => layers
            .iter()
            .enumerate()
            .filter_map(|(index, layer)| import_layer(index, layer).transpose())
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(malformed("'layers' is not an array")),
    };

    let width = layers.iter().map(TileLayer::width).max().unwrap_or(0);
    let height = layers.iter().map(TileLayer::height).max().unwrap_or(0);

    let decoded: usize = layers.iter().map(|layer| layer.tiles().len()).sum();
    let padded = cell_count(width, height).checked_mul(layers.len());
    if padded.is_none_or(|padded| padded > decoded.max(1).saturating_mul(MAX_PADDING_FACTOR)) {
        return Err(malformed(format!(
            "layers of different shapes would pad {decoded} tiles to {} layers of {width}x{height}",
            layers.len()
        )));
    }
    let mut level = Level::new(String::new(), width, height);
    level.properties = properties;

    for mut layer in layers {
        if layer.dimensions() != (width, height) {
            tracing::warn!(
                "Padding legacy JSL layer '{}' from {}x{} to {width}x{height}",
                layer.name,
                layer.width(),
                layer.height()
            );
            layer.resize(width, height);
        }
        level
            .add_layer(layer)
            .map_err(|e| malformed(e.to_string()))?;
    }

    match fields.get("objects") {
        None | Some(Value::Null) => {}
        Some(Value::Object(groups)) => {
            for (kind, metas) in groups {
                let Value::Array(metas) = metas else {
                    return Err(malformed(format!("objects of type '{kind}' are not an array")));
                };
                for meta in metas {
                    level.add_object(import_object(kind, meta)?);
                }
            }
        }
        Some(_) => return Err(malformed("'objects' is not an object")),
    }

    tracing::debug!(
        "Imported legacy JSL level: {}x{}, {} layers, {} objects",
        level.width(),
        level.height(),
        level.layers().len(),
        level.objects.len()
    );

    Ok(level)
}

/// Convert one legacy layer. Layers without tile data are skipped.
fn import_layer(index: usize, layer: &Value) -> Result<Option<TileLayer>> {
    let Value::Object(layer) = layer else {
        return Err(malformed(format!("layer {index} is not an object")));
    };

    let data = match layer.get("tiles") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(Value::String(s)) => s,
        Some(_) => return Err(malformed(format!("layer {index} tiles are not a string"))),
    };

    let name = match layer.get("type") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => {
            return Err(Error::unsupported(
                Format::Jsl,
                format!("nested value as the type of legacy layer {index}"),
            ));
        }
    };

    let columns = match layer.get("columns") {
        None => 1,
        Some(value) => value
            .as_u64()
            .and_then(|c| u32::try_from(c).ok())
            .filter(|&c| c > 0)
            .ok_or_else(|| malformed(format!("layer {index} has invalid columns {value}")))?,
    };

    let tiles = decode_base64(data, Compression::Zlib, None)
        .map_err(|e| malformed(format!("layer {index} ('{name}') tiles: {e}")))?;
    if tiles.len() % columns as usize != 0 {
        return Err(malformed(format!(
            "layer {index} ('{name}') has {} tiles, not a multiple of {columns} columns",
            tiles.len()
        )));
    }
    let rows = u32::try_from(tiles.len() / columns as usize)
        .map_err(|_| malformed(format!("layer {index} ('{name}') is too tall")))?;

    let properties = match layer.get("meta") {
        Some(meta) => meta_to_attributes(meta, &format!("layer {index} meta"))?,
        None => Attributes::new(),
    };

    Ok(Some(
        TileLayer::from_tiles(name, columns, rows, tiles)?.with_properties(properties),
    ))
}

fn import_object(kind: &str, meta: &Value) -> Result<LevelObject> {
    let mut object = LevelObject::new(kind, 0.0, 0.0);
    let Value::Object(fields) = meta else {
        if let Some(value) = scalar(meta, "object meta")? {
            object.attributes.insert(META_KEY.to_string(), value);
        }
        return Ok(object);
    };

    for (key, value) in fields {
        match key.as_str() {
            "x" => object.x = coordinate(kind, key, value)?,
            "y" => object.y = coordinate(kind, key, value)?,
            "z" => {
                object.z = Some(
                    value
                        .as_i64()
                        .and_then(|z| i32::try_from(z).ok())
                        .ok_or_else(|| malformed(format!("'{kind}' object has invalid z {value}")))?,
                );
            }
            _ => {
                if let Some(value) = scalar(value, "object meta")? {
                    object.attributes.insert(key.clone(), value);
                }
            }
        }
    }

    Ok(object)
}

fn coordinate(kind: &str, key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| malformed(format!("'{kind}' object has non-numeric {key} {value}")))
}

/// A meta value becomes either a single `meta` attribute or, for an object,
/// one attribute per key.
fn meta_to_attributes(meta: &Value, what: &str) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    match meta {
        Value::Object(fields) => {
            for (key, value) in fields {
                if let Some(value) = scalar(value, what)? {
                    attributes.insert(key.clone(), value);
                }
            }
        }
        other => {
            if let Some(value) = scalar(other, what)? {
                attributes.insert(META_KEY.to_string(), value);
            }
        }
    }
    Ok(attributes)
}

/// Null maps to no value; arrays and objects have no attribute form.
fn scalar(value: &Value, what: &str) -> Result<Option<AttributeValue>> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(AttributeValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(AttributeValue::Int(i)),
            None => n.as_f64().map(AttributeValue::Float),
        },
        Value::String(s) => Some(AttributeValue::String(s.clone())),
        Value::Array(_) | Value::Object(_) => {
            return Err(Error::unsupported(
                Format::Jsl,
                format!("nested arrays or objects in legacy {what}"),
            ));
        }
    })
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::malformed(Format::Jsl, None, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::common::encode_base64;
    use crate::formats::jsl::parse_jsl;
    use pretty_assertions::assert_eq;

    fn tiles(ids: &[u32]) -> String {
        encode_base64(ids, Compression::Zlib).unwrap()
    }

    #[test]
    fn test_import_v1_document() {
        let text = format!(
            r#"{{
                "meta": {{"title": "Old", "par": 30}},
                "objects": {{"coin": [{{"x": 1, "y": 0, "value": 5}}, null], "door": ["exit"]}},
                "layers": [{{"type": "ground", "columns": 2, "tiles": "{}", "meta": "solid"}}]
            }}"#,
            tiles(&[1, 0, 0, 2])
        );
        let level = parse_jsl(text.as_bytes()).unwrap();

        assert_eq!(level.dimensions(), (2, 2));
        assert_eq!(level.properties["title"], AttributeValue::from("Old"));
        assert_eq!(level.properties["par"], AttributeValue::Int(30));

        let ground = level.layer(0).unwrap();
        assert_eq!(ground.name, "ground");
        assert_eq!(ground.tiles(), &[1, 0, 0, 2]);
        assert_eq!(ground.properties["meta"], AttributeValue::from("solid"));

        assert_eq!(level.objects.len(), 3);
        assert_eq!(level.objects[0].x, 1.0);
        assert_eq!(level.objects[0].attribute("value"), Some(&AttributeValue::Int(5)));
        assert!(level.objects[1].attributes.is_empty());
        assert_eq!(level.objects[2].kind, "door");
        assert_eq!(level.objects[2].attribute("meta"), Some(&AttributeValue::from("exit")));
    }

    #[test]
    fn test_layers_padded_to_largest() {
        let text = format!(
            r#"{{"layers": [
                {{"type": "wide", "columns": 3, "tiles": "{}"}},
                {{"type": "tall", "columns": 1, "tiles": "{}"}},
                {{"type": "empty", "columns": 4, "tiles": ""}}
            ]}}"#,
            tiles(&[1, 2, 3]),
            tiles(&[4, 5])
        );
        let level = parse_jsl(text.as_bytes()).unwrap();

        assert_eq!(level.dimensions(), (3, 2));
        assert_eq!(level.layers().len(), 2);
        assert_eq!(level.layer(0).unwrap().tiles(), &[1, 2, 3, 0, 0, 0]);
        assert_eq!(level.layer(1).unwrap().tiles(), &[4, 0, 0, 5, 0, 0]);
    }

    #[test]
    fn test_mismatched_shapes_cannot_blow_up() {
        let text = format!(
            r#"{{"layers": [
                {{"type": "row", "columns": 1000, "tiles": "{}"}},
                {{"type": "column", "columns": 1, "tiles": "{}"}}
            ]}}"#,
            tiles(&[1; 1000]),
            tiles(&[2; 1000])
        );
        let err = parse_jsl(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { format: Format::Jsl, .. }), "{err}");
        assert!(err.to_string().contains("would pad 2000 tiles"), "{err}");
    }

    #[test]
    fn test_nested_meta_is_unsupported() {
        let err = parse_jsl(br#"{"meta": {"spawn": [1, 2]}}"#).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { format: Format::Jsl, .. }));
    }

    #[test]
    fn test_columns_must_divide_tiles() {
        let text = format!(r#"{{"layers": [{{"columns": 2, "tiles": "{}"}}]}}"#, tiles(&[1, 2, 3]));
        assert!(matches!(parse_jsl(text.as_bytes()), Err(Error::MalformedInput { .. })));

        let text = format!(r#"{{"layers": [{{"columns": 0, "tiles": "{}"}}]}}"#, tiles(&[1]));
        assert!(matches!(parse_jsl(text.as_bytes()), Err(Error::MalformedInput { .. })));
    }

    #[test]
    fn test_empty_document() {
        let level = parse_jsl(b"{}").unwrap();
        assert_eq!(level.dimensions(), (0, 0));
        assert!(level.objects.is_empty());
    }
}
