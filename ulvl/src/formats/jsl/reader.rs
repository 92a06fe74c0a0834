//! JSL document reading

use super::document::{JSL_FORMAT_TAG, JSL_VERSION, JslAttribute, JslDocument, JslLayer, JslObject};
use super::legacy;
use crate::error::{Error, Position, Result};
use crate::formats::Format;
use crate::formats::common::decode_base64;
use crate::level::{AttributeValue, Attributes, Level, LevelObject, TileLayer, cell_count};
use indexmap::IndexMap;
use serde_json::Value;

/// Parse a JSL document into a [`Level`].
///
/// Documents without a `version` key are imported as legacy v1 levels.
///
/// # Errors
/// Returns [`Error::UnsupportedVersion`] for versions other than 2, and
/// [`Error::MalformedInput`] for invalid JSON, missing or mistyped fields,
/// undecodable tile data, or counts that disagree with the arrays.
pub fn parse_jsl(data: &[u8]) -> Result<Level> {
    let text = std::str::from_utf8(data).map_err(|e| {
        Error::malformed(
            Format::Jsl,
            Some(Position::Offset(e.valid_up_to())),
            "input is not valid UTF-8",
        )
    })?;

    let root: Value = serde_json::from_str(text).map_err(|e| json_error(text, &e))?;
    let Some(fields) = root.as_object() else {
        return Err(Error::malformed(
            Format::Jsl,
            None,
            "top-level value is not a JSON object",
        ));
    };

    let Some(version) = fields.get("version") else {
        tracing::debug!("JSL document has no version, importing as legacy v1");
        return legacy::import(fields);
    };
    let version = version.as_u64().ok_or_else(|| {
        Error::malformed(Format::Jsl, None, "version is not an unsigned integer")
    })?;
    if version != JSL_VERSION {
        return Err(Error::UnsupportedVersion {
            format: Format::Jsl,
            version,
        });
    }

    let doc: JslDocument = serde_json::from_str(text).map_err(|e| json_error(text, &e))?;
    level_from_document(doc)
}

fn level_from_document(doc: JslDocument) -> Result<Level> {
    if doc.format != JSL_FORMAT_TAG {
        return Err(Error::malformed(
            Format::Jsl,
            None,
            format!("format tag is '{}', expected '{JSL_FORMAT_TAG}'", doc.format),
        ));
    }
    if doc.layer_count != doc.layers.len() {
        return Err(Error::malformed(
            Format::Jsl,
            None,
            format!(
                "layer_count is {} but {} layers are present",
                doc.layer_count,
                doc.layers.len()
            ),
        ));
    }
    if doc.object_count != doc.objects.len() {
        return Err(Error::malformed(
            Format::Jsl,
            None,
            format!(
                "object_count is {} but {} objects are present",
                doc.object_count,
                doc.objects.len()
            ),
        ));
    }

    let mut level = Level::new(doc.name, doc.width, doc.height);
    level.properties = decode_attributes(&doc.properties, "level")?;

    for (index, layer) in doc.layers.into_iter().enumerate() {
        let layer = decode_layer(index, layer, doc.width, doc.height)?;
        level
            .add_layer(layer)
            .map_err(|e| Error::malformed(Format::Jsl, None, e.to_string()))?;
    }

    for (index, object) in doc.objects.into_iter().enumerate() {
        level.add_object(decode_object(index, object)?);
    }

    tracing::debug!(
        "Parsed JSL level '{}': {}x{}, {} layers, {} objects",
        level.name,
        level.width(),
        level.height(),
        level.layers().len(),
        level.objects.len()
    );

    Ok(level)
}

fn decode_layer(index: usize, layer: JslLayer, width: u32, height: u32) -> Result<TileLayer> {
    if (layer.width, layer.height) != (width, height) {
        return Err(Error::malformed(
            Format::Jsl,
            None,
            format!(
                "layer {index} ('{}') is {}x{} but the level is {width}x{height}",
                layer.name, layer.width, layer.height
            ),
        ));
    }

    let tiles = decode_base64(&layer.tiles, layer.compression, Some(cell_count(width, height)))
        .map_err(|e| {
            Error::malformed(
                Format::Jsl,
                None,
                format!("layer {index} ('{}') tiles: {e}", layer.name),
            )
        })?;

    let properties = decode_attributes(&layer.properties, &format!("layer {index}"))?;
    Ok(TileLayer::from_tiles(layer.name, width, height, tiles)?.with_properties(properties))
}

fn decode_object(index: usize, object: JslObject) -> Result<LevelObject> {
    let attributes = decode_attributes(&object.attributes, &format!("object {index}"))?;
    Ok(LevelObject {
        kind: object.kind,
        x: object.x,
        y: object.y,
        z: object.z,
        attributes,
    })
}

fn decode_attributes(raw: &IndexMap<String, JslAttribute>, owner: &str) -> Result<Attributes> {
    raw.iter()
        .map(|(key, attr)| {
            decode_attribute(attr)
                .map(|value| (key.clone(), value))
                .ok_or_else(|| {
                    Error::malformed(
                        Format::Jsl,
                        None,
                        format!(
                            "{owner} attribute '{key}': {} is not a valid '{}' value",
                            attr.value, attr.type_name
                        ),
                    )
                })
        })
        .collect()
}

/// Decode a tagged attribute, or `None` if the tag and value disagree.
fn decode_attribute(attr: &JslAttribute) -> Option<AttributeValue> {
    match attr.type_name.as_str() {
        "int" => attr.value.as_i64().map(AttributeValue::Int),
        "float" => match &attr.value {
            Value::Number(n) => n.as_f64().map(AttributeValue::Float),
            Value::String(s) => match s.as_str() {
                "NaN" => Some(AttributeValue::Float(f64::NAN)),
                "inf" => Some(AttributeValue::Float(f64::INFINITY)),
                "-inf" => Some(AttributeValue::Float(f64::NEG_INFINITY)),
                _ => None,
            },
            _ => None,
        },
        "string" => attr.value.as_str().map(|s| AttributeValue::String(s.to_string())),
        "bool" => attr.value.as_bool().map(AttributeValue::Bool),
        _ => None,
    }
}

/// Convert a `serde_json` error into a positioned [`Error::MalformedInput`].
fn json_error(text: &str, err: &serde_json::Error) -> Error {
    let position = (err.line() > 0).then(|| Position::Offset(byte_offset(text, err.line(), err.column())));
    Error::malformed(Format::Jsl, position, err.to_string())
}

/// Byte offset of a 1-based line and a column counted in bytes.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column).min(text.len())
}
