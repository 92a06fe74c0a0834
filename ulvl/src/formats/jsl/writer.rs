//! JSL document writing

use super::JslOptions;
use super::document::{JslAttribute, JslDocument, JslLayer, JslObject};
use crate::error::{Error, Result};
use crate::formats::Format;
use crate::formats::common::encode_base64;
use crate::level::{AttributeValue, Attributes, Level};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Serialize a level with the default options (pretty, zlib tiles).
///
/// # Errors
/// See [`serialize_jsl_with_options`].
pub fn serialize_jsl(level: &Level) -> Result<Vec<u8>> {
    serialize_jsl_with_options(level, &JslOptions::default())
}

/// Serialize a level to JSL bytes.
///
/// # Errors
/// Returns [`Error::UnsupportedFeature`] if an object position is not
/// finite, or [`Error::InvalidLayer`] if the level breaks the layer
/// invariants.
pub fn serialize_jsl_with_options(level: &Level, options: &JslOptions) -> Result<Vec<u8>> {
    level.validate()?;

    let mut doc = JslDocument::new(level.name.clone(), level.width(), level.height());
    doc.properties = encode_attributes(&level.properties);

    for layer in level.layers() {
        doc.layers.push(JslLayer {
            name: layer.name.clone(),
            width: layer.width(),
            height: layer.height(),
            compression: options.compression,
            tiles: encode_base64(layer.tiles(), options.compression)?,
            properties: encode_attributes(&layer.properties),
        });
    }

    for (index, object) in level.objects.iter().enumerate() {
        if !object.x.is_finite() || !object.y.is_finite() {
            return Err(Error::unsupported(
                Format::Jsl,
                format!(
                    "non-finite position ({}, {}) of object {index} ('{}')",
                    object.x, object.y, object.kind
                ),
            ));
        }
        doc.objects.push(JslObject {
            kind: object.kind.clone(),
            x: object.x,
            y: object.y,
            z: object.z,
            attributes: encode_attributes(&object.attributes),
        });
    }

    doc.layer_count = doc.layers.len();
    doc.object_count = doc.objects.len();

    let mut out = Vec::new();
    if options.pretty {
        let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
        doc.serialize(&mut serializer).map_err(std::io::Error::from)?;
        out.push(b'\n');
    } else {
        serde_json::to_writer(&mut out, &doc).map_err(std::io::Error::from)?;
    }

    tracing::debug!(
        "Serialized JSL level '{}': {} layers, {} objects, {} bytes ({} tiles)",
        level.name,
        doc.layer_count,
        doc.object_count,
        out.len(),
        options.compression.as_str()
    );

    Ok(out)
}

fn encode_attributes(attributes: &Attributes) -> IndexMap<String, JslAttribute> {
    attributes
        .iter()
        .map(|(key, value)| (key.clone(), encode_attribute(value)))
        .collect()
}

fn encode_attribute(value: &AttributeValue) -> JslAttribute {
    let json = match value {
        AttributeValue::Int(i) => Value::from(*i),
        AttributeValue::Float(f) if f.is_nan() => Value::from("NaN"),
        AttributeValue::Float(f) if f.is_infinite() => {
            Value::from(if f.is_sign_positive() { "inf" } else { "-inf" })
        }
        AttributeValue::Float(f) => Value::from(*f),
        AttributeValue::String(s) => Value::from(s.as_str()),
        AttributeValue::Bool(b) => Value::from(*b),
    };
    JslAttribute {
        type_name: value.kind_name().to_string(),
        value: json,
    }
}
