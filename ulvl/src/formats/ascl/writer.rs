//! ASCL text writing

use super::AsclOptions;
use super::palette::Palette;
use super::syntax::{format_value, is_valid_key, quote};
use crate::error::{Error, Result};
use crate::formats::Format;
use crate::level::{Attributes, Level};
use std::fmt::Write as _;

/// Serialize a level to ASCL text.
///
/// # Errors
/// Returns [`Error::PaletteOverflow`] if the level uses more than 36
/// distinct tile ids, or [`Error::UnsupportedFeature`] for attribute keys
/// the text syntax cannot carry.
pub fn serialize_ascl(level: &Level, options: &AsclOptions) -> Result<Vec<u8>> {
    level.validate()?;
    let palette = Palette::for_level(level)?;
    check_keys(level)?;

    let mut out = String::new();
    if options.write_comments {
        let _ = writeln!(out, "# ASCL level");
        let _ = writeln!(
            out,
            "# {}x{}, {} layers, {} objects",
            level.width(),
            level.height(),
            level.layers().len(),
            level.objects.len()
        );
    }

    let _ = writeln!(out, "name {}", quote(&level.name));
    let _ = writeln!(out, "size {} {}", level.width(), level.height());
    if !palette.is_empty() {
        out.push_str("palette");
        for (symbol, id) in palette.entries() {
            let _ = write!(out, " {symbol}={id}");
        }
        out.push('\n');
    }
    write_properties(&mut out, &level.properties);

    for layer in level.layers() {
        let _ = writeln!(out, "\nlayer {}", quote(&layer.name));
        write_properties(&mut out, &layer.properties);
        if layer.width() == 0 {
            continue;
        }
        for row in layer.rows() {
            for &tile in row {
                // every tile id is in the palette built from this level
                out.push(palette.symbol_for(tile).unwrap_or('?'));
            }
            out.push('\n');
        }
    }

    if !level.objects.is_empty() {
        out.push_str("\nobjects\n");
        for object in &level.objects {
            let _ = write!(out, "object {} {} {}", quote(&object.kind), object.x, object.y);
            if let Some(z) = object.z {
                let _ = write!(out, " z={z}");
            }
            for (key, value) in &object.attributes {
                let _ = write!(out, " {key}={}", format_value(value));
            }
            out.push('\n');
        }
    }

    tracing::debug!(
        "Serialized ASCL level '{}': {} palette symbols, {} bytes",
        level.name,
        palette.entries().count(),
        out.len()
    );

    Ok(out.into_bytes())
}

fn write_properties(out: &mut String, properties: &Attributes) {
    for (key, value) in properties {
        let _ = writeln!(out, "property {key}={}", format_value(value));
    }
}

fn check_keys(level: &Level) -> Result<()> {
    if let Some(key) = level.properties.keys().find(|k| !is_valid_key(k)) {
        return Err(bad_key("level property", key));
    }
    for layer in level.layers() {
        if let Some(key) = layer.properties.keys().find(|k| !is_valid_key(k)) {
            return Err(bad_key(&format!("property of layer '{}'", layer.name), key));
        }
    }
    for object in &level.objects {
        if object.attributes.contains_key("z") {
            return Err(Error::unsupported(
                Format::Ascl,
                format!("attribute named 'z' on '{}' object (reserved for the z position)", object.kind),
            ));
        }
        if let Some(key) = object.attributes.keys().find(|k| !is_valid_key(k)) {
            return Err(bad_key(&format!("attribute of '{}' object", object.kind), key));
        }
    }
    Ok(())
}

fn bad_key(owner: &str, key: &str) -> Error {
    Error::unsupported(Format::Ascl, format!("{owner} key {}", quote(key)))
}
