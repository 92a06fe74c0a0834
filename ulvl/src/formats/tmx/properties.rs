//! Custom `<properties>` blocks

use super::xml::{Element, parse_flag};
use crate::error::{Error, Result};
use crate::formats::Format;
use crate::level::{AttributeValue, Attributes};

/// Read the `<properties>` child of `owner` into `into`, if there is one.
///
/// Later entries replace earlier ones with the same name.
pub(super) fn read_properties(owner: &Element, into: &mut Attributes) -> Result<()> {
    let Some(block) = owner.child("properties") else {
        return Ok(());
    };

    for property in &block.children {
        if property.name != "property" {
            tracing::trace!("Ignoring <{}> in <properties>", property.name);
            continue;
        }
        property.trace_unknown_attributes(&["name", "type", "value", "propertytype"]);

        let name = property.attr("name").ok_or_else(|| {
            Error::malformed(Format::Tmx, property.position(), "<property> without a name")
        })?;
        let value = read_value(property, name)?;
        into.insert(name.to_string(), value);
    }
    Ok(())
}

fn read_value(property: &Element, name: &str) -> Result<AttributeValue> {
    // Multi-line strings are stored as element text instead of `value`.
    let raw = property.attr("value").unwrap_or(&property.text);
    let kind = property.attr("type").unwrap_or("string");

    let invalid = || {
        Error::malformed(
            Format::Tmx,
            property.position(),
            format!("property '{name}' has invalid {kind} value '{raw}'"),
        )
    };

    match kind {
        "string" | "color" | "file" => Ok(AttributeValue::String(raw.to_string())),
        "int" | "object" => raw.trim().parse().map(AttributeValue::Int).map_err(|_| invalid()),
        "float" => raw.trim().parse().map(AttributeValue::Float).map_err(|_| invalid()),
        "bool" => parse_flag(raw).map(AttributeValue::Bool).ok_or_else(invalid),
        "class" => Err(Error::unsupported(
            Format::Tmx,
            format!("class-typed property '{name}'"),
        )),
        other => Err(Error::unsupported(
            Format::Tmx,
            format!("property '{name}' of type '{other}'"),
        )),
    }
}
