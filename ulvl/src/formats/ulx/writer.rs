//! ULX binary writing

use super::rle;
use super::{
    HEADER_SIZE, KEY_SIZE, LayerEncoding, NAME_SIZE, ULX_MAGIC, ULX_VERSION, UlxOptions,
    VALUE_SIZE, ValueTag,
};
use crate::error::{Error, Result};
use crate::formats::Format;
use crate::level::{AttributeValue, Attributes, Level, LevelObject, TileLayer};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

/// Serialize a level to ULX bytes.
///
/// A failed save returns no bytes at all.
///
/// # Errors
/// Returns [`Error::UnsupportedFeature`] for values that do not fit the
/// fixed numeric widths, for layer properties and for strings containing
/// NUL, and [`Error::FieldTooLong`] for strings longer than their field.
pub fn serialize_ulx(level: &Level, options: &UlxOptions) -> Result<Vec<u8>> {
    level.validate()?;

    let layer_count = u16::try_from(level.layers().len())
        .map_err(|_| unsupported(format!("{} layers (at most 65535)", level.layers().len())))?;
    let property_count = u16::try_from(level.properties.len())
        .map_err(|_| unsupported(format!("{} level properties (at most 65535)", level.properties.len())))?;
    let object_count = u32::try_from(level.objects.len())
        .map_err(|_| unsupported(format!("{} objects", level.objects.len())))?;

    let mut out = Vec::with_capacity(HEADER_SIZE);

    // Header
    out.write_all(&ULX_MAGIC)?;
    out.write_u16::<LittleEndian>(ULX_VERSION)?;
    out.write_u16::<LittleEndian>(0)?;
    out.write_u32::<LittleEndian>(level.width())?;
    out.write_u32::<LittleEndian>(level.height())?;
    out.write_u16::<LittleEndian>(layer_count)?;
    out.write_u16::<LittleEndian>(property_count)?;
    out.write_u32::<LittleEndian>(object_count)?;
    out.write_all(&fixed_field::<NAME_SIZE>(&level.name, "level name")?)?;
    out.write_all(&[0u8; 8])?;

    write_attributes(&mut out, &level.properties, "level")?;

    let mut rle_layers = 0;
    for layer in level.layers() {
        if write_layer(&mut out, layer, options)? == LayerEncoding::Rle {
            rle_layers += 1;
        }
    }

    for (index, object) in level.objects.iter().enumerate() {
        write_object(&mut out, index, object)?;
    }

    let crc = crc32fast::hash(&out);
    out.write_u32::<LittleEndian>(crc)?;

    tracing::debug!(
        "Serialized ULX level '{}': {} layers ({} RLE), {} objects, {} bytes",
        level.name,
        layer_count,
        rle_layers,
        object_count,
        out.len()
    );
    Ok(out)
}

fn write_layer(out: &mut Vec<u8>, layer: &TileLayer, options: &UlxOptions) -> Result<LayerEncoding> {
    if !layer.properties.is_empty() {
        return Err(unsupported(format!("properties on layer '{}'", layer.name)));
    }

    let tiles = layer
        .tiles()
        .iter()
        .map(|&tile| {
            u16::try_from(tile)
                .map_err(|_| unsupported(format!("tile id {tile} in layer '{}' (at most 65535)", layer.name)))
        })
        .collect::<Result<Vec<u16>>>()?;

    let mut raw = vec![0u8; tiles.len() * 2];
    LittleEndian::write_u16_into(&tiles, &mut raw);

    let (encoding, payload) = if options.rle {
        let packed = rle::encode(&tiles);
        if packed.len() < raw.len() {
            (LayerEncoding::Rle, packed)
        } else {
            (LayerEncoding::Raw, raw)
        }
    } else {
        (LayerEncoding::Raw, raw)
    };
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| unsupported(format!("layer '{}' larger than 4 GiB", layer.name)))?;

    out.write_all(&fixed_field::<KEY_SIZE>(&layer.name, "layer name")?)?;
    out.write_u8(encoding as u8)?;
    out.write_all(&[0u8; 3])?;
    out.write_u32::<LittleEndian>(payload_len)?;
    out.write_all(&payload)?;
    Ok(encoding)
}

fn write_object(out: &mut Vec<u8>, index: usize, object: &LevelObject) -> Result<()> {
    let x = narrow_float(object.x)
        .ok_or_else(|| unsupported(format!("x position {} of object {index} as f32", object.x)))?;
    let y = narrow_float(object.y)
        .ok_or_else(|| unsupported(format!("y position {} of object {index} as f32", object.y)))?;
    let z = object
        .z
        .map(|z| {
            i16::try_from(z).map_err(|_| unsupported(format!("z {z} of object {index} (16-bit)")))
        })
        .transpose()?;
    let attr_count = u16::try_from(object.attributes.len())
        .map_err(|_| unsupported(format!("{} attributes on object {index}", object.attributes.len())))?;

    out.write_all(&fixed_field::<KEY_SIZE>(&object.kind, "object kind")?)?;
    out.write_f32::<LittleEndian>(x)?;
    out.write_f32::<LittleEndian>(y)?;
    out.write_u8(u8::from(z.is_some()))?;
    out.write_u8(0)?;
    out.write_i16::<LittleEndian>(z.unwrap_or(0))?;
    out.write_u16::<LittleEndian>(attr_count)?;
    out.write_all(&[0u8; 2])?;

    write_attributes(out, &object.attributes, &format!("object {index}"))
}

fn write_attributes(out: &mut Vec<u8>, attributes: &Attributes, owner: &str) -> Result<()> {
    for (key, value) in attributes {
        let mut record = [0u8; VALUE_SIZE];
        let tag = match value {
            AttributeValue::Int(i) => {
                let narrow = i32::try_from(*i)
                    .map_err(|_| unsupported(format!("{owner} integer '{key}' = {i} (32-bit)")))?;
                LittleEndian::write_i32(&mut record, narrow);
                ValueTag::Int
            }
            AttributeValue::Float(f) => {
                let narrow = narrow_float(*f)
                    .ok_or_else(|| unsupported(format!("{owner} float '{key}' = {f} as f32")))?;
                LittleEndian::write_f32(&mut record, narrow);
                ValueTag::Float
            }
            AttributeValue::Bool(b) => {
                record[0] = u8::from(*b);
                ValueTag::Bool
            }
            AttributeValue::String(s) => {
                record = fixed_field::<VALUE_SIZE>(s, &format!("{owner} string '{key}'"))?;
                ValueTag::String
            }
        };

        out.write_all(&fixed_field::<KEY_SIZE>(key, &format!("{owner} property key"))?)?;
        out.write_u8(tag as u8)?;
        out.write_all(&[0u8; 3])?;
        out.write_all(&record)?;
    }
    Ok(())
}

/// `f` as `f32`, if the conversion is exact. NaN stays NaN.
fn narrow_float(f: f64) -> Option<f32> {
    let narrow = f as f32;
    (f.is_nan() || f64::from(narrow) == f).then_some(narrow)
}

/// NUL-pad a string into an `N`-byte field.
fn fixed_field<const N: usize>(value: &str, field: &str) -> Result<[u8; N]> {
    let bytes = value.as_bytes();
    if bytes.contains(&0) {
        return Err(unsupported(format!("NUL character in {field}")));
    }
    if bytes.len() > N {
        return Err(Error::FieldTooLong {
            field: field.to_string(),
            len: bytes.len(),
            max: N,
        });
    }
    let mut buf = [0u8; N];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

fn unsupported(feature: impl Into<String>) -> Error {
    Error::unsupported(Format::Ulx, feature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ulx::{PROPERTY_RECORD_SIZE, TRAILER_SIZE, parse_ulx};
    use pretty_assertions::assert_eq;

    fn sample() -> Level {
        let mut level = Level::new("castle", 4, 2);
        level.properties.insert("par".into(), 120.into());
        level.properties.insert("gravity".into(), 9.5.into());
        level.properties.insert("night".into(), true.into());
        level.properties.insert("music".into(), "theme.ogg".into());
        level
            .add_layer(TileLayer::from_tiles("ground", 4, 2, vec![1, 1, 1, 1, 0, 0, 0, 65_535]).unwrap())
            .unwrap();
        level.push_empty_layer("decor");
        level.add_object(LevelObject::new("spawn", 0.5, 1.0));
        level.add_object(
            LevelObject::new("enemy", 3.0, 1.25)
                .with_z(-4)
                .with_attribute("hp", -7)
                .with_attribute("boss", false),
        );
        level
    }

    #[test]
    fn test_round_trip() {
        let level = sample();
        for options in [UlxOptions::new(), UlxOptions::new().with_rle(false)] {
            let bytes = serialize_ulx(&level, &options).unwrap();
            assert_eq!(parse_ulx(&bytes).unwrap(), level);
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = serialize_ulx(&sample(), &UlxOptions::default()).unwrap();
        assert_eq!(&bytes[0..4], b"ULX\x1a");
        assert_eq!(LittleEndian::read_u16(&bytes[4..6]), 1);
        assert_eq!(LittleEndian::read_u32(&bytes[8..12]), 4);
        assert_eq!(LittleEndian::read_u32(&bytes[12..16]), 2);
        assert_eq!(LittleEndian::read_u16(&bytes[16..18]), 2);
        assert_eq!(LittleEndian::read_u16(&bytes[18..20]), 4);
        assert_eq!(LittleEndian::read_u32(&bytes[20..24]), 2);
        assert_eq!(&bytes[24..30], b"castle");
        assert!(bytes[30..HEADER_SIZE].iter().all(|&b| b == 0));

        let body = bytes.len() - TRAILER_SIZE;
        assert_eq!(LittleEndian::read_u32(&bytes[body..]), crc32fast::hash(&bytes[..body]));
    }

    #[test]
    fn test_rle_chosen_only_when_smaller() {
        let level = sample();
        let bytes = serialize_ulx(&level, &UlxOptions::default()).unwrap();
        let first_layer = HEADER_SIZE + 4 * PROPERTY_RECORD_SIZE;
        // ground: raw is 16 bytes, RLE is 3 runs = 12 bytes
        assert_eq!(bytes[first_layer + KEY_SIZE], LayerEncoding::Rle as u8);
        assert_eq!(LittleEndian::read_u32(&bytes[first_layer + 20..first_layer + 24]), 12);

        let raw = serialize_ulx(&level, &UlxOptions::new().with_rle(false)).unwrap();
        assert_eq!(raw[first_layer + KEY_SIZE], LayerEncoding::Raw as u8);
    }

    #[test]
    fn test_values_that_do_not_fit() {
        let cases: [(&str, fn(&mut Level)); 7] = [
            ("big int", |l| {
                l.properties.insert("n".into(), AttributeValue::Int(1 << 40));
            }),
            ("lossy float", |l| {
                l.properties.insert("f".into(), AttributeValue::Float(0.1));
            }),
            ("wide tile", |l| {
                l.layer_mut(0).unwrap().set(0, 0, 70_000).unwrap();
            }),
            ("deep z", |l| l.objects[0].z = Some(40_000)),
            ("lossy x", |l| l.objects[0].x = 0.1),
            ("layer properties", |l| {
                l.layer_mut(1).unwrap().properties.insert("k".into(), 1.into());
            }),
            ("nul", |l| l.name = "a\0b".into()),
        ];

        for (what, mutate) in cases {
            let mut level = sample();
            mutate(&mut level);
            let err = serialize_ulx(&level, &UlxOptions::default()).unwrap_err();
            assert!(matches!(err, Error::UnsupportedFeature { format: Format::Ulx, .. }), "{what}: {err}");
        }
    }

    #[test]
    fn test_field_too_long() {
        let mut level = sample();
        level.objects[1].kind = "a_very_long_enemy_kind".into();
        let err = serialize_ulx(&level, &UlxOptions::default()).unwrap_err();
        match err {
            Error::FieldTooLong { field, len, max } => {
                assert_eq!(field, "object kind");
                assert_eq!((len, max), (22, 16));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nan_float_survives() {
        let mut level = Level::new("nan", 0, 0);
        level.properties.insert("f".into(), f64::NAN.into());
        let back = parse_ulx(&serialize_ulx(&level, &UlxOptions::default()).unwrap()).unwrap();
        assert!(back.properties["f"].as_float().is_some_and(f64::is_nan));
    }
}
