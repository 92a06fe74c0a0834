//! ULX binary reading

use super::rle;
use super::{
    HEADER_SIZE, KEY_SIZE, LAYER_HEADER_SIZE, LayerEncoding, NAME_SIZE, OBJECT_HEADER_SIZE,
    PROPERTY_RECORD_SIZE, TRAILER_SIZE, ULX_MAGIC, ULX_VERSION, VALUE_SIZE, ValueTag,
};
use crate::error::{Error, Position, Result};
use crate::formats::Format;
use crate::level::{AttributeValue, Attributes, Level, LevelObject, TileId, TileLayer, cell_count};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Parse a ULX file from bytes.
///
/// # Errors
/// Returns [`Error::NotUlxFormat`] if the signature is wrong,
/// [`Error::UnsupportedVersion`] for other container versions, and
/// [`Error::MalformedInput`] (with the byte offset) for truncated or
/// corrupted data.
pub fn parse_ulx(data: &[u8]) -> Result<Level> {
    let prefix = &data[..data.len().min(ULX_MAGIC.len())];
    if prefix != &ULX_MAGIC[..prefix.len()] {
        let mut found = [0u8; 4];
        found[..prefix.len()].copy_from_slice(prefix);
        return Err(Error::NotUlxFormat { found });
    }
    if data.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(malformed(data.len(), "truncated header"));
    }

    let version = LittleEndian::read_u16(&data[4..6]);
    if version != ULX_VERSION {
        return Err(Error::UnsupportedVersion {
            format: Format::Ulx,
            version: u64::from(version),
        });
    }

    let body_len = data.len() - TRAILER_SIZE;
    let mut reader = BodyReader {
        cursor: Cursor::new(&data[..body_len]),
    };
    reader.cursor.set_position(6);
    let level = reader.read_level()?;

    let consumed = reader.offset();
    if consumed != body_len {
        return Err(malformed(
            consumed,
            format!("{} unexpected bytes before the trailer", body_len - consumed),
        ));
    }

    let stored = LittleEndian::read_u32(&data[body_len..]);
    let computed = crc32fast::hash(&data[..body_len]);
    if stored != computed {
        return Err(malformed(
            body_len,
            format!("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}"),
        ));
    }

    tracing::debug!(
        "Parsed ULX level '{}': {}x{}, {} layers, {} objects",
        level.name,
        level.width(),
        level.height(),
        level.layers().len(),
        level.objects.len()
    );

    Ok(level)
}

/// Reads the region between the version field and the trailer.
struct BodyReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BodyReader<'a> {
    fn read_level(&mut self) -> Result<Level> {
        let flags = self.read_u16("header")?;
        if flags != 0 {
            return Err(malformed(6, format!("unsupported header flags {flags:#06x}")));
        }
        let width = self.read_u32("header")?;
        let height = self.read_u32("header")?;
        let layer_count = usize::from(self.read_u16("header")?);
        let property_count = usize::from(self.read_u16("header")?);
        let object_count = self.read_u32("header")? as usize;
        let name = self.read_string::<NAME_SIZE>("level name")?;
        let _reserved = self.read_bytes::<8>("header")?;

        let mut level = Level::new(name, width, height);

        self.ensure_records(property_count, PROPERTY_RECORD_SIZE, "property records")?;
        level.properties = self.read_attributes(property_count)?;

        self.ensure_records(layer_count, LAYER_HEADER_SIZE, "layer blocks")?;
        for _ in 0..layer_count {
            let layer = self.read_layer(width, height)?;
            level
                .add_layer(layer)
                .map_err(|e| malformed(self.offset(), e.to_string()))?;
        }

        self.ensure_records(object_count, OBJECT_HEADER_SIZE, "object records")?;
        for _ in 0..object_count {
            level.add_object(self.read_object()?);
        }

        Ok(level)
    }

    fn read_layer(&mut self, width: u32, height: u32) -> Result<TileLayer> {
        let name = self.read_string::<KEY_SIZE>("layer name")?;
        let encoding_at = self.offset();
        let encoding = self.read_u8("layer header")?;
        let encoding = LayerEncoding::from_u8(encoding)
            .ok_or_else(|| malformed(encoding_at, format!("unknown layer encoding {encoding}")))?;
        self.read_bytes::<3>("layer header")?;
        let payload_len = self.read_u32("layer header")? as usize;

        let start = self.offset();
        if payload_len > self.remaining() {
            return Err(malformed(
                start,
                format!(
                    "truncated payload of layer '{name}': {payload_len} bytes declared, {} available",
                    self.remaining()
                ),
            ));
        }
        let data: &'a [u8] = *self.cursor.get_ref();
        let payload = &data[start..start + payload_len];
        self.cursor.set_position((start + payload_len) as u64);

        let cells = cell_count(width, height);
        let tiles = match encoding {
            LayerEncoding::Raw => {
                if cells.checked_mul(2) != Some(payload_len) {
                    return Err(malformed(
                        start,
                        format!("raw layer '{name}' has {payload_len} bytes for {cells} cells"),
                    ));
                }
                payload
                    .chunks_exact(2)
                    .map(|pair| TileId::from(LittleEndian::read_u16(pair)))
                    .collect()
            }
            LayerEncoding::Rle => rle::decode(payload, cells)
                .map_err(|e| malformed(start + e.offset(), format!("layer '{name}': {e}")))?,
        };

        TileLayer::from_tiles(name, width, height, tiles).map_err(|e| malformed(start, e.to_string()))
    }

    fn read_object(&mut self) -> Result<LevelObject> {
        let kind = self.read_string::<KEY_SIZE>("object kind")?;
        let x = self.read_f32("object record")?;
        let y = self.read_f32("object record")?;
        let has_z_at = self.offset();
        let has_z = self.read_u8("object record")?;
        self.read_u8("object record")?;
        let z = self.read_i16("object record")?;
        let attr_count = usize::from(self.read_u16("object record")?);
        self.read_bytes::<2>("object record")?;

        let z = match has_z {
            0 => None,
            1 => Some(i32::from(z)),
            other => return Err(malformed(has_z_at, format!("invalid has_z flag {other}"))),
        };

        self.ensure_records(attr_count, PROPERTY_RECORD_SIZE, "object attributes")?;
        let attributes = self.read_attributes(attr_count)?;

        Ok(LevelObject {
            kind,
            x: f64::from(x),
            y: f64::from(y),
            z,
            attributes,
        })
    }

    fn read_attributes(&mut self, count: usize) -> Result<Attributes> {
        let mut attributes = Attributes::with_capacity(count);
        for _ in 0..count {
            let record_at = self.offset();
            let key = self.read_string::<KEY_SIZE>("property key")?;
            let tag_at = self.offset();
            let tag = self.read_u8("property record")?;
            self.read_bytes::<3>("property record")?;
            let value_at = self.offset();
            let raw = self.read_bytes::<VALUE_SIZE>("property value")?;

            let value = match ValueTag::from_u8(tag) {
                Some(ValueTag::Int) => AttributeValue::Int(i64::from(LittleEndian::read_i32(&raw))),
                Some(ValueTag::Float) => AttributeValue::Float(f64::from(LittleEndian::read_f32(&raw))),
                Some(ValueTag::Bool) => match raw[0] {
                    0 => AttributeValue::Bool(false),
                    1 => AttributeValue::Bool(true),
                    other => return Err(malformed(value_at, format!("invalid bool value {other}"))),
                },
                Some(ValueTag::String) => AttributeValue::String(fixed_str(&raw, value_at, "property value")?),
                None => return Err(malformed(tag_at, format!("unknown property tag {tag}"))),
            };

            if attributes.insert(key.clone(), value).is_some() {
                return Err(malformed(record_at, format!("duplicate property '{key}'")));
            }
        }
        Ok(attributes)
    }

    fn offset(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.offset())
    }

    /// Fail early when `count` records cannot possibly fit.
    fn ensure_records(&self, count: usize, record_size: usize, what: &str) -> Result<()> {
        if count.saturating_mul(record_size) > self.remaining() {
            return Err(malformed(
                self.offset(),
                format!("truncated {what}: {count} declared"),
            ));
        }
        Ok(())
    }

    fn read_bytes<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let at = self.offset();
        let mut buf = [0u8; N];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| malformed(at, format!("truncated {what}")))?;
        Ok(buf)
    }

    fn read_string<const N: usize>(&mut self, what: &str) -> Result<String> {
        let at = self.offset();
        let raw = self.read_bytes::<N>(what)?;
        fixed_str(&raw, at, what)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        let at = self.offset();
        self.cursor.read_u8().map_err(|_| malformed(at, format!("truncated {what}")))
    }

    fn read_u16(&mut self, what: &str) -> Result<u16> {
        let at = self.offset();
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| malformed(at, format!("truncated {what}")))
    }

    fn read_i16(&mut self, what: &str) -> Result<i16> {
        let at = self.offset();
        self.cursor
            .read_i16::<LittleEndian>()
            .map_err(|_| malformed(at, format!("truncated {what}")))
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let at = self.offset();
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| malformed(at, format!("truncated {what}")))
    }

    fn read_f32(&mut self, what: &str) -> Result<f32> {
        let at = self.offset();
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| malformed(at, format!("truncated {what}")))
    }
}

/// Decode a NUL-padded UTF-8 field.
fn fixed_str(raw: &[u8], at: usize, what: &str) -> Result<String> {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..len])
        .map(str::to_string)
        .map_err(|e| malformed(at + e.valid_up_to(), format!("{what} is not valid UTF-8")))
}

fn malformed(offset: usize, reason: impl Into<String>) -> Error {
    Error::malformed(Format::Ulx, Some(Position::Offset(offset)), reason)
}
