//! ULX (Universal Level eXchange) binary format module
//!
//! A compact little-endian container with fixed-width records, kept for
//! older tools that still produce it.
//!
//! File structure:
//! - Header (64 bytes): magic, version, flags, size, counts, level name
//! - Property records (52 bytes each)
//! - Layer blocks: 24-byte header followed by a raw or RLE payload
//! - Object records: 32-byte header followed by its attribute records
//! - Trailer: CRC-32 of every preceding byte
//!
//! Numbers are narrower than in the [`Level`] model (`i32` integers, `f32`
//! floats, `u16` tiles, `i16` z), so saving fails on values that would not
//! survive the trip.

mod reader;
mod rle;
mod writer;

pub use reader::parse_ulx;
pub use writer::serialize_ulx;

use super::{Format, LevelDecoder, LevelEncoder};
use crate::error::Result;
use crate::level::Level;

/// File signature.
pub const ULX_MAGIC: [u8; 4] = *b"ULX\x1a";

/// Container version written and accepted.
pub const ULX_VERSION: u16 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// Level name field width.
pub const NAME_SIZE: usize = 32;

/// Width of key, layer name and object kind fields.
pub const KEY_SIZE: usize = 16;

/// Width of a property value field.
pub const VALUE_SIZE: usize = 32;

/// One property record: key, tag, padding, value.
pub const PROPERTY_RECORD_SIZE: usize = KEY_SIZE + 4 + VALUE_SIZE;

/// Layer block header: name, encoding, padding, payload length.
pub const LAYER_HEADER_SIZE: usize = KEY_SIZE + 4 + 4;

/// Object record header, before its attributes.
pub const OBJECT_HEADER_SIZE: usize = KEY_SIZE + 16;

/// CRC-32 trailer.
pub const TRAILER_SIZE: usize = 4;

/// Type tag of a property record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueTag {
    Int = 1,
    Float = 2,
    Bool = 3,
    String = 4,
}

impl ValueTag {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ValueTag::Int),
            2 => Some(ValueTag::Float),
            3 => Some(ValueTag::Bool),
            4 => Some(ValueTag::String),
            _ => None,
        }
    }
}

/// Payload encoding of a layer block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LayerEncoding {
    /// One `u16` per cell, row-major.
    Raw = 0,
    /// `(u16 run, u16 tile)` pairs.
    Rle = 1,
}

impl LayerEncoding {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LayerEncoding::Raw),
            1 => Some(LayerEncoding::Rle),
            _ => None,
        }
    }
}

/// Options for writing ULX files.
///
/// # Example
///
/// ```
/// use ulvl::formats::ulx::UlxOptions;
///
/// let options = UlxOptions::new().with_rle(false);
/// assert!(!options.rle);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UlxOptions {
    /// Use run-length encoding for layers where it is smaller. Default: true
    pub rle: bool,
}

impl UlxOptions {
    #[must_use]
    pub fn new() -> Self {
        Self { rle: true }
    }

    #[must_use]
    pub fn with_rle(mut self, rle: bool) -> Self {
        self.rle = rle;
        self
    }
}

impl Default for UlxOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// ULX codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ulx {
    options: UlxOptions,
}

impl Ulx {
    #[must_use]
    pub fn new(options: UlxOptions) -> Self {
        Self { options }
    }
}

impl LevelDecoder for Ulx {
    fn format(&self) -> Format {
        Format::Ulx
    }

    fn load(&self, data: &[u8]) -> Result<Level> {
        parse_ulx(data)
    }
}

impl LevelEncoder for Ulx {
    fn save(&self, level: &Level) -> Result<Vec<u8>> {
        serialize_ulx(level, &self.options)
    }
}
