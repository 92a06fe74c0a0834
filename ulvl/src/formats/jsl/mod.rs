//! JSL (JSON Level) format module
//!
//! The primary format: a direct externalization of the [`Level`] model, so
//! `save` followed by `load` reproduces any level exactly.
//!
//! A document is a JSON object with a versioned header (`format`, `version`,
//! dimensions, layer and object counts) followed by `properties`, `layers`
//! and `objects`. Tile grids are stored as base64 of zlib-compressed
//! little-endian `u32` words. Documents without a `version` key are read as
//! the older un-versioned layout.

mod document;
mod legacy;
mod reader;
mod writer;

pub use document::{JSL_FORMAT_TAG, JSL_VERSION, JslAttribute, JslDocument, JslLayer, JslObject};
pub use reader::parse_jsl;
pub use writer::{serialize_jsl, serialize_jsl_with_options};

use super::common::Compression;
use super::{Format, LevelDecoder, LevelEncoder};
use crate::error::Result;
use crate::level::Level;

/// Options controlling how JSL documents are written.
///
/// # Example
///
/// ```
/// use ulvl::formats::common::Compression;
/// use ulvl::formats::jsl::JslOptions;
///
/// let options = JslOptions::new()
///     .with_pretty(false)
///     .with_compression(Compression::Gzip);
/// assert!(!options.pretty);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JslOptions {
    /// Indent the JSON output. Default: true
    pub pretty: bool,

    /// Compression for tile data. Default: zlib
    pub compression: Compression,
}

impl JslOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pretty: true,
            compression: Compression::Zlib,
        }
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

impl Default for JslOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// JSL codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jsl {
    options: JslOptions,
}

impl Jsl {
    #[must_use]
    pub fn new(options: JslOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &JslOptions {
        &self.options
    }
}

impl LevelDecoder for Jsl {
    fn format(&self) -> Format {
        Format::Jsl
    }

    fn load(&self, data: &[u8]) -> Result<Level> {
        parse_jsl(data)
    }
}

impl LevelEncoder for Jsl {
    fn save(&self, level: &Level) -> Result<Vec<u8>> {
        serialize_jsl_with_options(level, &self.options)
    }
}
