//! TMX (Tiled map) format module
//!
//! Load-only support for maps saved by the Tiled editor. Tile layers,
//! object groups and custom properties are mapped onto a [`Level`];
//! editor-only data such as tileset images is ignored.

mod data;
mod properties;
mod reader;
mod xml;

pub use data::FLIP_MASK;
pub use reader::parse_tmx;

use super::{Format, LevelDecoder};
use crate::error::Result;
use crate::level::Level;

/// TMX codec. Saving is not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tmx;

impl Tmx {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LevelDecoder for Tmx {
    fn format(&self) -> Format {
        Format::Tmx
    }

    fn load(&self, data: &[u8]) -> Result<Level> {
        parse_tmx(data)
    }
}
