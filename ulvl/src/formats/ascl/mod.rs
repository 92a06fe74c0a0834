//! ASCL (ASCII level) format module
//!
//! A line-oriented text format for small hand-edited levels. Each layer is a
//! grid of one-character symbols; a palette maps symbols to tile ids.
//!
//! ```text
//! # comment
//! name "First Level"
//! size 2 2
//! palette 0=1 1=2
//! property author="Layla"
//!
//! layer "ground"
//! property solid=true
//! 0.
//! .1
//!
//! objects
//! object "coin" 1 0
//! object "enemy" 3.5 2 z=1 hp=10 boss=true label="big one"
//! ```
//!
//! Symbols come from [`SYMBOLS`] (`0-9A-Z`) and `.` is the empty tile, so a
//! level can use at most 36 distinct tile ids.

mod palette;
mod reader;
mod syntax;
mod writer;

pub use palette::{EMPTY_SYMBOL, SYMBOLS};
pub use reader::parse_ascl;
pub use writer::serialize_ascl;

use super::{Format, LevelDecoder, LevelEncoder};
use crate::error::Result;
use crate::level::Level;

/// Options for writing ASCL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsclOptions {
    /// Start the output with a comment summarizing the level. Default: true
    pub write_comments: bool,
}

impl AsclOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            write_comments: true,
        }
    }

    #[must_use]
    pub fn with_comments(mut self, write_comments: bool) -> Self {
        self.write_comments = write_comments;
        self
    }
}

impl Default for AsclOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// ASCL codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascl {
    options: AsclOptions,
}

impl Ascl {
    #[must_use]
    pub fn new(options: AsclOptions) -> Self {
        Self { options }
    }
}

impl LevelDecoder for Ascl {
    fn format(&self) -> Format {
        Format::Ascl
    }

    fn load(&self, data: &[u8]) -> Result<Level> {
        parse_ascl(data)
    }
}

impl LevelEncoder for Ascl {
    fn save(&self, level: &Level) -> Result<Vec<u8>> {
        serialize_ascl(level, &self.options)
    }
}
