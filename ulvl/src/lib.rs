//! # ulvl
//!
//! Universal level formats: one in-memory model for tile-based 2-D game
//! levels, and codecs that move it between several file formats.
//!
//! ## Supported Formats
//!
//! - **JSL** - JSON level, the lossless primary format (also reads the
//!   older unversioned layout)
//! - **ASCL** - line-oriented ASCII grids for hand-edited levels
//! - **ULX** - compact little-endian binary with optional RLE tile data
//! - **TMX** - maps from the Tiled editor (load only)
//!
//! ## Quick Start
//!
//! ### Building and Saving a Level
//!
//! ```
//! use ulvl::{Format, Level, LevelObject};
//!
//! let mut level = Level::new("Intro", 2, 2);
//! let ground = level.push_empty_layer("ground");
//! ground.set(0, 0, 1)?;
//! ground.set(1, 1, 2)?;
//! level.add_object(LevelObject::new("coin", 1.0, 0.0));
//!
//! let bytes = Format::Jsl.save(&level)?;
//! let loaded = Format::Jsl.load(&bytes)?;
//! assert_eq!(loaded, level);
//! # Ok::<(), ulvl::Error>(())
//! ```
//!
//! ### Converting Between Files
//!
//! ```no_run
//! // Formats are picked from the file extensions.
//! let level = ulvl::load_file("maps/cave.tmx")?;
//! ulvl::save_file(&level, "maps/cave.ulx")?;
//! # Ok::<(), ulvl::Error>(())
//! ```
//!
//! ### Using the Prelude
//!
//! ```
//! use ulvl::prelude::*;
//!
//! // Now you have access to:
//! // - Level, TileLayer, LevelObject, AttributeValue
//! // - Format and the LevelDecoder / LevelEncoder traits
//! // - every codec with its options
//! // - Error, Result
//! ```
//!
//! ## Logging
//!
//! Codecs emit [`tracing`] events (summaries at `debug`, skipped TMX
//! content at `trace`, recoverable oddities at `warn`). Install a
//! subscriber to see them.

pub mod error;
pub mod formats;
pub mod level;

// Re-exports for convenience
pub use error::{Error, Position, Result};
pub use formats::{Format, LevelDecoder, LevelEncoder, load_file, save_file};
pub use level::{AttributeValue, Attributes, EMPTY_TILE, Level, LevelObject, TileId, TileLayer};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Position, Result};
    pub use crate::formats::{Format, LevelDecoder, LevelEncoder, load_file, save_file};
    pub use crate::level::{AttributeValue, Attributes, EMPTY_TILE, Level, LevelObject, TileId, TileLayer};

    pub use crate::formats::ascl::{Ascl, AsclOptions};
    pub use crate::formats::common::Compression;
    pub use crate::formats::jsl::{Jsl, JslOptions};
    pub use crate::formats::tmx::Tmx;
    pub use crate::formats::ulx::{Ulx, UlxOptions};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
