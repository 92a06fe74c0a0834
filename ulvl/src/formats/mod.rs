//! Level file format codecs
//!
//! Each format lives in its own module and exposes a codec type:
//!
//! | Format | Codec | Load | Save |
//! |--------|-------|------|------|
//! | JSL (JSON level) | [`jsl::Jsl`] | yes | yes |
//! | ASCL (ASCII level) | [`ascl::Ascl`] | yes | yes |
//! | ULX (legacy binary) | [`ulx::Ulx`] | yes | yes |
//! | TMX (Tiled map) | [`tmx::Tmx`] | yes | no |
//!
//! The codecs share nothing but the [`Level`] model and the tile-data
//! helpers in [`common`].

pub mod ascl;
pub mod common;
pub mod jsl;
pub mod tmx;
pub mod ulx;

use crate::error::{Error, Result};
use crate::level::Level;
use std::fmt;
use std::fs;
use std::path::Path;

/// A level file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON level, the primary lossless format.
    Jsl,
    /// Plain-text character grid.
    Ascl,
    /// Legacy fixed-layout binary.
    Ulx,
    /// Tiled TMX map (load only).
    Tmx,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Jsl, Format::Ascl, Format::Ulx, Format::Tmx];

    /// Short uppercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Format::Jsl => "JSL",
            Format::Ascl => "ASCL",
            Format::Ulx => "ULX",
            Format::Tmx => "TMX",
        }
    }

    /// File extensions conventionally used by the format, preferred first.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Format::Jsl => &["jsl", "json"],
            Format::Ascl => &["ascl", "asc", "txt"],
            Format::Ulx => &["ulx"],
            Format::Tmx => &["tmx"],
        }
    }

    /// Look up a format by extension (case-insensitive, leading dot optional).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&ext.as_str()))
    }

    /// Detect the format from a file name's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether the format can be written.
    #[must_use]
    pub fn can_save(self) -> bool {
        !matches!(self, Format::Tmx)
    }

    /// Decode a level with the format's default options.
    ///
    /// # Errors
    /// Returns whatever the format's codec reports for invalid input.
    pub fn load(self, data: &[u8]) -> Result<Level> {
        match self {
            Format::Jsl => jsl::Jsl::default().load(data),
            Format::Ascl => ascl::Ascl::default().load(data),
            Format::Ulx => ulx::Ulx::default().load(data),
            Format::Tmx => tmx::Tmx::default().load(data),
        }
    }

    /// Encode a level with the format's default options.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFeature`] for load-only formats, and
    /// whatever the codec reports for levels it cannot represent.
    pub fn save(self, level: &Level) -> Result<Vec<u8>> {
        match self {
            Format::Jsl => jsl::Jsl::default().save(level),
            Format::Ascl => ascl::Ascl::default().save(level),
            Format::Ulx => ulx::Ulx::default().save(level),
            Format::Tmx => Err(Error::unsupported(Format::Tmx, "saving")),
        }
    }

    /// Read and decode a level file.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as [`Format::load`].
    pub fn load_file<P: AsRef<Path>>(self, path: P) -> Result<Level> {
        let data = fs::read(path.as_ref())?;
        tracing::debug!("Loading {} level from {}", self, path.as_ref().display());
        self.load(&data)
    }

    /// Encode a level and write it to disk.
    ///
    /// Nothing is written if encoding fails.
    ///
    /// # Errors
    /// As [`Format::save`], or [`Error::Io`] if writing fails.
    pub fn save_file<P: AsRef<Path>>(self, level: &Level, path: P) -> Result<()> {
        let data = self.save(level)?;
        fs::write(path.as_ref(), data)?;
        tracing::debug!("Saved {} level to {}", self, path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A codec that can decode levels.
pub trait LevelDecoder {
    /// The format this codec reads.
    fn format(&self) -> Format;

    /// Decode a complete level from an in-memory buffer.
    ///
    /// Either returns a level satisfying every model invariant or fails;
    /// partial results are never exposed.
    fn load(&self, data: &[u8]) -> Result<Level>;
}

/// A codec that can also encode levels.
pub trait LevelEncoder: LevelDecoder {
    /// Encode a level into a new buffer.
    ///
    /// Anything the format cannot represent is an error, never silently
    /// dropped or truncated.
    fn save(&self, level: &Level) -> Result<Vec<u8>>;
}

/// Read a level file, picking the format from its extension.
///
/// # Errors
/// Returns [`Error::UnknownFormat`] for unrecognized extensions.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Level> {
    let format = detect(path.as_ref())?;
    format.load_file(path)
}

/// Write a level file, picking the format from its extension.
///
/// # Errors
/// Returns [`Error::UnknownFormat`] for unrecognized extensions.
pub fn save_file<P: AsRef<Path>>(level: &Level, path: P) -> Result<()> {
    let format = detect(path.as_ref())?;
    format.save_file(level, path)
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| Error::UnknownFormat {
        path: path.to_path_buf(),
    })
}
