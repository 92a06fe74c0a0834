//! Error types for `ulvl`

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::formats::Format;

/// Where in the input a problem was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Byte offset from the start of the input.
    Offset(usize),
    /// 1-based line number (text formats).
    Line(usize),
    /// 1-based line and column.
    LineColumn {
        /// Line number.
        line: usize,
        /// Column number.
        column: usize,
    },
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Offset(offset) => write!(f, "byte offset {offset}"),
            Position::Line(line) => write!(f, "line {line}"),
            Position::LineColumn { line, column } => write!(f, "line {line}, column {column}"),
        }
    }
}

/// Renders an optional position as a ` at ...` suffix.
struct At<'a>(&'a Option<Position>);

impl fmt::Display for At<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(position) => write!(f, " at {position}"),
            None => Ok(()),
        }
    }
}

/// The error type for `ulvl` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from the file convenience helpers.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The level format could not be determined from a file name.
    #[error("cannot determine level format of {path}")]
    UnknownFormat {
        /// The path whose extension was not recognized.
        path: PathBuf,
    },

    // ==================== Load Errors ====================
    /// The input is structurally invalid for the target format.
    #[error("malformed {format} input{}: {reason}", At(.position))]
    MalformedInput {
        /// The format being decoded.
        format: Format,
        /// Where the problem was detected, if known.
        position: Option<Position>,
        /// Description of what is wrong.
        reason: String,
    },

    /// The container declares a version this library does not read.
    #[error("unsupported {format} version: {version}")]
    UnsupportedVersion {
        /// The format being decoded.
        format: Format,
        /// The version number found in the input.
        version: u64,
    },

    /// The data is not a ULX file (bad signature).
    #[error("not a ULX file: expected magic \"ULX\\x1a\", found {found:?}")]
    NotUlxFormat {
        /// The four bytes found where the signature should be.
        found: [u8; 4],
    },

    // ==================== Save / Capability Errors ====================
    /// A construct is valid but has no representation in the format.
    #[error("{format} does not support {feature}")]
    UnsupportedFeature {
        /// The format that lacks the feature.
        format: Format,
        /// Description of the unsupported construct.
        feature: String,
    },

    /// More distinct tiles than the text format has symbols for.
    #[error("tile palette overflow: {distinct} distinct tiles, but only {capacity} symbols available")]
    PaletteOverflow {
        /// Number of distinct non-empty tile ids in the level.
        distinct: usize,
        /// Number of available symbols.
        capacity: usize,
    },

    /// A string does not fit a fixed-width field.
    #[error("{field} is {len} bytes long, field holds at most {max}")]
    FieldTooLong {
        /// Which field overflowed.
        field: String,
        /// Encoded length of the value in bytes.
        len: usize,
        /// Capacity of the field in bytes.
        max: usize,
    },

    // ==================== Model Errors ====================
    /// A level mutation would break the layer invariants.
    #[error("invalid layer: {reason}")]
    InvalidLayer {
        /// Description of the violation.
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::MalformedInput`].
    pub(crate) fn malformed(
        format: Format,
        position: Option<Position>,
        reason: impl Into<String>,
    ) -> Self {
        Error::MalformedInput {
            format,
            position,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::UnsupportedFeature`].
    pub(crate) fn unsupported(format: Format, feature: impl Into<String>) -> Self {
        Error::UnsupportedFeature {
            format,
            feature: feature.into(),
        }
    }

    /// Shorthand for [`Error::InvalidLayer`].
    pub(crate) fn invalid_layer(reason: impl Into<String>) -> Self {
        Error::InvalidLayer {
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for `ulvl` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_includes_position() {
        let err = Error::malformed(Format::Ulx, Some(Position::Offset(12)), "truncated header");
        assert_eq!(
            err.to_string(),
            "malformed ULX input at byte offset 12: truncated header"
        );

        let err = Error::malformed(Format::Jsl, None, "layer_count does not match");
        assert_eq!(err.to_string(), "malformed JSL input: layer_count does not match");
    }

    #[test]
    fn test_line_column_display() {
        let pos = Position::LineColumn { line: 3, column: 7 };
        assert_eq!(pos.to_string(), "line 3, column 7");
    }
}
