//! Encoded tile-id streams
//!
//! Both JSL and TMX store a layer's tiles as a run of little-endian `u32`
//! words, optionally compressed, then base64-encoded. TMX additionally allows
//! a comma-separated list.

use crate::level::TileId;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use byteorder::{ByteOrder, LittleEndian};
use flate2::Compression as FlateLevel;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

/// Upper bound on inflated tile data when the tile count is not known up
/// front (64 MiB, 16M tiles).
pub const MAX_INFLATED_BYTES: u64 = 64 * 1024 * 1024;

/// Compression applied to the raw tile words before base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Zlib,
    Gzip,
}

impl Compression {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
            Compression::Gzip => "gzip",
        }
    }

    /// Parse a compression name. An absent or empty name means [`Compression::None`].
    #[must_use]
    pub fn parse(name: Option<&str>) -> Option<Self> {
        match name.map(str::trim) {
            None | Some("" | "none") => Some(Compression::None),
            Some("zlib") => Some(Compression::Zlib),
            Some("gzip") => Some(Compression::Gzip),
            Some(_) => None,
        }
    }
}

/// Why a tile stream failed to decode.
#[derive(Error, Debug)]
pub enum TileDataError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{method} decompression failed: {source}")]
    Decompress {
        method: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("tile data is {0} bytes, not a multiple of 4")]
    Unaligned(usize),

    #[error("expected {expected} tiles, found {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("{0} tiles is more than can be addressed")]
    TooLarge(usize),

    #[error("invalid tile id '{token}' at index {index}")]
    BadCsvToken { index: usize, token: String },
}

/// Encode tiles as base64 of (optionally compressed) little-endian words.
pub fn encode_base64(tiles: &[TileId], compression: Compression) -> std::io::Result<String> {
    let mut raw = vec![0u8; tiles.len() * 4];
    LittleEndian::write_u32_into(tiles, &mut raw);

    let packed = match compression {
        Compression::None => raw,
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), FlateLevel::default());
            encoder.write_all(&raw)?;
            encoder.finish()?
        }
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), FlateLevel::default());
            encoder.write_all(&raw)?;
            encoder.finish()?
        }
    };

    Ok(BASE64.encode(packed))
}

/// Decode base64 tile data.
///
/// When `expected` is given, decompression stops just past that many tiles'
/// worth of bytes and the count must match exactly. Without it, inflated
/// data is capped at [`MAX_INFLATED_BYTES`].
pub fn decode_base64(
    text: &str,
    compression: Compression,
    expected: Option<usize>,
) -> Result<Vec<TileId>, TileDataError> {
    let expected_bytes = expected
        .map(|n| n.checked_mul(4).ok_or(TileDataError::TooLarge(n)))
        .transpose()?;

    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let packed = BASE64.decode(compact.as_bytes())?;

    // Read one byte past the expected size so oversized data is detected
    // without inflating all of it.
    let limit = expected_bytes.map_or(MAX_INFLATED_BYTES + 1, |bytes| (bytes as u64).saturating_add(1));
    let raw = match compression {
        Compression::None => packed,
        Compression::Zlib => inflate(ZlibDecoder::new(packed.as_slice()), limit, "zlib")?,
        Compression::Gzip => inflate(GzDecoder::new(packed.as_slice()), limit, "gzip")?,
    };

    if let (Some(expected), Some(bytes)) = (expected, expected_bytes) {
        if raw.len() > bytes {
            return Err(TileDataError::CountMismatch {
                expected,
                found: raw.len().div_ceil(4),
            });
        }
    } else if raw.len() as u64 > MAX_INFLATED_BYTES {
        return Err(TileDataError::TooLarge(raw.len() / 4));
    }

    if raw.len() % 4 != 0 {
        return Err(TileDataError::Unaligned(raw.len()));
    }
    let mut tiles = vec![0; raw.len() / 4];
    LittleEndian::read_u32_into(&raw, &mut tiles);

    check_count(tiles, expected)
}

/// Decode comma-separated tile ids (whitespace is ignored).
pub fn decode_csv(text: &str, expected: Option<usize>) -> Result<Vec<TileId>, TileDataError> {
    let text = text.trim();
    let tiles = if text.is_empty() {
        Vec::new()
    } else {
        text.split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                token.parse::<TileId>().map_err(|_| TileDataError::BadCsvToken {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?
    };
    check_count(tiles, expected)
}

fn inflate<R: Read>(decoder: R, limit: u64, method: &'static str) -> Result<Vec<u8>, TileDataError> {
    let mut out = Vec::new();
    decoder
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|source| TileDataError::Decompress { method, source })?;
    Ok(out)
}

fn check_count(tiles: Vec<TileId>, expected: Option<usize>) -> Result<Vec<TileId>, TileDataError> {
    match expected {
        Some(expected) if tiles.len() != expected => Err(TileDataError::CountMismatch {
            expected,
            found: tiles.len(),
        }),
        _ => Ok(tiles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_compression_decodes() {
        let tiles = vec![0, 1, 255, 256, 65_536, u32::MAX];
        for compression in [Compression::None, Compression::Zlib, Compression::Gzip] {
            let text = encode_base64(&tiles, compression).unwrap();
            let back = decode_base64(&text, compression, Some(tiles.len())).unwrap();
            assert_eq!(back, tiles, "{compression:?}");
        }
    }

    #[test]
    fn test_uncompressed_layout_is_little_endian() {
        // 1, 258 as LE u32 words
        assert_eq!(encode_base64(&[1, 258], Compression::None).unwrap(), "AQAAAAIBAAA=");
    }

    #[test]
    fn test_whitespace_in_base64_is_ignored() {
        let tiles = decode_base64("\n   AQAA\n  AAIBAAA=\n", Compression::None, None).unwrap();
        assert_eq!(tiles, vec![1, 258]);
    }

    #[test]
    fn test_count_mismatch() {
        for compression in [Compression::None, Compression::Zlib, Compression::Gzip] {
            let text = encode_base64(&[1, 2, 3], compression).unwrap();
            let err = decode_base64(&text, compression, Some(2)).unwrap_err();
            assert!(
                matches!(err, TileDataError::CountMismatch { expected: 2, found: 3 }),
                "{compression:?}: {err}"
            );

            let err = decode_base64(&text, compression, Some(4)).unwrap_err();
            assert!(
                matches!(err, TileDataError::CountMismatch { expected: 4, found: 3 }),
                "{compression:?}: {err}"
            );
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_unaddressable_tile_count() {
        let text = encode_base64(&[1], Compression::Zlib).unwrap();
        let huge = u32::MAX as usize * u32::MAX as usize;
        assert!(matches!(
            decode_base64(&text, Compression::Zlib, Some(huge)),
            Err(TileDataError::TooLarge(n)) if n == huge
        ));
    }

    #[test]
    fn test_unknown_size_inflate_is_capped() {
        let zeros = vec![0u8; MAX_INFLATED_BYTES as usize + 4];
        let mut encoder = ZlibEncoder::new(Vec::new(), FlateLevel::default());
        encoder.write_all(&zeros).unwrap();
        let text = BASE64.encode(encoder.finish().unwrap());
        assert!(matches!(
            decode_base64(&text, Compression::Zlib, None),
            Err(TileDataError::TooLarge(_))
        ));
    }

    #[test]
    fn test_corrupt_zlib() {
        let text = BASE64.encode(b"definitely not zlib");
        let err = decode_base64(&text, Compression::Zlib, None).unwrap_err();
        assert!(matches!(err, TileDataError::Decompress { method: "zlib", .. }));
    }

    #[test]
    fn test_unaligned() {
        let text = BASE64.encode([1u8, 0, 0]);
        assert!(matches!(
            decode_base64(&text, Compression::None, None),
            Err(TileDataError::Unaligned(3))
        ));
    }

    #[test]
    fn test_csv() {
        assert_eq!(decode_csv("\n1,0,\n2, 3\n", Some(4)).unwrap(), vec![1, 0, 2, 3]);
        assert!(matches!(
            decode_csv("1,x", None),
            Err(TileDataError::BadCsvToken { index: 1, .. })
        ));
        assert_eq!(decode_csv("  ", Some(0)).unwrap(), Vec::<TileId>::new());
    }

    #[test]
    fn test_parse_compression() {
        assert_eq!(Compression::parse(None), Some(Compression::None));
        assert_eq!(Compression::parse(Some("gzip")), Some(Compression::Gzip));
        assert_eq!(Compression::parse(Some("zstd")), None);
    }
}
