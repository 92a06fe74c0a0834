//! Layer `<data>` decoding and tileset localization

use super::xml::Element;
use crate::error::{Error, Result};
use crate::formats::Format;
use crate::formats::common::{Compression, decode_base64, decode_csv};
use crate::level::{EMPTY_TILE, TileId};

/// Flip and rotation flags stored in the top four bits of a gid.
pub const FLIP_MASK: u32 = 0xF000_0000;

/// Decode the global tile ids of a `<data>` element.
pub(super) fn decode_data(data: &Element, cells: usize) -> Result<Vec<u32>> {
    if data.child("chunk").is_some() {
        return Err(Error::unsupported(Format::Tmx, "chunked tile data"));
    }

    let malformed = |reason: String| Error::malformed(Format::Tmx, data.position(), reason);

    match data.attr("encoding") {
        None => {
            let gids = data
                .children_named("tile")
                .map(|tile| -> Result<u32> { Ok(tile.parse_attr("gid")?.unwrap_or(EMPTY_TILE)) })
                .collect::<Result<Vec<_>>>()?;
            if gids.len() != cells {
                return Err(malformed(format!("expected {cells} <tile> elements, found {}", gids.len())));
            }
            Ok(gids)
        }
        Some("csv") => decode_csv(&data.text, Some(cells)).map_err(|e| malformed(format!("csv data: {e}"))),
        Some("base64") => {
            let compression = match data.attr("compression") {
                Some("zstd") => return Err(Error::unsupported(Format::Tmx, "zstd-compressed tile data")),
                other => Compression::parse(other).ok_or_else(|| {
                    Error::unsupported(
                        Format::Tmx,
                        format!("'{}' tile data compression", other.unwrap_or_default()),
                    )
                })?,
            };
            decode_base64(&data.text, compression, Some(cells))
                .map_err(|e| malformed(format!("base64 data: {e}")))
        }
        Some(other) => Err(Error::unsupported(
            Format::Tmx,
            format!("'{other}' tile data encoding"),
        )),
    }
}

/// Rebase global ids onto the tileset the layer draws from.
///
/// The layer's tileset is the one with the largest `firstgid` not above the
/// largest gid in use. Ids become `gid - (firstgid - 1)` and keep their flip
/// bits. `firstgids` must be sorted ascending.
pub(super) fn localize(gids: &[u32], firstgids: &[u32], layer: &Element) -> Result<Vec<TileId>> {
    let Some(max) = gids.iter().map(|gid| gid & !FLIP_MASK).max().filter(|&max| max > 0) else {
        return Ok(vec![EMPTY_TILE; gids.len()]);
    };
    let name = layer.attr("name").unwrap_or_default();

    let firstgid = match firstgids.iter().rev().find(|&&first| first <= max) {
        Some(&first) => first,
        None if firstgids.is_empty() => 1,
        None => {
            return Err(Error::malformed(
                Format::Tmx,
                layer.position(),
                format!("gid {max} in layer '{name}' belongs to no tileset"),
            ));
        }
    };

    gids.iter()
        .map(|&gid| {
            let id = gid & !FLIP_MASK;
            if id == EMPTY_TILE {
                Ok(EMPTY_TILE)
            } else if id < firstgid {
                Err(Error::unsupported(
                    Format::Tmx,
                    format!("layer '{name}' drawing from more than one tileset"),
                ))
            } else {
                Ok((id - (firstgid - 1)) | (gid & FLIP_MASK))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::common::encode_base64;
    use crate::formats::tmx::xml::parse_document;

    fn data(xml: &str) -> Element {
        parse_document(xml).unwrap()
    }

    #[test]
    fn test_encodings() {
        assert_eq!(decode_data(&data(r#"<data encoding="csv">1,0,2</data>"#), 3).unwrap(), vec![1, 0, 2]);
        assert_eq!(
            decode_data(&data(r#"<data><tile gid="4"/><tile/></data>"#), 2).unwrap(),
            vec![4, 0]
        );
        for (name, compression) in [("", Compression::None), ("zlib", Compression::Zlib), ("gzip", Compression::Gzip)] {
            let text = encode_base64(&[7, 0, 9], compression).unwrap();
            let xml = if name.is_empty() {
                format!(r#"<data encoding="base64">{text}</data>"#)
            } else {
                format!(r#"<data encoding="base64" compression="{name}">{text}</data>"#)
            };
            assert_eq!(decode_data(&data(&xml), 3).unwrap(), vec![7, 0, 9], "{name}");
        }
    }

    #[test]
    fn test_unsupported_data() {
        for xml in [
            r#"<data encoding="base64" compression="zstd">AAAA</data>"#,
            r#"<data encoding="base64" compression="lzma">AAAA</data>"#,
            r#"<data encoding="hex">00</data>"#,
            r#"<data encoding="csv"><chunk x="0" y="0" width="1" height="1">1</chunk></data>"#,
        ] {
            let err = decode_data(&data(xml), 1).unwrap_err();
            assert!(matches!(err, Error::UnsupportedFeature { format: Format::Tmx, .. }), "{xml}");
        }
    }

    #[test]
    fn test_wrong_count() {
        let err = decode_data(&data(r#"<data encoding="csv">1,2</data>"#), 3).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_localize_picks_owning_tileset() {
        let layer = data(r#"<layer name="l"/>"#);
        let flipped = 0x8000_0000 | 102;
        assert_eq!(
            localize(&[101, 0, flipped], &[1, 101], &layer).unwrap(),
            vec![1, 0, 0x8000_0000 | 2]
        );
        assert_eq!(localize(&[3, 0], &[1, 101], &layer).unwrap(), vec![3, 0]);
    }

    #[test]
    fn test_localize_mixed_tilesets() {
        let layer = data(r#"<layer name="l"/>"#);
        let err = localize(&[5, 101], &[1, 101], &layer).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_localize_without_tilesets() {
        let layer = data("<layer/>");
        assert_eq!(localize(&[4, 0], &[], &layer).unwrap(), vec![4, 0]);
        assert!(localize(&[4], &[10], &layer).is_err());
    }
}
