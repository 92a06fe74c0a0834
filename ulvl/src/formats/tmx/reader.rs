//! TMX map interpretation

use super::data::{decode_data, localize};
use super::properties::read_properties;
use super::xml::{Element, parse_document};
use crate::error::{Error, Position, Result};
use crate::formats::Format;
use crate::level::{AttributeValue, Attributes, Level, LevelObject, TileLayer, cell_count};

const MAP_ATTRIBUTES: &[&str] = &[
    "version",
    "tiledversion",
    "orientation",
    "renderorder",
    "width",
    "height",
    "tilewidth",
    "tileheight",
    "infinite",
    "backgroundcolor",
    "class",
    "nextlayerid",
    "nextobjectid",
];

const LAYER_ATTRIBUTES: &[&str] = &[
    "id", "name", "class", "width", "height", "opacity", "visible", "offsetx", "offsety",
];

const OBJECT_ATTRIBUTES: &[&str] = &[
    "id", "name", "type", "class", "x", "y", "width", "height", "rotation", "gid", "visible",
];

/// Decode a Tiled TMX map.
///
/// Tile layers from every `<group>` are flattened in document order, and
/// objects from each `<objectgroup>` get that group's index among the
/// map's layers as their `z`.
///
/// # Errors
/// Returns [`Error::MalformedInput`] for invalid XML or map structure and
/// [`Error::UnsupportedFeature`] for constructs with no Level counterpart,
/// such as infinite maps or zstd-compressed data.
pub fn parse_tmx(data: &[u8]) -> Result<Level> {
    let content = std::str::from_utf8(data).map_err(|e| {
        Error::malformed(
            Format::Tmx,
            Some(Position::Offset(e.valid_up_to())),
            "input is not valid UTF-8",
        )
    })?;

    let root = parse_document(content)?;
    if root.name != "map" {
        return Err(Error::malformed(
            Format::Tmx,
            root.position(),
            format!("expected a <map> root element, found <{}>", root.name),
        ));
    }

    let level = MapReader::new(&root)?.read(&root)?;
    tracing::debug!(
        "Loaded TMX map: {}x{}, {} layers, {} objects",
        level.width(),
        level.height(),
        level.layers().len(),
        level.objects.len()
    );
    Ok(level)
}

struct MapReader {
    width: u32,
    height: u32,
    tile_width: f64,
    tile_height: f64,
    firstgids: Vec<u32>,
    /// Index of the next layer-like element, shared by tile, object and
    /// image layers.
    next_z: i32,
}

impl MapReader {
    fn new(map: &Element) -> Result<Self> {
        map.trace_unknown_attributes(MAP_ATTRIBUTES);

        if map.flag_attr("infinite")?.unwrap_or(false) {
            return Err(Error::unsupported(Format::Tmx, "infinite maps"));
        }

        let tile_size = |key: &str| -> Result<f64> {
            let size: u32 = map.require_attr(key)?;
            if size == 0 {
                return Err(Error::malformed(
                    Format::Tmx,
                    map.position(),
                    format!("{key} must be positive"),
                ));
            }
            Ok(f64::from(size))
        };

        let mut firstgids = map
            .children_named("tileset")
            .map(|tileset| match tileset.require_attr::<u32>("firstgid")? {
                0 => Err(Error::malformed(
                    Format::Tmx,
                    tileset.position(),
                    "tileset firstgid must be at least 1",
                )),
                firstgid => Ok(firstgid),
            })
            .collect::<Result<Vec<_>>>()?;
        firstgids.sort_unstable();

        Ok(Self {
            width: map.require_attr("width")?,
            height: map.require_attr("height")?,
            tile_width: tile_size("tilewidth")?,
            tile_height: tile_size("tileheight")?,
            firstgids,
            next_z: 0,
        })
    }

    fn read(mut self, map: &Element) -> Result<Level> {
        let mut level = Level::new("", self.width, self.height);
        level.properties = map_properties(map)?;
        self.read_children(map, &mut level)?;
        Ok(level)
    }

    fn read_children(&mut self, parent: &Element, level: &mut Level) -> Result<()> {
        for child in &parent.children {
            match child.name.as_str() {
                "layer" => {
                    let layer = self.read_layer(child)?;
                    level.add_layer(layer)?;
                    self.next_z += 1;
                }
                "objectgroup" => {
                    self.read_object_group(child, level)?;
                    self.next_z += 1;
                }
                "imagelayer" => {
                    tracing::trace!("Skipping image layer '{}'", child.attr("name").unwrap_or_default());
                    self.next_z += 1;
                }
                "group" => self.read_children(child, level)?,
                "properties" | "tileset" => {}
                other => tracing::trace!("Ignoring <{other}> in <{}>", parent.name),
            }
        }
        Ok(())
    }

    fn read_layer(&self, element: &Element) -> Result<TileLayer> {
        element.trace_unknown_attributes(LAYER_ATTRIBUTES);
        let name = element.attr("name").unwrap_or_default();

        let width = element.parse_attr::<u32>("width")?.unwrap_or(self.width);
        let height = element.parse_attr::<u32>("height")?.unwrap_or(self.height);
        if (width, height) != (self.width, self.height) {
            return Err(Error::malformed(
                Format::Tmx,
                element.position(),
                format!(
                    "layer '{name}' is {width}x{height} but the map is {}x{}",
                    self.width, self.height
                ),
            ));
        }

        let data = element.child("data").ok_or_else(|| {
            Error::malformed(
                Format::Tmx,
                element.position(),
                format!("layer '{name}' has no <data>"),
            )
        })?;
        let gids = decode_data(data, cell_count(width, height))?;
        let tiles = localize(&gids, &self.firstgids, element)?;

        let mut properties = Attributes::new();
        if let Some(id) = element.parse_attr::<i64>("id")? {
            properties.insert("id".into(), AttributeValue::Int(id));
        }
        if let Some(opacity) = element.parse_attr::<f64>("opacity")? {
            properties.insert("opacity".into(), AttributeValue::Float(opacity));
        }
        if let Some(visible) = element.flag_attr("visible")? {
            properties.insert("visible".into(), AttributeValue::Bool(visible));
        }
        insert_offsets(element, &mut properties)?;
        read_properties(element, &mut properties)?;

        tracing::trace!("Layer '{name}': {} tiles", tiles.len());
        Ok(TileLayer::from_tiles(name, width, height, tiles)?.with_properties(properties))
    }

    fn read_object_group(&self, group: &Element, level: &mut Level) -> Result<()> {
        group.trace_unknown_attributes(&[
            "id", "name", "class", "color", "opacity", "visible", "offsetx", "offsety", "draworder",
        ]);
        let group_name = group.attr("name").unwrap_or_default();

        // Group-level attributes shared by every object in it.
        let mut shared = Attributes::new();
        if let Some(color) = group.attr("color") {
            shared.insert("color".into(), AttributeValue::from(color));
        }
        if let Some(opacity) = group.parse_attr::<f64>("opacity")? {
            shared.insert("opacity".into(), AttributeValue::Float(opacity));
        }
        insert_offsets(group, &mut shared)?;
        if !group_name.is_empty() {
            shared.insert("group".into(), AttributeValue::from(group_name));
        }

        for element in &group.children {
            match element.name.as_str() {
                "object" => {
                    let object = self.read_object(element, group_name, &shared)?;
                    level.add_object(object);
                }
                "properties" => {}
                other => tracing::trace!("Ignoring <{other}> in object group '{group_name}'"),
            }
        }
        Ok(())
    }

    fn read_object(&self, element: &Element, group_name: &str, shared: &Attributes) -> Result<LevelObject> {
        element.trace_unknown_attributes(OBJECT_ATTRIBUTES);

        let kind = ["name", "type", "class"]
            .iter()
            .filter_map(|key| element.attr(key))
            .find(|value| !value.is_empty())
            .unwrap_or(group_name);

        let x = element.parse_attr::<f64>("x")?.unwrap_or(0.0) / self.tile_width;
        let y = element.parse_attr::<f64>("y")?.unwrap_or(0.0) / self.tile_height;
        let mut object = LevelObject::new(kind, x, y).with_z(self.next_z);

        let attributes = &mut object.attributes;
        for key in ["id", "gid"] {
            if let Some(value) = element.parse_attr::<i64>(key)? {
                attributes.insert(key.into(), AttributeValue::Int(value));
            }
        }
        for key in ["width", "height", "rotation"] {
            if let Some(value) = element.parse_attr::<f64>(key)? {
                attributes.insert(key.into(), AttributeValue::Float(value));
            }
        }
        if let Some(visible) = element.flag_attr("visible")? {
            attributes.insert("visible".into(), AttributeValue::Bool(visible));
        }
        attributes.extend(shared.iter().map(|(k, v)| (k.clone(), v.clone())));
        read_properties(element, attributes)?;

        Ok(object)
    }
}

fn map_properties(map: &Element) -> Result<Attributes> {
    let mut properties = Attributes::new();
    for key in ["orientation", "renderorder"] {
        if let Some(value) = map.attr(key) {
            properties.insert(key.into(), AttributeValue::from(value));
        }
    }
    for key in ["width", "height", "tilewidth", "tileheight"] {
        if let Some(value) = map.parse_attr::<i64>(key)? {
            properties.insert(key.into(), AttributeValue::Int(value));
        }
    }
    for key in ["backgroundcolor", "class"] {
        if let Some(value) = map.attr(key) {
            properties.insert(key.into(), AttributeValue::from(value));
        }
    }
    read_properties(map, &mut properties)?;
    Ok(properties)
}

fn insert_offsets(element: &Element, into: &mut Attributes) -> Result<()> {
    for key in ["offsetx", "offsety"] {
        if let Some(offset) = element.parse_attr::<f64>(key)? {
            into.insert(key.into(), AttributeValue::Float(offset));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::common::{Compression, encode_base64};
    use crate::level::EMPTY_TILE;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" tiledversion="1.10.2" orientation="orthogonal" renderorder="right-down"
     width="3" height="2" tilewidth="16" tileheight="8" infinite="0" nextlayerid="5" nextobjectid="3">
 <editorsettings><export target="out.json" format="json"/></editorsettings>
 <properties>
  <property name="music" value="theme.ogg"/>
  <property name="gravity" type="float" value="9.8"/>
 </properties>
 <tileset firstgid="1" source="terrain.tsx"/>
 <tileset firstgid="65" source="props.tsx"/>
 <layer id="1" name="ground" width="3" height="2" opacity="0.5" locked="1">
  <properties><property name="solid" type="bool" value="true"/></properties>
  <data encoding="csv">
1,2,3,
0,0,4
</data>
 </layer>
 <group id="2" name="deco">
  <layer id="3" name="props" width="3" height="2" visible="0">
   <data encoding="csv">65,0,0,0,66,0</data>
  </layer>
 </group>
 <objectgroup id="4" name="actors" color="#ff0000" offsetx="2">
  <object id="1" name="coin" x="32" y="8" width="16" height="16"/>
  <object id="2" type="enemy" x="8" y="4" gid="70">
   <properties><property name="hp" type="int" value="10"/></properties>
   <polygon points="0,0 1,1"/>
  </object>
  <object id="3" x="0" y="0" foo="bar"/>
 </objectgroup>
</map>
"##;

    #[test]
    fn test_sample_map() {
        let level = parse_tmx(SAMPLE.as_bytes()).unwrap();
        assert_eq!(level.dimensions(), (3, 2));
        assert_eq!(level.name, "");

        assert_eq!(level.properties["orientation"], AttributeValue::from("orthogonal"));
        assert_eq!(level.properties["tilewidth"], AttributeValue::Int(16));
        assert_eq!(level.properties["music"], AttributeValue::from("theme.ogg"));
        assert_eq!(level.properties["gravity"], AttributeValue::Float(9.8));

        let names: Vec<_> = level.layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["ground", "props"]);

        let ground = &level.layers()[0];
        assert_eq!(ground.tiles(), &[1, 2, 3, 0, 0, 4]);
        assert_eq!(ground.properties["id"], AttributeValue::Int(1));
        assert_eq!(ground.properties["opacity"], AttributeValue::Float(0.5));
        assert_eq!(ground.properties["solid"], AttributeValue::Bool(true));

        // Second tileset starts at 65.
        let props = &level.layers()[1];
        assert_eq!(props.tiles(), &[1, 0, 0, 0, 2, 0]);
        assert_eq!(props.properties["visible"], AttributeValue::Bool(false));
    }

    #[test]
    fn test_sample_objects() {
        let level = parse_tmx(SAMPLE.as_bytes()).unwrap();
        assert_eq!(level.objects.len(), 3);

        let coin = &level.objects[0];
        assert_eq!(coin.kind, "coin");
        assert_eq!((coin.x, coin.y, coin.z), (2.0, 1.0, Some(2)));
        assert_eq!(coin.attributes["id"], AttributeValue::Int(1));
        assert_eq!(coin.attributes["width"], AttributeValue::Float(16.0));
        assert_eq!(coin.attributes["color"], AttributeValue::from("#ff0000"));
        assert_eq!(coin.attributes["offsetx"], AttributeValue::Float(2.0));
        assert_eq!(coin.attributes["group"], AttributeValue::from("actors"));

        let enemy = &level.objects[1];
        assert_eq!(enemy.kind, "enemy");
        assert_eq!((enemy.x, enemy.y), (0.5, 0.5));
        assert_eq!(enemy.attributes["gid"], AttributeValue::Int(70));
        assert_eq!(enemy.attributes["hp"], AttributeValue::Int(10));

        // Nameless and typeless objects take the group name.
        assert_eq!(level.objects[2].kind, "actors");
    }

    #[test]
    fn test_base64_layers() {
        for (name, compression) in [("zlib", Compression::Zlib), ("gzip", Compression::Gzip)] {
            let text = encode_base64(&[1, 0, 0, 2], compression).unwrap();
            let xml = format!(
                r#"<map width="2" height="2" tilewidth="8" tileheight="8">
<layer name="a" width="2" height="2"><data encoding="base64" compression="{name}">
{text}
</data></layer></map>"#
            );
            let level = parse_tmx(xml.as_bytes()).unwrap();
            assert_eq!(level.layers()[0].tiles(), &[1, EMPTY_TILE, EMPTY_TILE, 2], "{name}");
        }
    }

    #[test]
    fn test_flip_bits_kept() {
        let xml = r#"<map width="1" height="1" tilewidth="8" tileheight="8">
<tileset firstgid="11"/>
<layer name="a"><data encoding="csv">2147483659</data></layer></map>"#;
        let level = parse_tmx(xml.as_bytes()).unwrap();
        assert_eq!(level.layers()[0].tiles(), &[0x8000_0001]);
    }

    #[test]
    fn test_unsupported_maps() {
        let cases = [
            r#"<map width="1" height="1" tilewidth="8" tileheight="8" infinite="1"/>"#,
            r#"<map width="1" height="1" tilewidth="8" tileheight="8">
<layer name="a"><data encoding="base64" compression="zstd">KLUv/SAEIQAAAQAAAA==</data></layer></map>"#,
            r#"<map width="1" height="1" tilewidth="8" tileheight="8">
<properties><property name="p" type="class"/></properties></map>"#,
        ];
        for xml in cases {
            let err = parse_tmx(xml.as_bytes()).unwrap_err();
            assert!(matches!(err, Error::UnsupportedFeature { format: Format::Tmx, .. }), "{xml}");
        }
    }

    #[test]
    fn test_malformed_maps() {
        let cases = [
            "<map width=\"1\"",
            r#"<tileset firstgid="1"/>"#,
            r#"<map height="1" tilewidth="8" tileheight="8"/>"#,
            r#"<map width="x" height="1" tilewidth="8" tileheight="8"/>"#,
            r#"<map width="1" height="1" tilewidth="0" tileheight="8"/>"#,
            r#"<map width="2" height="1" tilewidth="8" tileheight="8"><layer name="a" width="1" height="1"><data encoding="csv">1</data></layer></map>"#,
            r#"<map width="1" height="1" tilewidth="8" tileheight="8"><layer name="a"/></map>"#,
            r#"<map width="1" height="1" tilewidth="8" tileheight="8"><tileset firstgid="0"/>
<layer name="a"><data encoding="csv">1</data></layer></map>"#,
        ];
        for xml in cases {
            let err = parse_tmx(xml.as_bytes()).unwrap_err();
            assert!(matches!(err, Error::MalformedInput { format: Format::Tmx, .. }), "{xml}");
        }
    }

    #[test]
    fn test_zero_firstgid_position() {
        let xml = r#"<map width="1" height="1" tilewidth="8" tileheight="8"><tileset firstgid="0"/></map>"#;
        let err = parse_tmx(xml.as_bytes()).unwrap_err();
        let tileset_at = xml.find("<tileset").unwrap();
        assert!(
            matches!(err, Error::MalformedInput { position: Some(Position::Offset(at)), .. } if at == tileset_at),
            "{err}"
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_unaddressable_map() {
        let xml = r#"<map width="4294967295" height="4294967295" tilewidth="8" tileheight="8">
<layer name="a"><data encoding="base64" compression="zlib">eJxjZGBgAAAACAAC</data></layer></map>"#;
        let err = parse_tmx(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { format: Format::Tmx, .. }), "{err}");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut data = br#"<map width="1" height="1" tilewidth="8" tileheight="8"/>"#.to_vec();
        data[5] = 0xff;
        let err = parse_tmx(&data).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput { position: Some(Position::Offset(5)), .. }
        ));
    }
}
