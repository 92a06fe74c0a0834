//! ASCL text reading

use super::palette::{Palette, is_symbol};
use super::syntax::{KEYWORDS, parse_value, tokenize, unquote};
use crate::error::{Error, Position, Result};
use crate::formats::Format;
use crate::level::{Attributes, Level, LevelObject, TileId, TileLayer};

/// Parse ASCL text into a [`Level`].
///
/// # Errors
/// Returns [`Error::MalformedInput`] with the offending line number.
pub fn parse_ascl(data: &[u8]) -> Result<Level> {
    let text = std::str::from_utf8(data).map_err(|e| {
        let line = data[..e.valid_up_to()].iter().filter(|&&b| b == b'\n').count() + 1;
        malformed(line, "input is not valid UTF-8")
    })?;

    let mut parser = Parser::default();
    let mut last_line = 0;
    for (index, line) in text.lines().enumerate() {
        last_line = index + 1;
        parser.line(last_line, line)?;
    }
    parser.finish(last_line.max(1))
}

/// A layer whose grid is still being read.
struct PendingLayer {
    name: String,
    properties: Attributes,
    tiles: Vec<TileId>,
    rows: u32,
}

#[derive(Default)]
struct Parser {
    name: Option<String>,
    size: Option<(u32, u32)>,
    palette: Palette,
    properties: Attributes,
    layers: Vec<TileLayer>,
    current: Option<PendingLayer>,
    /// Set once the `objects` section starts.
    objects: Option<Vec<LevelObject>>,
}

impl Parser {
    fn line(&mut self, number: usize, line: &str) -> Result<()> {
        let tokens = tokenize(line).map_err(|reason| malformed(number, reason))?;
        let Some(first) = tokens.first() else {
            return Ok(());
        };

        if let Some(objects) = &mut self.objects {
            if first != "object" {
                return Err(malformed(
                    number,
                    format!("expected 'object' in the objects section, found '{first}'"),
                ));
            }
            objects.push(parse_object(number, &tokens)?);
            return Ok(());
        }

        if self.wants_row() && !KEYWORDS.contains(&first.as_str()) {
            return self.row(number, &tokens);
        }

        match first.as_str() {
            "name" => {
                self.header_only(number, first)?;
                let [_, name] = tokens.as_slice() else {
                    return Err(malformed(number, "expected: name \"<title>\""));
                };
                let name = unquote(name).ok_or_else(|| malformed(number, "level name must be a quoted string"))?;
                if self.name.replace(name).is_some() {
                    return Err(malformed(number, "duplicate 'name' directive"));
                }
            }
            "size" => {
                self.header_only(number, first)?;
                let [_, width, height] = tokens.as_slice() else {
                    return Err(malformed(number, "expected: size <width> <height>"));
                };
                let width = parse_dimension(number, width)?;
                let height = parse_dimension(number, height)?;
                if self.size.replace((width, height)).is_some() {
                    return Err(malformed(number, "duplicate 'size' directive"));
                }
            }
            "palette" => {
                self.header_only(number, first)?;
                for entry in &tokens[1..] {
                    self.palette_entry(number, entry)?;
                }
            }
            "property" => {
                let target = match &mut self.current {
                    Some(layer) if layer.rows > 0 => {
                        return Err(malformed(
                            number,
                            format!("properties of layer '{}' must precede its grid", layer.name),
                        ));
                    }
                    Some(layer) => &mut layer.properties,
                    None => &mut self.properties,
                };
                if tokens.len() < 2 {
                    return Err(malformed(number, "expected: property <key>=<value>"));
                }
                for pair in &tokens[1..] {
                    let (key, value) = parse_pair(number, pair)?;
                    if target.insert(key.clone(), value).is_some() {
                        return Err(malformed(number, format!("duplicate property '{key}'")));
                    }
                }
            }
            "layer" => {
                self.close_layer(number)?;
                self.require_size(number)?;
                let [_, name] = tokens.as_slice() else {
                    return Err(malformed(number, "expected: layer \"<name>\""));
                };
                let name = unquote(name).ok_or_else(|| malformed(number, "layer name must be a quoted string"))?;
                self.current = Some(PendingLayer {
                    name,
                    properties: Attributes::new(),
                    tiles: Vec::new(),
                    rows: 0,
                });
            }
            "objects" => {
                if tokens.len() != 1 {
                    return Err(malformed(number, "'objects' takes no arguments"));
                }
                self.close_layer(number)?;
                self.require_size(number)?;
                self.objects = Some(Vec::new());
            }
            "object" => {
                return Err(malformed(number, "'object' outside the objects section"));
            }
            other => {
                return Err(match &self.current {
                    Some(layer) if other.chars().all(|c| is_symbol(c) || c == '.') => malformed(
                        number,
                        format!("layer '{}' has more than {} rows", layer.name, self.rows_needed()),
                    ),
                    _ => malformed(number, format!("unknown directive '{other}'")),
                });
            }
        }
        Ok(())
    }

    fn finish(mut self, last_line: usize) -> Result<Level> {
        self.close_layer(last_line)?;
        let (width, height) = self.require_size(last_line)?;

        let mut level = Level::new(self.name.unwrap_or_default(), width, height);
        level.properties = self.properties;
        for layer in self.layers {
            level
                .add_layer(layer)
                .map_err(|e| malformed(last_line, e.to_string()))?;
        }
        level.objects = self.objects.unwrap_or_default();

        tracing::debug!(
            "Parsed ASCL level '{}': {}x{}, {} layers, {} objects",
            level.name,
            width,
            height,
            level.layers().len(),
            level.objects.len()
        );
        Ok(level)
    }

    /// Rows per layer. Degenerate grids have no rows at all.
    fn rows_needed(&self) -> u32 {
        match self.size {
            Some((width, height)) if width > 0 => height,
            _ => 0,
        }
    }

    fn wants_row(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|layer| layer.rows < self.rows_needed())
    }

    fn row(&mut self, number: usize, tokens: &[String]) -> Result<()> {
        let width = self.size.map_or(0, |(width, _)| width) as usize;
        let [row] = tokens else {
            return Err(malformed(number, "grid rows cannot contain whitespace"));
        };
        let length = row.chars().count();
        if length != width {
            return Err(malformed(
                number,
                format!("grid row has length {length}, expected {width}"),
            ));
        }

        let mut tiles = Vec::with_capacity(width);
        for symbol in row.chars() {
            let tile = self.palette.tile_for(symbol).ok_or_else(|| {
                if is_symbol(symbol) {
                    malformed(number, format!("symbol '{symbol}' is not in the palette"))
                } else {
                    malformed(number, format!("invalid tile symbol '{symbol}'"))
                }
            })?;
            tiles.push(tile);
        }

        if let Some(layer) = &mut self.current {
            layer.tiles.extend(tiles);
            layer.rows += 1;
        }
        Ok(())
    }

    fn close_layer(&mut self, number: usize) -> Result<()> {
        let Some(layer) = self.current.take() else {
            return Ok(());
        };
        let needed = self.rows_needed();
        if layer.rows != needed {
            return Err(malformed(
                number,
                format!("layer '{}' has {} rows, expected {needed}", layer.name, layer.rows),
            ));
        }

        let (width, height) = self.size.unwrap_or_default();
        let grid = if needed == 0 {
            TileLayer::new(layer.name, width, height)
        } else {
            TileLayer::from_tiles(layer.name, width, height, layer.tiles)
                .map_err(|e| malformed(number, e.to_string()))?
        };
        self.layers.push(grid.with_properties(layer.properties));
        Ok(())
    }

    fn header_only(&self, number: usize, directive: &str) -> Result<()> {
        if self.current.is_some() || !self.layers.is_empty() {
            return Err(malformed(
                number,
                format!("'{directive}' must appear before the first layer"),
            ));
        }
        Ok(())
    }

    fn require_size(&self, number: usize) -> Result<(u32, u32)> {
        self.size
            .ok_or_else(|| malformed(number, "missing 'size' directive"))
    }

    fn palette_entry(&mut self, number: usize, entry: &str) -> Result<()> {
        let Some((symbol, id)) = entry.split_once('=') else {
            return Err(malformed(number, format!("palette entry '{entry}' is not <symbol>=<id>")));
        };
        let mut chars = symbol.chars();
        let (Some(symbol), None) = (chars.next(), chars.next()) else {
            return Err(malformed(number, format!("palette symbol '{symbol}' is not one character")));
        };
        let id: TileId = id
            .parse()
            .map_err(|_| malformed(number, format!("invalid tile id '{id}' in palette")))?;
        self.palette
            .insert(symbol, id)
            .map_err(|reason| malformed(number, reason))
    }
}

fn parse_object(number: usize, tokens: &[String]) -> Result<LevelObject> {
    let [_, kind, x, y, pairs @ ..] = tokens else {
        return Err(malformed(number, "expected: object \"<type>\" <x> <y> [key=value...]"));
    };
    let kind = unquote(kind).ok_or_else(|| malformed(number, "object type must be a quoted string"))?;
    let x = parse_coordinate(number, x)?;
    let y = parse_coordinate(number, y)?;
    let mut object = LevelObject::new(kind, x, y);

    for pair in pairs {
        if let Some(z) = pair.strip_prefix("z=") {
            if object.z.is_some() {
                return Err(malformed(number, "duplicate z"));
            }
            object.z = Some(
                z.parse()
                    .map_err(|_| malformed(number, format!("invalid z '{z}'")))?,
            );
            continue;
        }
        let (key, value) = parse_pair(number, pair)?;
        if object.attributes.insert(key.clone(), value).is_some() {
            return Err(malformed(number, format!("duplicate attribute '{key}'")));
        }
    }
    Ok(object)
}

fn parse_pair(number: usize, pair: &str) -> Result<(String, crate::level::AttributeValue)> {
    let Some((key, raw)) = pair.split_once('=') else {
        return Err(malformed(number, format!("'{pair}' is not <key>=<value>")));
    };
    if key.is_empty() {
        return Err(malformed(number, format!("empty key in '{pair}'")));
    }
    let value = parse_value(raw)
        .ok_or_else(|| malformed(number, format!("invalid value '{raw}' for '{key}'")))?;
    Ok((key.to_string(), value))
}

fn parse_dimension(number: usize, token: &str) -> Result<u32> {
    token
        .parse()
        .map_err(|_| malformed(number, format!("invalid dimension '{token}'")))
}

fn parse_coordinate(number: usize, token: &str) -> Result<f64> {
    token
        .parse()
        .map_err(|_| malformed(number, format!("invalid coordinate '{token}'")))
}

fn malformed(line: usize, reason: impl Into<String>) -> Error {
    Error::malformed(Format::Ascl, Some(Position::Line(line)), reason)
}
