//! Symbol palette for ASCL grids

use crate::error::{Error, Result};
use crate::level::{EMPTY_TILE, Level, TileId};
use std::collections::{BTreeMap, HashMap};

/// The grid alphabet, in assignment order.
pub const SYMBOLS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Grid symbol of the empty tile.
pub const EMPTY_SYMBOL: char = '.';

/// A bijection between grid symbols and non-empty tile ids.
#[derive(Debug, Clone, Default)]
pub(super) struct Palette {
    tiles: BTreeMap<char, TileId>,
    symbols: HashMap<TileId, char>,
}

/// Whether `c` belongs to the grid alphabet (excluding the empty symbol).
pub(super) fn is_symbol(c: char) -> bool {
    c.is_ascii() && SYMBOLS.contains(&(c as u8))
}

impl Palette {
    /// Assign symbols to the level's distinct tile ids in ascending order.
    ///
    /// # Errors
    /// Returns [`Error::PaletteOverflow`] if the level uses more distinct ids
    /// than there are symbols.
    pub(super) fn for_level(level: &Level) -> Result<Self> {
        let ids = level.tile_palette();
        if ids.len() > SYMBOLS.len() {
            return Err(Error::PaletteOverflow {
                distinct: ids.len(),
                capacity: SYMBOLS.len(),
            });
        }

        let mut palette = Palette::default();
        for (&symbol, id) in SYMBOLS.iter().zip(ids) {
            palette.tiles.insert(symbol as char, id);
            palette.symbols.insert(id, symbol as char);
        }
        Ok(palette)
    }

    /// Add one `symbol=id` mapping, rejecting anything that would break the bijection.
    pub(super) fn insert(&mut self, symbol: char, id: TileId) -> std::result::Result<(), String> {
        if !is_symbol(symbol) {
            return Err(format!("'{symbol}' is not a palette symbol"));
        }
        if id == EMPTY_TILE {
            return Err(format!("symbol '{symbol}' maps to the empty tile"));
        }
        if self.tiles.contains_key(&symbol) {
            return Err(format!("duplicate palette symbol '{symbol}'"));
        }
        if let Some(existing) = self.symbols.get(&id) {
            return Err(format!("tile {id} is mapped by both '{existing}' and '{symbol}'"));
        }
        self.tiles.insert(symbol, id);
        self.symbols.insert(id, symbol);
        Ok(())
    }

    pub(super) fn tile_for(&self, symbol: char) -> Option<TileId> {
        if symbol == EMPTY_SYMBOL {
            return Some(EMPTY_TILE);
        }
        self.tiles.get(&symbol).copied()
    }

    pub(super) fn symbol_for(&self, id: TileId) -> Option<char> {
        if id == EMPTY_TILE {
            return Some(EMPTY_SYMBOL);
        }
        self.symbols.get(&id).copied()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Entries in symbol order.
    pub(super) fn entries(&self) -> impl Iterator<Item = (char, TileId)> + '_ {
        self.tiles.iter().map(|(&symbol, &id)| (symbol, id))
    }
}
