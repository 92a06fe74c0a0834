//! Run-length coding of ULX layer payloads
//!
//! A payload is a sequence of little-endian `(u16 run, u16 tile)` pairs.
//! Runs are never zero and never cross the end of the grid.

use crate::level::TileId;
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

const PAIR_SIZE: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub(super) enum RleError {
    #[error("RLE payload of {0} bytes is not a whole number of runs")]
    Unaligned(usize),

    #[error("zero-length run")]
    ZeroRun { offset: usize },

    #[error("RLE runs overflow the {cells}-cell grid")]
    Overflow { offset: usize, cells: usize },

    #[error("RLE runs cover {decoded} of {cells} cells")]
    Underflow { decoded: usize, cells: usize, offset: usize },
}

impl RleError {
    /// Byte offset within the payload where the problem was found.
    pub(super) fn offset(&self) -> usize {
        match self {
            RleError::Unaligned(len) => len - len % PAIR_SIZE,
            RleError::ZeroRun { offset } | RleError::Overflow { offset, .. } | RleError::Underflow { offset, .. } => {
                *offset
            }
        }
    }
}

/// Encode tiles as run pairs.
pub(super) fn encode(tiles: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < tiles.len() {
        let tile = tiles[start];
        let run = tiles[start..]
            .iter()
            .take(usize::from(u16::MAX))
            .take_while(|&&t| t == tile)
            .count();

        let mut pair = [0u8; PAIR_SIZE];
        LittleEndian::write_u16(&mut pair[0..2], run as u16);
        LittleEndian::write_u16(&mut pair[2..4], tile);
        out.extend_from_slice(&pair);
        start += run;
    }
    out
}

/// Decode run pairs into exactly `cells` tiles.
///
/// The runs are validated before anything is allocated, so the output never
/// grows past the grid.
pub(super) fn decode(payload: &[u8], cells: usize) -> Result<Vec<TileId>, RleError> {
    if payload.len() % PAIR_SIZE != 0 {
        return Err(RleError::Unaligned(payload.len()));
    }

    let mut total = 0usize;
    for (index, pair) in payload.chunks_exact(PAIR_SIZE).enumerate() {
        let offset = index * PAIR_SIZE;
        let run = usize::from(LittleEndian::read_u16(&pair[0..2]));
        if run == 0 {
            return Err(RleError::ZeroRun { offset });
        }
        total += run;
        if total > cells {
            return Err(RleError::Overflow { offset, cells });
        }
    }
    if total != cells {
        return Err(RleError::Underflow {
            decoded: total,
            cells,
            offset: payload.len(),
        });
    }

    let mut tiles = Vec::with_capacity(cells);
    for pair in payload.chunks_exact(PAIR_SIZE) {
        let run = usize::from(LittleEndian::read_u16(&pair[0..2]));
        let tile = TileId::from(LittleEndian::read_u16(&pair[2..4]));
        tiles.extend(std::iter::repeat_n(tile, run));
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs() {
        let payload = encode(&[5, 5, 5, 0, 7, 7]);
        assert_eq!(payload, vec![3, 0, 5, 0, 1, 0, 0, 0, 2, 0, 7, 0]);
        assert_eq!(decode(&payload, 6).unwrap(), vec![5, 5, 5, 0, 7, 7]);
    }

    #[test]
    fn test_long_runs_split() {
        let tiles = vec![1u16; 70_000];
        let payload = encode(&tiles);
        assert_eq!(payload.len(), 8);
        assert_eq!(decode(&payload, 70_000).unwrap().len(), 70_000);
    }

    #[test]
    fn test_overflow_and_underflow() {
        let payload = encode(&[1, 1, 1]);
        assert_eq!(decode(&payload, 2), Err(RleError::Overflow { offset: 0, cells: 2 }));
        assert!(matches!(
            decode(&payload, 4),
            Err(RleError::Underflow { decoded: 3, cells: 4, .. })
        ));
    }

    #[test]
    fn test_zero_run_and_alignment() {
        assert_eq!(decode(&[0, 0, 1, 0], 1), Err(RleError::ZeroRun { offset: 0 }));
        assert_eq!(decode(&[1, 0, 1], 1), Err(RleError::Unaligned(3)));
        assert_eq!(decode(&[], 0).unwrap(), Vec::<TileId>::new());
    }
}
