//! Helpers shared by more than one format

pub mod tile_data;

pub use tile_data::{Compression, TileDataError, decode_base64, decode_csv, encode_base64};
