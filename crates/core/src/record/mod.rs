//! Torrent metadata records and info hash handling.

mod types;

pub use types::*;
