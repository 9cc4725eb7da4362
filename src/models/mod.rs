//! Data models
//!
//! Trigrams, hexagrams, selection records and characteristic descriptors.

pub mod characteristic;
pub mod hexagram;
pub mod selection;
pub mod trigram;

pub use characteristic::HexagramCharacteristic;
pub use hexagram::{HEXAGRAM_COUNT, LINES_PER_HEXAGRAM, OracleLine, TrigramPair};
pub use selection::SelectionRecord;
pub use trigram::Trigram;
