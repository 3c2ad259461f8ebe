//! Per-table membership filters for the shale particle store.
//!
//! Every epoch of ingest produces immutable sorted tables, and each table
//! carries a compact filter byte string answering "could key K be present in
//! this table?". Two filter families are provided:
//!
//! - [`BloomBlock`]: a standard double-hashing bloom filter with a
//!   configurable false-positive rate and no false negatives.
//! - [`BitmapBlock`]: an exact-membership bitmap over a bounded integer key
//!   domain, with no false positives either, available in seven on-disk
//!   encodings (see [`BitmapFormat`]).
//!
//! Builders follow a `reset` / `add_key` / `finish` lifecycle and emit a
//! self-contained byte string with a self-describing trailer. The query side
//! ([`bloom_key_may_match`], [`bitmap_key_must_match`]) operates on the byte
//! string alone and never requires the builder that produced it.

pub mod bitmap;
pub mod block;
pub mod bloom;
pub mod chunk;
pub mod hash;
pub mod options;


pub use bitmap::{BitmapBlock, BitmapFormat, bitmap_key_must_match};
pub use block::{EmptyFilterBlock, FilterBlock, new_filter_block};
pub use bloom::{BloomBlock, bloom_key_may_match};
pub use chunk::ChunkType;
pub use options::{FilterKind, FilterOptions};
