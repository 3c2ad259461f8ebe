//! Standard bloom filter block.
//!
//! The byte string layout is `[ bitmap bytes ][ k: u8 ]` where `k` is the
//! number of probes. Queries recover `k` from the trailer so that filters
//! built with different densities remain readable.

use crate::chunk::ChunkType;
use crate::hash::bloom_hash;
use crate::options::FilterOptions;
use shale_common::{Result, verify_arg};

/// Builder for standard bloom filter blocks.
///
/// A builder must be [`reset`](BloomBlock::reset) with the expected key count
/// before keys may be inserted; resetting sizes the underlying bitmap.
/// The bitmap is not shrunk before the next reset, so a single builder can be
/// reused across many tables without reallocating.
pub struct BloomBlock {
    bits_per_key: u32,
    /// Number of hash probes, derived from `bits_per_key`.
    k: u32,
    /// Size of the underlying bitmap in bits.
    bits: u32,
    finished: bool,
    space: Vec<u8>,
}

impl BloomBlock {
    /// Creates a bloom filter block. `bytes_to_reserve` pre-allocates buffer
    /// capacity (plus one byte for the trailer) for call sites that know
    /// their output size up front.
    pub fn new(options: &FilterOptions, bytes_to_reserve: usize) -> Result<Self> {
        verify_arg!(bf_bits_per_key, options.bf_bits_per_key > 0);
        // Round down to reduce probing cost a little bit. 0.69 =~ ln(2).
        let k = ((options.bf_bits_per_key as f64 * 0.69) as u32).clamp(1, 30);
        let mut space = Vec::new();
        if bytes_to_reserve != 0 {
            space.reserve(bytes_to_reserve + 1);
        }
        Ok(Self {
            bits_per_key: options.bf_bits_per_key,
            k,
            bits: 0,
            // Pending further initialization via reset().
            finished: true,
            space,
        })
    }

    /// Re-initialises the filter for `num_keys` insertions, sizing the bitmap
    /// at `bits_per_key` bits per key.
    pub fn reset(&mut self, num_keys: u32) {
        let mut bits = num_keys.saturating_mul(self.bits_per_key);
        // Small n would otherwise see a very high false positive rate.
        if bits < 64 {
            bits = 64;
        }
        let bytes = bits.div_ceil(8);
        self.finished = false;
        self.space.clear();
        self.space.resize(bytes as usize, 0);
        // Remember the number of probes in the trailer.
        self.space.push(self.k as u8);
        self.bits = bytes.saturating_mul(8);
    }

    /// Inserts a key.
    ///
    /// REQUIRES: `reset` has been called, `finish` has not.
    pub fn add_key(&mut self, key: &[u8]) {
        debug_assert!(!self.finished);
        // Double-hashing generates the sequence of probe positions.
        let mut h = bloom_hash(key);
        let delta = h.rotate_right(17);
        for _ in 0..self.k {
            let bit = h % self.bits;
            self.space[(bit / 8) as usize] |= 1 << (bit % 8);
            h = h.wrapping_add(delta);
        }
    }

    /// Finalizes the block and returns its contents, trailer included.
    pub fn finish(&mut self) -> &[u8] {
        debug_assert!(!self.finished);
        self.finished = true;
        &self.space
    }

    /// Total memory held by the builder.
    pub fn memory_usage(&self) -> usize {
        self.space.capacity()
    }

    pub fn chunk_type(&self) -> ChunkType {
        ChunkType::BloomFilter
    }
}

/// Returns `false` iff the target key is guaranteed to not exist in the given
/// bloom filter byte string. Truncated or unrecognised inputs conservatively
/// match everything.
pub fn bloom_key_may_match(key: &[u8], input: &[u8]) -> bool {
    let len = input.len();
    if len < 2 {
        return true; // Consider it a match
    }
    let bits = ((len - 1) * 8) as u32;
    if bits == 0 {
        return true; // Degenerate length wrap
    }

    // Use the encoded k so that filters generated with different
    // parameters remain readable.
    let k = input[len - 1];
    if k > 30 {
        // Reserved for potentially new encodings of short bloom filters.
        return true;
    }

    let mut h = bloom_hash(key);
    let delta = h.rotate_right(17);
    for _ in 0..k {
        let bit = h % bits;
        if input[(bit / 8) as usize] & (1 << (bit % 8)) == 0 {
            return false;
        }
        h = h.wrapping_add(delta);
    }

    true
}
