//! The 32-bit hash feeding the bloom filter's double-hashing scheme.
//!
//! The algorithm and seed are pinned by the on-disk filter format: changing
//! either would silently invalidate every filter byte string already written
//! by earlier deployments. Do not swap this for another hash function.

/// Seed for the bloom filter hash. Part of the on-disk format.
const BLOOM_HASH_SEED: u32 = 0xbc9f1d34;

/// Hashes `key` for bloom filter probing.
#[inline]
pub fn bloom_hash(key: &[u8]) -> u32 {
    hash(key, BLOOM_HASH_SEED)
}

/// Seeded 32-bit hash over a byte string: 4-byte little-endian words folded
/// with a fixed multiplier, then a tail and a final avalanche.
pub fn hash(data: &[u8], seed: u32) -> u32 {
    const M: u32 = 0xc6a4_a793;
    const R: u32 = 24;

    let mut h = seed ^ (data.len() as u32).wrapping_mul(M);

    let mut words = data.chunks_exact(4);
    for word in words.by_ref() {
        let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        h = h.wrapping_add(w);
        h = h.wrapping_mul(M);
        h ^= h >> 16;
    }

    let tail = words.remainder();
    if tail.len() >= 3 {
        h = h.wrapping_add(u32::from(tail[2]) << 16);
    }
    if tail.len() >= 2 {
        h = h.wrapping_add(u32::from(tail[1]) << 8);
    }
    if !tail.is_empty() {
        h = h.wrapping_add(u32::from(tail[0]));
        h = h.wrapping_mul(M);
        h ^= h >> R;
    }

    h
}
