//! Roaring-style bucketised bitmap codec.
//!
//! Layout: a 4-byte little-endian bucket count, one 1-byte key count per
//! bucket, then for each bucket in index order its keys' low bytes sorted
//! ascending. Queries prefix-sum the headers to locate the target bucket's
//! slice and scan it with early exit.

use super::staging::StagingArea;

/// Converts the staged keys to the roaring storage representation.
pub(crate) fn encode(staging: &mut StagingArea, out: &mut Vec<u8>) {
    let num_buckets = staging.num_buckets();
    // Remember the total number of buckets
    out.extend_from_slice(&(num_buckets as u32).to_le_bytes());
    // Reserve buffer space for the bucket headers, one byte each
    out.resize(4 + num_buckets, 0);
    let mut buckets = staging.buckets();
    while let Some((index, bucket_keys)) = buckets.next_bucket() {
        // The on-disk header is one byte; callers keep bucket populations
        // (duplicates included) within it.
        debug_assert!(bucket_keys.len() <= 255);
        out[4 + index] = bucket_keys.len() as u8;
        for &key in bucket_keys {
            out.push((key & 255) as u8);
        }
    }
}

/// Returns true iff `bit` is present in a roaring payload.
pub(crate) fn test(bit: u32, _key_bits: u32, payload: &[u8]) -> bool {
    if payload.len() < 4 {
        return false; // Too short to be valid
    }
    let num_buckets =
        u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    let input = &payload[4..];
    if input.len() < num_buckets {
        return false; // Premature end of buffer space
    }

    let bucket_index = (bit >> 8) as usize;
    if bucket_index >= num_buckets {
        return false; // No such bucket
    }
    let mut bucket_start = 0usize;
    let mut bucket_end = 0usize;
    for &count in &input[..=bucket_index] {
        bucket_start = bucket_end;
        bucket_end += count as usize;
    }

    // Search within the target bucket
    let keys = &input[num_buckets..];
    if keys.len() >= bucket_end {
        let target = (bit & 255) as u8;
        for &key in &keys[bucket_start..bucket_end] {
            if key > target {
                return false;
            } else if key == target {
                return true;
            }
        }
    }

    false
}
