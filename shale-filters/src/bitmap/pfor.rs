//! P-for-Delta bitmap codecs.
//!
//! Deltas are grouped into cohorts of [`COHORT_SIZE`]. Each cohort stores a
//! one-byte bit width (the minimal width of its largest delta) followed by
//! the deltas bit-packed MSB-first at that width; the trailing partial byte
//! is zero-padded. `FastPfDelta` prefixes the cohort stream with the same
//! partition lookup table used by the fast varint codec.
//!
//! The decoder caps the cohort population by the bytes remaining in the
//! stream. The final cohort may therefore decode trailing zero deltas that
//! were never inserted; the monotonic `base > bit` termination of the query
//! scan makes them harmless.

use super::lookup::{LookupTableBuilder, lookup};
use super::staging::StagingArea;
use shale_bits::bitpacking::{leftmost_one_bit, pack_msb, unpack_msb};

/// Number of deltas per compression group. Must be a multiple of 8.
const COHORT_SIZE: usize = 128;

fn enc_cohort(out: &mut Vec<u8>, cohort: &[u32], cohort_max: u32) {
    let num_bits = leftmost_one_bit(cohort_max);
    out.push(num_bits);
    pack_msb(cohort, num_bits, out);
}

/// Decodes one cohort, advancing `input`. Returns the number of deltas
/// appended to `cohort`, which is zero once the stream is exhausted.
fn dec_cohort(input: &mut &[u8], cohort: &mut Vec<u32>) -> usize {
    cohort.clear();
    let Some((&num_bits, rest)) = input.split_first() else {
        return 0;
    };
    *input = rest;
    if num_bits == 0 {
        // All deltas of the cohort were zero; no payload bytes were written.
        cohort.resize(COHORT_SIZE, 0);
        return COHORT_SIZE;
    }
    if num_bits > 32 {
        return 0; // No encoder produces widths above 32
    }
    let available = 8 * input.len() / usize::from(num_bits);
    let num_keys = COHORT_SIZE.min(available);
    unpack_msb(input, num_bits, num_keys, cohort);
    cohort.len()
}

fn encode_deltas(
    staging: &mut StagingArea,
    out: &mut Vec<u8>,
    mut table: Option<&mut LookupTableBuilder>,
) {
    let mut cohort = Vec::with_capacity(COHORT_SIZE);
    let mut cohort_max = 0u32;
    let mut last_key = 0u32;
    let mut buckets = staging.buckets();
    while let Some((_, bucket_keys)) = buckets.next_bucket() {
        for &key in bucket_keys {
            let dta = key - last_key;
            if let Some(table) = table.as_deref_mut() {
                // Must go before the encoding
                table.add(out, dta);
            }
            cohort.push(dta);
            cohort_max |= dta;
            if cohort.len() == COHORT_SIZE {
                enc_cohort(out, &cohort, cohort_max);
                cohort.clear();
                cohort_max = 0;
            }
            last_key = key;
        }
    }
    if !cohort.is_empty() {
        enc_cohort(out, &cohort, cohort_max);
    }
}

/// Converts the staged keys to the cohort-packed storage representation.
pub(crate) fn encode(staging: &mut StagingArea, out: &mut Vec<u8>) {
    encode_deltas(staging, out, None);
}

/// Converts the staged keys to the cohort-packed representation prefixed by
/// a partition lookup table.
pub(crate) fn encode_fast(staging: &mut StagingArea, out: &mut Vec<u8>) {
    let mut table = LookupTableBuilder::new(out, staging.num_keys());
    encode_deltas(staging, out, Some(&mut table));
    table.finish(out);
}

fn scan(bit: u32, mut input: &[u8], mut base: u32) -> bool {
    let mut cohort = Vec::with_capacity(COHORT_SIZE);
    while !input.is_empty() {
        let num_keys = dec_cohort(&mut input, &mut cohort);
        for &dta in &cohort[..num_keys] {
            base = base.wrapping_add(dta);
            if base == bit {
                return true;
            } else if base > bit {
                return false;
            }
        }
    }
    false
}

/// Returns true iff `bit` is present in a cohort-packed payload.
pub(crate) fn test(bit: u32, _key_bits: u32, payload: &[u8]) -> bool {
    scan(bit, payload, 0)
}

/// Returns true iff `bit` is present in a table-prefixed cohort-packed
/// payload.
pub(crate) fn test_fast(bit: u32, _key_bits: u32, payload: &[u8]) -> bool {
    match lookup(bit, payload) {
        Some((offset, base)) => scan(bit, &payload[offset..], base),
        None => false,
    }
}
