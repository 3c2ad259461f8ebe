//! Varint-based bitmap codecs.
//!
//! Keys are encoded as a monotonically sorted delta stream. `Vb` uses plain
//! byte-oriented varints (VByte). `VbPlus` adds a one-byte fast path for
//! deltas below 255, falling back to `0xff` + varint of `delta - 254`.
//! `FastVbPlus` prefixes the `VbPlus` stream with a partition lookup table
//! for O(1) seeks (see [`super::lookup`]).

use super::lookup::{LookupTableBuilder, lookup};
use super::staging::StagingArea;

/// Appends `value` as a plain varint: 7 payload bits per byte, the high bit
/// flagging a continuation.
pub(crate) fn vb_enc(out: &mut Vec<u8>, mut value: u32) {
    while value > 127 {
        out.push(((value & 127) | 128) as u8);
        value >>= 7;
    }
    out.push((value & 127) as u8);
}

/// Decodes one plain varint, advancing `input` past its bytes.
pub(crate) fn vb_dec(input: &mut &[u8]) -> u32 {
    let mut result = 0u32;
    let mut group = 0u32;
    while let Some((&byte, rest)) = input.split_first() {
        *input = rest;
        // Groups past the fifth would shift out of a u32; skip them rather
        // than trusting corrupt input.
        if group < 5 {
            result |= u32::from(byte & 127) << (7 * group);
        }
        group += 1;
        if byte & 128 == 0 {
            break;
        }
    }
    result
}

/// Appends `value` in the modified varint encoding: a single literal byte
/// when below 255, otherwise `0xff` followed by `vb_enc(value - 254)`.
pub(crate) fn vbp_enc(out: &mut Vec<u8>, value: u32) {
    if value < 255 {
        out.push(value as u8);
    } else {
        out.push(255);
        vb_enc(out, value - 254);
    }
}

/// Decodes one modified varint, advancing `input` past its bytes.
pub(crate) fn vbp_dec(input: &mut &[u8]) -> u32 {
    match input.split_first() {
        Some((&255, rest)) => {
            *input = rest;
            vb_dec(input).wrapping_add(254)
        }
        Some((&byte, rest)) => {
            *input = rest;
            u32::from(byte)
        }
        None => 0,
    }
}

fn encode_deltas(staging: &mut StagingArea, out: &mut Vec<u8>, enc: fn(&mut Vec<u8>, u32)) {
    let mut last_key = 0u32;
    let mut buckets = staging.buckets();
    while let Some((_, bucket_keys)) = buckets.next_bucket() {
        for &key in bucket_keys {
            enc(out, key - last_key);
            last_key = key;
        }
    }
}

/// Converts the staged keys to the plain varint storage representation.
pub(crate) fn encode_vb(staging: &mut StagingArea, out: &mut Vec<u8>) {
    encode_deltas(staging, out, vb_enc);
}

/// Converts the staged keys to the modified varint storage representation.
pub(crate) fn encode_vbp(staging: &mut StagingArea, out: &mut Vec<u8>) {
    encode_deltas(staging, out, vbp_enc);
}

/// Converts the staged keys to the modified varint representation prefixed
/// by a partition lookup table.
pub(crate) fn encode_fast_vbp(staging: &mut StagingArea, out: &mut Vec<u8>) {
    let mut table = LookupTableBuilder::new(out, staging.num_keys());
    let mut last_key = 0u32;
    let mut buckets = staging.buckets();
    while let Some((_, bucket_keys)) = buckets.next_bucket() {
        for &key in bucket_keys {
            let dta = key - last_key;
            // Must go before the encoding
            table.add(out, dta);
            vbp_enc(out, dta);
            last_key = key;
        }
    }
    table.finish(out);
}

fn scan(bit: u32, mut input: &[u8], mut base: u32, dec: fn(&mut &[u8]) -> u32) -> bool {
    while !input.is_empty() {
        base = base.wrapping_add(dec(&mut input));
        if base == bit {
            return true;
        } else if base > bit {
            return false;
        }
    }
    false
}

/// Returns true iff `bit` is present in a plain varint payload.
pub(crate) fn test_vb(bit: u32, _key_bits: u32, payload: &[u8]) -> bool {
    scan(bit, payload, 0, vb_dec)
}

/// Returns true iff `bit` is present in a modified varint payload.
pub(crate) fn test_vbp(bit: u32, _key_bits: u32, payload: &[u8]) -> bool {
    scan(bit, payload, 0, vbp_dec)
}

/// Returns true iff `bit` is present in a table-prefixed modified varint
/// payload.
pub(crate) fn test_fast_vbp(bit: u32, _key_bits: u32, payload: &[u8]) -> bool {
    match lookup(bit, payload) {
        Some((offset, base)) => scan(bit, &payload[offset..], base, vbp_dec),
        None => false,
    }
}
