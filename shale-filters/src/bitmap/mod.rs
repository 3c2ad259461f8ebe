//! Exact-membership bitmap filters over a bounded integer key domain.
//!
//! Unlike bloom filters, bitmap filters are designed with no false positives:
//! a key either is in the table or the filter says it is not. The price is a
//! bounded domain — keys are mapped to `[0, 2^key_bits)` via
//! [`bitmap_index`] — and a byte size that depends on key density, which the
//! seven interchangeable on-disk encodings of [`BitmapFormat`] trade against
//! query cost.
//!
//! The byte string layout is `[ codec payload ][ key_bits: u8 ][ format: u8 ]`.
//! The two-byte trailer is the only contract between builder and tester.

pub(crate) mod lookup;
pub(crate) mod pfor;
pub(crate) mod roaring;
pub(crate) mod staging;
pub(crate) mod uncompressed;
pub(crate) mod varint;

use crate::chunk::ChunkType;
use crate::options::FilterOptions;
use shale_common::{Result, verify_arg};
use staging::StagingArea;

/// On-disk bitmap encodings. The numeric assignments are stable storage
/// values and must not be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BitmapFormat {
    /// Raw bit array over the whole domain.
    Uncompressed = 0,
    /// Modified varint deltas behind a partition lookup table.
    FastVbPlus = 1,
    /// Modified varint deltas (one-byte fast path below 255).
    VbPlus = 2,
    /// Plain varint deltas.
    Vb = 3,
    /// Bit-packed delta cohorts behind a partition lookup table.
    FastPfDelta = 4,
    /// Bit-packed delta cohorts.
    PfDelta = 5,
    /// Bucketised low-byte lists with a prefix-sum header.
    Roaring = 6,
}

impl BitmapFormat {
    /// Tests a decoded payload (trailer stripped) for the presence of `bit`.
    fn test(self, bit: u32, key_bits: u32, payload: &[u8]) -> bool {
        match self {
            BitmapFormat::Uncompressed => uncompressed::test(bit, key_bits, payload),
            BitmapFormat::FastVbPlus => varint::test_fast_vbp(bit, key_bits, payload),
            BitmapFormat::VbPlus => varint::test_vbp(bit, key_bits, payload),
            BitmapFormat::Vb => varint::test_vb(bit, key_bits, payload),
            BitmapFormat::FastPfDelta => pfor::test_fast(bit, key_bits, payload),
            BitmapFormat::PfDelta => pfor::test(bit, key_bits, payload),
            BitmapFormat::Roaring => roaring::test(bit, key_bits, payload),
        }
    }
}

impl TryFrom<u8> for BitmapFormat {
    type Error = ();

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(BitmapFormat::Uncompressed),
            1 => Ok(BitmapFormat::FastVbPlus),
            2 => Ok(BitmapFormat::VbPlus),
            3 => Ok(BitmapFormat::Vb),
            4 => Ok(BitmapFormat::FastPfDelta),
            5 => Ok(BitmapFormat::PfDelta),
            6 => Ok(BitmapFormat::Roaring),
            _ => Err(()),
        }
    }
}

/// Interprets the first `min(4, key.len())` bytes of a key as a zero-padded
/// little-endian u32. Keys longer than 4 bytes silently lose their tail;
/// callers are expected to supply keys already mapped into the 4-byte domain.
pub fn bitmap_index(key: &[u8]) -> u32 {
    let mut tmp = [0u8; 4];
    let n = key.len().min(4);
    tmp[..n].copy_from_slice(&key[..n]);
    u32::from_le_bytes(tmp)
}

/// Builder for bitmap filter blocks in any [`BitmapFormat`].
///
/// A builder must be [`reset`](BitmapBlock::reset) with the expected key
/// count before keys may be inserted; the count sizes the staging area for
/// the table's estimated density. Buffers are reused across resets.
pub struct BitmapBlock {
    key_bits: u32,
    mask: u32,
    format: BitmapFormat,
    /// Staging for the compressed formats; unused by `Uncompressed`, which
    /// sets bits directly in the output.
    staging: StagingArea,
    space: Vec<u8>,
    finished: bool,
}

impl BitmapBlock {
    /// Creates a bitmap filter block for the domain and format configured in
    /// `options`. `bytes_to_reserve` pre-allocates output capacity (plus two
    /// bytes for the trailer).
    pub fn new(options: &FilterOptions, bytes_to_reserve: usize) -> Result<Self> {
        verify_arg!(
            bm_key_bits,
            options.bm_key_bits >= 8 && options.bm_key_bits <= 24
        );
        let mut space = Vec::new();
        if bytes_to_reserve != 0 {
            space.reserve(bytes_to_reserve + 2);
        }
        Ok(Self {
            key_bits: options.bm_key_bits,
            mask: (1u32 << options.bm_key_bits) - 1,
            format: options.bm_fmt,
            staging: StagingArea::new(options.bm_key_bits),
            space,
            finished: true, // Pending further initialization via reset()
        })
    }

    /// Re-initialises the filter for `num_keys` insertions.
    pub fn reset(&mut self, num_keys: u32) {
        self.finished = false;
        match self.format {
            BitmapFormat::Uncompressed => uncompressed::reset(self.key_bits, &mut self.space),
            _ => {
                self.space.clear();
                self.staging.reset(num_keys);
            }
        }
    }

    /// Inserts a key (1 to 4 meaningful bytes, see [`bitmap_index`]). The
    /// index is truncated to the configured domain before insertion.
    ///
    /// REQUIRES: `reset` has been called, `finish` has not.
    pub fn add_key(&mut self, key: &[u8]) {
        debug_assert!(!self.finished);
        let i = bitmap_index(key) & self.mask;
        match self.format {
            BitmapFormat::Uncompressed => uncompressed::set(i, &mut self.space),
            _ => self.staging.set(i),
        }
    }

    /// Converts the staged keys to the on-disk representation, appends the
    /// `(key_bits, format)` trailer and returns the full byte string.
    pub fn finish(&mut self) -> &[u8] {
        debug_assert!(!self.finished);
        self.finished = true;
        match self.format {
            BitmapFormat::Uncompressed => {}
            BitmapFormat::FastVbPlus => varint::encode_fast_vbp(&mut self.staging, &mut self.space),
            BitmapFormat::VbPlus => varint::encode_vbp(&mut self.staging, &mut self.space),
            BitmapFormat::Vb => varint::encode_vb(&mut self.staging, &mut self.space),
            BitmapFormat::FastPfDelta => pfor::encode_fast(&mut self.staging, &mut self.space),
            BitmapFormat::PfDelta => pfor::encode(&mut self.staging, &mut self.space),
            BitmapFormat::Roaring => roaring::encode(&mut self.staging, &mut self.space),
        }
        // Remember the size of the domain space and the bitmap format
        self.space.push(self.key_bits as u8);
        self.space.push(self.format as u8);
        &self.space
    }

    /// Total memory held by the builder.
    pub fn memory_usage(&self) -> usize {
        self.staging.memory_usage() + self.space.capacity()
    }

    pub fn chunk_type(&self) -> ChunkType {
        ChunkType::BitmapFilter
    }
}

/// Returns true iff the target key matches the given bitmap filter byte
/// string. Bitmap filters have no false positives; truncated inputs match
/// nothing, while unknown format codes conservatively match everything.
pub fn bitmap_key_must_match(key: &[u8], input: &[u8]) -> bool {
    let len = input.len();
    if len < 2 {
        return false; // Empty bitmap
    }

    let payload = &input[..len - 2];
    // Recover the domain space
    let key_bits = u32::from(input[len - 2]);
    let i = bitmap_index(key);
    if key_bits < 32 && i >= 1u32 << key_bits {
        return false; // Out of bound
    }

    match BitmapFormat::try_from(input[len - 1]) {
        Ok(format) => format.test(i, key_bits, payload),
        // Consider it a match for unknown formats
        Err(()) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FORMATS: [BitmapFormat; 7] = [
        BitmapFormat::Uncompressed,
        BitmapFormat::FastVbPlus,
        BitmapFormat::VbPlus,
        BitmapFormat::Vb,
        BitmapFormat::FastPfDelta,
        BitmapFormat::PfDelta,
        BitmapFormat::Roaring,
    ];

    fn build(format: BitmapFormat, key_bits: u32, keys: &[u32]) -> Vec<u8> {
        let options = FilterOptions {
            bm_key_bits: key_bits,
            bm_fmt: format,
            ..Default::default()
        };
        let mut block = BitmapBlock::new(&options, 0).unwrap();
        block.reset(keys.len() as u32);
        for &key in keys {
            block.add_key(&key.to_le_bytes());
        }
        block.finish().to_vec()
    }

    #[test]
    fn format_codes_round_trip() {
        for format in ALL_FORMATS {
            assert_eq!(BitmapFormat::try_from(format as u8), Ok(format));
        }
        assert_eq!(BitmapFormat::try_from(7), Err(()));
        assert_eq!(BitmapFormat::try_from(255), Err(()));
    }

    #[test]
    fn on_disk_assignments_are_stable() {
        assert_eq!(BitmapFormat::Uncompressed as u8, 0);
        assert_eq!(BitmapFormat::FastVbPlus as u8, 1);
        assert_eq!(BitmapFormat::VbPlus as u8, 2);
        assert_eq!(BitmapFormat::Vb as u8, 3);
        assert_eq!(BitmapFormat::FastPfDelta as u8, 4);
        assert_eq!(BitmapFormat::PfDelta as u8, 5);
        assert_eq!(BitmapFormat::Roaring as u8, 6);
    }

    #[test]
    fn key_to_index_conversion() {
        assert_eq!(bitmap_index(&[]), 0);
        assert_eq!(bitmap_index(&[0x01]), 1);
        assert_eq!(bitmap_index(&[0x01, 0x02]), 0x0201);
        assert_eq!(bitmap_index(&[0x01, 0x02, 0x03, 0x04]), 0x0403_0201);
        // Bytes past the fourth are ignored.
        assert_eq!(bitmap_index(&[0x01, 0x02, 0x03, 0x04, 0xff]), 0x0403_0201);
    }

    #[test]
    fn uncompressed_trailer_and_bounds() {
        let contents = build(BitmapFormat::Uncompressed, 24, &[0, 7, 8, 0xff_ffff]);
        assert_eq!(contents.len(), (1 << 24) / 8 + 2);
        assert_eq!(contents[contents.len() - 2], 0x18);
        assert_eq!(contents[contents.len() - 1], 0x00);

        for key in [0u32, 7, 8, 0xff_ffff] {
            assert!(bitmap_key_must_match(&key.to_le_bytes(), &contents));
        }
        assert!(!bitmap_key_must_match(&1u32.to_le_bytes(), &contents));
        assert!(!bitmap_key_must_match(&0x0100_0000u32.to_le_bytes(), &contents));
    }

    #[test]
    fn trailer_identifies_every_format() {
        for format in ALL_FORMATS {
            let contents = build(format, 16, &[1, 2, 3]);
            assert_eq!(contents[contents.len() - 2], 16);
            assert_eq!(contents[contents.len() - 1], format as u8);
        }
    }

    #[test]
    fn out_of_domain_keys_never_match() {
        for format in ALL_FORMATS {
            let contents = build(format, 16, &[0, 1, 65535]);
            for key in [65536u32, 100_000, u32::MAX] {
                assert!(
                    !bitmap_key_must_match(&key.to_le_bytes(), &contents),
                    "format {format:?} matched out-of-domain key {key}"
                );
            }
        }
    }

    #[test]
    fn short_inputs_match_nothing() {
        assert!(!bitmap_key_must_match(b"k", &[]));
        assert!(!bitmap_key_must_match(b"k", &[0x18]));
    }

    #[test]
    fn unknown_formats_match_everything() {
        let input = [0x00, 0x18, 0x29];
        assert!(bitmap_key_must_match(&7u32.to_le_bytes(), &input));
    }

    #[test]
    fn domain_is_masked_on_insert() {
        // Keys above the domain are truncated to their low key_bits on
        // insert, exactly like the stored representation expects.
        let contents = build(BitmapFormat::Vb, 16, &[0x1_0005]);
        assert!(bitmap_key_must_match(&5u32.to_le_bytes(), &contents));
        // The original (untruncated) key misses the domain check.
        assert!(!bitmap_key_must_match(&0x1_0005u32.to_le_bytes(), &contents));
    }

    #[test]
    fn builder_reuse_produces_identical_bytes() {
        for format in ALL_FORMATS {
            let options = FilterOptions {
                bm_key_bits: 16,
                bm_fmt: format,
                ..Default::default()
            };
            let mut block = BitmapBlock::new(&options, 0).unwrap();
            let keys = [5u32, 99, 256, 300, 40000];

            block.reset(keys.len() as u32);
            for &key in &keys {
                block.add_key(&key.to_le_bytes());
            }
            let first = block.finish().to_vec();

            block.reset(keys.len() as u32);
            for &key in &keys {
                block.add_key(&key.to_le_bytes());
            }
            let second = block.finish().to_vec();
            assert_eq!(first, second, "format {format:?}");
        }
    }

    #[test]
    fn invalid_key_bits_are_rejected() {
        for bm_key_bits in [0u32, 7, 25, 32] {
            let options = FilterOptions {
                bm_key_bits,
                ..Default::default()
            };
            assert!(BitmapBlock::new(&options, 0).is_err());
        }
    }
}
