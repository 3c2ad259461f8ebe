//! The uniform filter-builder lifecycle and the per-table factory.

use crate::bitmap::BitmapBlock;
use crate::bloom::BloomBlock;
use crate::chunk::ChunkType;
use crate::options::{FilterKind, FilterOptions};
use shale_common::Result;

/// Common contract of all filter builders.
///
/// A builder is created once with reserved capacity, then cycles through
/// `reset(n)`, `n` times `add_key`, and one `finish` per table. `reset`
/// re-initialises state without shrinking capacity, so one builder serves an
/// entire epoch of tables. Misuse (adding keys before `reset` or after
/// `finish`) is asserted in debug builds.
pub trait FilterBlock {
    /// Prepares the builder for a table expected to hold `num_keys` keys.
    fn reset(&mut self, num_keys: u32);

    /// Inserts a key.
    fn add_key(&mut self, key: &[u8]);

    /// Finalizes the filter and returns the complete byte string.
    fn finish(&mut self) -> &[u8];

    /// Total memory held by the builder.
    fn memory_usage(&self) -> usize;

    /// The chunk type the surrounding storage format stamps on this
    /// filter's byte string.
    fn chunk_type(&self) -> ChunkType;
}

impl FilterBlock for BloomBlock {
    fn reset(&mut self, num_keys: u32) {
        BloomBlock::reset(self, num_keys)
    }

    fn add_key(&mut self, key: &[u8]) {
        BloomBlock::add_key(self, key)
    }

    fn finish(&mut self) -> &[u8] {
        BloomBlock::finish(self)
    }

    fn memory_usage(&self) -> usize {
        BloomBlock::memory_usage(self)
    }

    fn chunk_type(&self) -> ChunkType {
        BloomBlock::chunk_type(self)
    }
}

impl FilterBlock for BitmapBlock {
    fn reset(&mut self, num_keys: u32) {
        BitmapBlock::reset(self, num_keys)
    }

    fn add_key(&mut self, key: &[u8]) {
        BitmapBlock::add_key(self, key)
    }

    fn finish(&mut self) -> &[u8] {
        BitmapBlock::finish(self)
    }

    fn memory_usage(&self) -> usize {
        BitmapBlock::memory_usage(self)
    }

    fn chunk_type(&self) -> ChunkType {
        BitmapBlock::chunk_type(self)
    }
}

/// Trivial filter for call sites that disable filtering: every table gets a
/// zero-length payload tagged with the padding chunk type.
#[derive(Default)]
pub struct EmptyFilterBlock;

impl EmptyFilterBlock {
    pub fn new(_options: &FilterOptions, _bytes_to_reserve: usize) -> Self {
        Self
    }
}

impl FilterBlock for EmptyFilterBlock {
    fn reset(&mut self, _num_keys: u32) {}

    fn add_key(&mut self, _key: &[u8]) {}

    fn finish(&mut self) -> &[u8] {
        &[]
    }

    fn memory_usage(&self) -> usize {
        0
    }

    fn chunk_type(&self) -> ChunkType {
        ChunkType::Unknown // Dummy block type
    }
}

/// Creates the filter builder for the configured filter family.
pub fn new_filter_block(
    options: &FilterOptions,
    kind: FilterKind,
    bytes_to_reserve: usize,
) -> Result<Box<dyn FilterBlock>> {
    Ok(match kind {
        FilterKind::Disabled => Box::new(EmptyFilterBlock::new(options, bytes_to_reserve)),
        FilterKind::Bloom => Box::new(BloomBlock::new(options, bytes_to_reserve)?),
        FilterKind::Bitmap => Box::new(BitmapBlock::new(options, bytes_to_reserve)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::bitmap_key_must_match;
    use crate::bloom::bloom_key_may_match;

    #[test]
    fn empty_filter_is_empty() {
        let options = FilterOptions::default();
        let mut block = EmptyFilterBlock::new(&options, 128);
        block.reset(10);
        block.add_key(b"ignored");
        assert!(block.finish().is_empty());
        assert_eq!(block.memory_usage(), 0);
        assert_eq!(block.chunk_type(), ChunkType::Unknown);
    }

    #[test]
    fn factory_stamps_chunk_types() {
        let options = FilterOptions::default();
        let disabled = new_filter_block(&options, FilterKind::Disabled, 0).unwrap();
        assert_eq!(disabled.chunk_type(), ChunkType::Unknown);
        let bloom = new_filter_block(&options, FilterKind::Bloom, 0).unwrap();
        assert_eq!(bloom.chunk_type(), ChunkType::BloomFilter);
        let bitmap = new_filter_block(&options, FilterKind::Bitmap, 0).unwrap();
        assert_eq!(bitmap.chunk_type(), ChunkType::BitmapFilter);
    }

    #[test]
    fn factory_builders_are_usable_through_the_trait() {
        let options = FilterOptions {
            bf_bits_per_key: 10,
            bm_key_bits: 16,
            ..Default::default()
        };
        let keys: Vec<[u8; 4]> = (0..100u32).map(|i| (i * 7).to_le_bytes()).collect();

        let mut bloom = new_filter_block(&options, FilterKind::Bloom, 1024).unwrap();
        bloom.reset(keys.len() as u32);
        for key in &keys {
            bloom.add_key(key);
        }
        let contents = bloom.finish().to_vec();
        for key in &keys {
            assert!(bloom_key_may_match(key, &contents));
        }

        let mut bitmap = new_filter_block(&options, FilterKind::Bitmap, 1024).unwrap();
        bitmap.reset(keys.len() as u32);
        for key in &keys {
            bitmap.add_key(key);
        }
        let contents = bitmap.finish().to_vec();
        for key in &keys {
            assert!(bitmap_key_must_match(key, &contents));
        }
        assert!(!bitmap_key_must_match(&3u32.to_le_bytes(), &contents));
        assert!(bitmap.memory_usage() > 0);
    }

    #[test]
    fn factory_rejects_invalid_options() {
        let options = FilterOptions {
            bm_key_bits: 30,
            ..Default::default()
        };
        assert!(new_filter_block(&options, FilterKind::Bitmap, 0).is_err());
        // The empty filter never inspects the options.
        assert!(new_filter_block(&options, FilterKind::Disabled, 0).is_ok());
    }
}
