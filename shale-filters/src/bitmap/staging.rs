//! In-memory staging for the compressed bitmap codecs.
//!
//! The key domain `[0, 2^key_bits)` is split into buckets of 256 keys each.
//! A bucket stores one header byte (the number of keys inserted) followed by
//! `estimated_bucket_size` one-byte slots holding the low 8 bits of each key;
//! keys landing in an already-full bucket spill into a shared overflow list.
//! Works best when inserted keys are uniformly distributed over the domain.
//!
//! Layout of the working array, repeated `num_buckets` times:
//!
//! `[ count: u8 ][ slot 0 ][ slot 1 ] ... [ slot estimated_bucket_size-1 ]`

/// Dense staging area shared by all compressed bitmap formats.
pub(crate) struct StagingArea {
    /// Temporary bucketised storage, `bytes_per_bucket * num_buckets` bytes.
    working: Vec<u8>,
    /// Keys that could not fit into their statically sized bucket, in
    /// insertion order until sorted by [`StagingArea::buckets`].
    extra_keys: Vec<u32>,
    /// Slot bytes per bucket plus one header byte.
    bytes_per_bucket: usize,
    /// Estimated number of keys per bucket for the current reset cycle.
    estimated_bucket_size: usize,
    num_buckets: usize,
    /// Number of keys announced by the last reset.
    num_keys: u32,
}

impl StagingArea {
    /// Creates a staging area for a `key_bits`-bit key domain. No memory is
    /// committed until the first [`reset`](StagingArea::reset).
    pub fn new(key_bits: u32) -> Self {
        debug_assert!((8..=24).contains(&key_bits));
        Self {
            working: Vec::new(),
            extra_keys: Vec::new(),
            bytes_per_bucket: 0,
            estimated_bucket_size: 0,
            num_buckets: 1usize << (key_bits - 8),
            num_keys: 0,
        }
    }

    /// Clears all state and re-sizes the working array for `num_keys`
    /// insertions. Capacity is retained across resets.
    pub fn reset(&mut self, num_keys: u32) {
        self.num_keys = num_keys;
        self.extra_keys.clear();
        // Estimated number of keys per bucket; the actual number for any
        // given bucket may differ. Capped so that the count of in-slot keys
        // always fits the header byte; a saturated bucket spills the rest
        // into the overflow list.
        self.estimated_bucket_size = (num_keys as usize).div_ceil(self.num_buckets).min(255);
        self.bytes_per_bucket = self.estimated_bucket_size + 1;
        self.working.clear();
        self.working.resize(self.bytes_per_bucket * self.num_buckets, 0);
    }

    /// Records key `i`. Duplicates are preserved.
    ///
    /// REQUIRES: `reset` has been called and `i < 2^key_bits`.
    pub fn set(&mut self, i: u32) {
        let bucket = (i >> 8) as usize;
        let offset = bucket * self.bytes_per_bucket;
        let count = self.working[offset] as usize;
        self.working[offset] = (count + 1).min(255) as u8;
        if count < self.estimated_bucket_size {
            self.working[offset + 1 + count] = (i & 255) as u8;
        } else {
            self.extra_keys.push(i);
        }
    }

    /// Number of keys announced by the last reset.
    pub fn num_keys(&self) -> u32 {
        self.num_keys
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Total memory held by the staging area.
    pub fn memory_usage(&self) -> usize {
        self.working.capacity() + self.extra_keys.capacity() * std::mem::size_of::<u32>()
    }

    /// Sorts the overflow list and returns a cursor over all buckets in index
    /// order. Each bucket yields its full key multiset, sorted ascending.
    pub fn buckets(&mut self) -> BucketIter<'_> {
        self.extra_keys.sort_unstable();
        BucketIter {
            staging: self,
            extra_cursor: 0,
            bucket_index: 0,
            bucket_keys: Vec::with_capacity(16),
        }
    }
}

/// Walks the staging buckets in index order, reconstructing each bucket's
/// keys from the slot bytes and the sorted overflow list.
pub(crate) struct BucketIter<'a> {
    staging: &'a StagingArea,
    /// Cursor into the sorted overflow list. Buckets are visited in index
    /// order and overflow keys are sorted, so consuming them sequentially
    /// hands each bucket exactly its own spilled keys.
    extra_cursor: usize,
    bucket_index: usize,
    bucket_keys: Vec<u32>,
}

impl BucketIter<'_> {
    /// Returns the next `(bucket_index, sorted keys)` pair, or `None` once
    /// all buckets have been visited. The key slice is valid until the next
    /// call.
    pub fn next_bucket(&mut self) -> Option<(usize, &[u32])> {
        let staging = self.staging;
        if self.bucket_index == staging.num_buckets {
            return None;
        }
        let index = self.bucket_index;
        self.bucket_index += 1;

        self.bucket_keys.clear();
        let offset = index * staging.bytes_per_bucket;
        let in_slot = (staging.working[offset] as usize).min(staging.estimated_bucket_size);
        for slot in 0..in_slot {
            let low = staging.working[offset + 1 + slot] as u32;
            self.bucket_keys.push(low | (index as u32) << 8);
        }
        // Overflow keys carry their full value; buckets are visited in index
        // order against the sorted list, so claiming by prefix hands each
        // bucket exactly its own spilled keys.
        while let Some(&key) = staging.extra_keys.get(self.extra_cursor) {
            if (key >> 8) as usize != index {
                break;
            }
            self.bucket_keys.push(key);
            self.extra_cursor += 1;
        }
        self.bucket_keys.sort_unstable();
        Some((index, &self.bucket_keys))
    }
}
