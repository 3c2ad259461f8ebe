//! Filter construction options.

use crate::bitmap::BitmapFormat;
use shale_common::{Result, verify_arg};

/// Options consumed by the filter builders. Borrowed read-only for the
/// lifetime of a builder; a single options value may serve many builders.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Bloom filter density: number of filter bits allocated per inserted
    /// key. The probe count is derived as `floor(bf_bits_per_key * 0.69)`,
    /// clamped to `[1, 30]`. Must be non-zero for bloom use.
    pub bf_bits_per_key: u32,

    /// Bitmap key domain is `[0, 2^bm_key_bits)`. Must be within `[8, 24]`.
    pub bm_key_bits: u32,

    /// On-disk encoding used by bitmap filters.
    pub bm_fmt: BitmapFormat,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            bf_bits_per_key: 8,
            bm_key_bits: 24,
            bm_fmt: BitmapFormat::Uncompressed,
        }
    }
}

impl FilterOptions {
    /// Validates the options and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        verify_arg!(bf_bits_per_key, self.bf_bits_per_key > 0);
        verify_arg!(bm_key_bits, self.bm_key_bits >= 8 && self.bm_key_bits <= 24);
        Ok(())
    }
}

/// Which filter family a table is built with. The surrounding storage format
/// persists this choice in its footer so readers can interpret filter chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Filtering disabled: tables carry a zero-length filter payload.
    Disabled,
    /// Standard bloom filter.
    Bloom,
    /// Exact-membership bitmap filter.
    Bitmap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let options = FilterOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.bf_bits_per_key, 8);
        assert_eq!(options.bm_key_bits, 24);
        assert_eq!(options.bm_fmt, BitmapFormat::Uncompressed);
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        let mut options = FilterOptions {
            bf_bits_per_key: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        options.bf_bits_per_key = 10;
        options.bm_key_bits = 7;
        assert!(options.validate().is_err());

        options.bm_key_bits = 25;
        assert!(options.validate().is_err());

        options.bm_key_bits = 8;
        assert!(options.validate().is_ok());
        options.bm_key_bits = 24;
        assert!(options.validate().is_ok());
    }
}
