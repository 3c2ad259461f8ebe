//! Bit manipulation utilities shared across the shale crates.

pub mod bitpacking;
