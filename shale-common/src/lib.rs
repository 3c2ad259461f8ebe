//! Core definitions (errors and common result plumbing), relied upon by all
//! shale-* crates.

pub mod error;
pub mod result;

pub use result::Result;
