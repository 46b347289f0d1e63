//! Statistical core.
//!
//! Pure functions only; nothing in here performs I/O or touches global state.

pub mod aggregator;

pub use aggregator::*;
