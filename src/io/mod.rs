//! Result persistence.

/// Columnar CSV results collector.
pub mod export;

pub use export::{Collector, Column};
