//! Aggregation core.
//!
//! Synchronous and free of I/O: raw notifications go in, snapshots come out.
//! The runtime owns one [`AggregationEngine`] per tracked source and drives
//! it from a single task.

pub mod accumulator;
pub mod engine;
pub mod gate;
pub mod ranker;
pub mod sanitizer;

pub use engine::{AggregationEngine, Snapshot};
pub use gate::StateLookup;
