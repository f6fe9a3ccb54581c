//! Instrumentation and fixtures for tree solves.
//!
//! [`memory`] captures wall-clock duration and resident memory around each
//! stage of a solve (prepare, solve, reconstruct, verify) so that callers and
//! the bench runner can report where time and memory go. [`synthetic`] builds
//! reproducible colored fragment graphs for tests and benchmarks.

pub mod memory;
pub mod synthetic;

pub use memory::{
    MeasurementRecorder, MemoryError, StageMeasurement, StageStart, capture_rss_bytes, rss_delta,
};
pub use synthetic::{SyntheticGraphConfig, synthetic_graph};
