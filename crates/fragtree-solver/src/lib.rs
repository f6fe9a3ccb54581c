//! Backend contract for colorful subtree solving.
//!
//! This crate defines what a MIP engine must provide to be plugged into the
//! tree solver, independent of any concrete engine.
//!
//! # Overview
//!
//! - [`TreeOptions`]: per-solve configuration
//! - [`SolveStatus`]: the fixed outcome taxonomy every engine maps into
//! - [`BackendError`]: engine-agnostic error type
//! - [`LinearRow`], [`Bounds`]: sparse rows handed to engines
//! - [`MipBackend`], [`BackendFactory`]: the plug-in traits

mod config;
mod error;
mod row;
mod status;
mod traits;

pub use config::TreeOptions;
pub use error::BackendError;
pub use row::{Bounds, ConstraintFamily, LinearRow, ObjectiveSense};
pub use status::SolveStatus;
pub use traits::{BackendFactory, MipBackend};
