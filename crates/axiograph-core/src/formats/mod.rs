//! # Input Formats
//!
//! Parsing for the formula-database snapshot. Pure transformations only;
//! file I/O lives in the app layer.

mod snapshot;

pub use snapshot::{SnapshotLoad, load_snapshot};
