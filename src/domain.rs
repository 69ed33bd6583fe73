//! Re-exports the execution domain types from [`crate::sync::domain`].
//!
//! Kept as a top-level path because most of the command-buffer and graph
//! modules spell it `crate::domain::*` rather than `crate::sync::domain::*`.
pub use crate::sync::domain::*;
