//! # wthread-core
//!
//! Support types for the `wthread` background work-thread primitive.
//!
//! This crate is platform-agnostic and contains no thread-management code.
//! The primitive itself lives in the `wthread` crate.
//!
//! ## Modules
//!
//! - `error` - Error types
//! - `trace` - Worker lifecycle tracing (`WT_TRACE`)

pub mod error;
pub mod trace;

// Re-exports for convenience
pub use error::{WtResult, WthreadError};
pub use trace::Verbosity;
