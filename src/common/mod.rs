//! Common infrastructure: shared foundation used across the whole crate.
//!
//! - **config**: global flag resolution.
//! - **error**: application-wide error enum.

pub mod config;
pub mod error;
