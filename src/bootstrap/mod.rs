//! Bootstrap layer: process-wide resources that wrap every command.
//!
//! - **lifecycle**: setup/teardown ordering and the lifecycle context.
//! - **logger**: tracing-subscriber initialisation.
//! - **debug**: debug trace capture scoped to the log directory.
//! - **metrics**: background process-metrics sampler.

pub mod debug;
pub mod lifecycle;
pub mod logger;
pub mod metrics;
