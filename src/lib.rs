//! INT Chain node bootstrap.
//!
//! One-shot initialization commands (genesis construction and installation,
//! child-chain genesis derivation, validator credentials) wrapped in a
//! symmetric process lifecycle (logging, debug session, metrics sampler).

#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod chaininfo;
pub mod cli;
pub mod common;
pub mod genesis;
pub mod keys;
pub mod node;
pub mod validator;

pub use common::{config, error};
