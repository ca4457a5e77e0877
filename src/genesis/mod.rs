//! Genesis construction, installation and child-chain derivation.

pub mod balance;
pub mod builder;
pub mod child;
pub mod loader;
pub mod spec;

pub use balance::{BalanceAllocation, BalanceEntry};
pub use child::{ChildChainSet, ChildDerivation, DerivedChild, derive_child_genesis};
pub use spec::{GENESIS_FILE, GenesisSpec};
