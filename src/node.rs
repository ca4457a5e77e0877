//! Node runtime seam.
//!
//! The execution engine, networking and RPC servers live outside this crate.
//! The default action (no subcommand) hands the resolved configuration to a
//! [`NodeRuntime`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::AppError;
use crate::genesis::{ChildChainSet, GENESIS_FILE};

pub trait NodeRuntime {
    /// Run until shutdown is requested.
    fn run(&self, config: &NodeConfig) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Placeholder runtime: reports the chains it would serve, then waits for
/// Ctrl-C or an explicit shutdown.
#[derive(Debug, Clone, Default)]
pub struct IdleNode {
    shutdown: Arc<Notify>,
}

impl IdleNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }
}

impl NodeRuntime for IdleNode {
    async fn run(&self, config: &NodeConfig) -> Result<(), AppError> {
        let mut chains = vec![config.main_chain_id.clone()];
        if !config.child_chain.trim().is_empty() {
            chains.extend(ChildChainSet::parse(&config.child_chain)?.names().iter().cloned());
        }

        for chain in &chains {
            let genesis = config.chain_dir(chain).join(GENESIS_FILE);
            if genesis.exists() {
                info!(chain = %chain, genesis = %genesis.display(), "chain ready");
            } else {
                warn!(chain = %chain, "no genesis installed; run init first");
            }
        }
        info!(chains = chains.len(), "node idle, waiting for shutdown");

        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = self.shutdown.notified() => {}
        }
        info!("node shutdown requested");
        Ok(())
    }
}
