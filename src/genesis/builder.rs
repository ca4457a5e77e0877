//! Main-chain genesis construction from a balance allocation literal.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::balance::BalanceAllocation;
use super::spec::{ConsensusParams, GenesisAccount, GenesisSpec, GenesisValidator, write_genesis};
use crate::error::AppError;
use crate::keys::{Address, derive_genesis_key};

/// Build a genesis spec. Deterministic for identical inputs.
///
/// Account `i` uses the key from [`derive_genesis_key`]. Entries flagged
/// special become validators and stake their whole amount; without any
/// flagged entry the first account with a non-zero amount is the sole
/// validator. A zero-amount special entry, or an allocation whose amounts
/// are all zero, is a parse error since no validator could hold power.
pub fn build_genesis(
    chain_id: &str,
    allocation: &BalanceAllocation,
    genesis_time: DateTime<Utc>,
) -> Result<GenesisSpec, AppError> {
    if chain_id.trim().is_empty() {
        return Err(AppError::Validation("chain id must not be empty".into()));
    }
    if allocation.is_empty() {
        return Err(AppError::Parse("balance allocation is empty".into()));
    }

    if let Some(index) = allocation
        .iter()
        .position(|e| e.is_special && e.amount.is_zero())
    {
        return Err(AppError::Parse(format!(
            "validator entry {index} has a zero amount"
        )));
    }
    let default_validator = if allocation.iter().any(|e| e.is_special) {
        None
    } else {
        let index = allocation
            .iter()
            .position(|e| !e.amount.is_zero())
            .ok_or_else(|| AppError::Parse("every balance amount is zero".into()))?;
        Some(index)
    };
    let mut alloc = Vec::with_capacity(allocation.len());
    let mut validators = Vec::new();

    for (position, entry) in allocation.iter().enumerate() {
        let index = u32::try_from(position)
            .map_err(|_| AppError::Parse("too many balance entries".into()))?;
        let key = derive_genesis_key(chain_id, index);
        let vk = key.verifying_key().to_bytes();
        let address = Address::from_verifying_key(&vk);

        let is_validator = entry.is_special || default_validator == Some(position);
        let staked = if is_validator {
            entry.amount
        } else {
            Default::default()
        };

        alloc.push(GenesisAccount {
            address,
            balance: entry.amount,
            staked,
        });
        if is_validator {
            validators.push(GenesisValidator {
                address,
                pub_key: hex::encode(vk),
                voting_power: entry.amount,
                name: format!("validator-{index}"),
            });
        }
        debug!(index, %address, amount = %entry.amount, validator = is_validator, "genesis account");
    }

    let spec = GenesisSpec {
        chain_id: chain_id.to_string(),
        genesis_time,
        consensus: ConsensusParams::default(),
        alloc,
        validators,
    };
    spec.validate().map_err(AppError::Validation)?;
    Ok(spec)
}

/// `init_int_genesis`: parse, build, and write `<chain_dir>/genesis.json`.
///
/// A malformed literal fails before anything touches the disk.
pub fn init_int_genesis(
    chain_dir: &Path,
    chain_id: &str,
    balance_literal: &str,
    genesis_time: DateTime<Utc>,
) -> Result<(GenesisSpec, PathBuf), AppError> {
    let allocation = BalanceAllocation::parse(balance_literal)?;
    let spec = build_genesis(chain_id, &allocation, genesis_time)?;
    let path = write_genesis(chain_dir, &spec)?;

    info!(
        chain = %chain_id,
        accounts = spec.alloc.len(),
        validators = spec.validators.len(),
        total_supply = %spec.total_supply(),
        path = %path.display(),
        "main chain genesis written"
    );
    Ok((spec, path))
}
