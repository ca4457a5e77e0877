//! Genesis document shared by the builder, the loader and the child deriver.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::keys::Address;

/// File name of a chain's genesis under its chain directory.
pub const GENESIS_FILE: &str = "genesis.json";

/// Canonical initial state for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisSpec {
    pub chain_id: String,
    pub genesis_time: DateTime<Utc>,
    pub consensus: ConsensusParams,
    pub alloc: Vec<GenesisAccount>,
    pub validators: Vec<GenesisValidator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub epoch_length: u64,
    pub block_time_ms: u64,
    pub min_validators: u32,
    #[serde(with = "u256_dec")]
    pub min_deposit: U256,
    pub start_block: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_block: Option<u64>,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            epoch_length: 86_400,
            block_time_ms: 1_000,
            min_validators: 1,
            min_deposit: U256::zero(),
            start_block: 0,
            end_block: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    #[serde(with = "u256_dec")]
    pub balance: U256,
    /// Portion of `balance` locked as validator stake.
    #[serde(with = "u256_dec", default)]
    pub staked: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub address: Address,
    /// Hex-encoded ed25519 verifying key.
    pub pub_key: String,
    #[serde(with = "u256_dec")]
    pub voting_power: U256,
    #[serde(default)]
    pub name: String,
}

impl GenesisSpec {
    /// Structural checks applied to every spec before it is written.
    pub fn validate(&self) -> Result<(), String> {
        if self.chain_id.trim().is_empty() {
            return Err("chain_id must not be empty".into());
        }
        if self.alloc.is_empty() {
            return Err("alloc must fund at least one account".into());
        }
        if self.validators.is_empty() {
            return Err("validators must not be empty".into());
        }

        let mut seen = HashSet::new();
        for account in &self.alloc {
            if !seen.insert(account.address) {
                return Err(format!("duplicate account {}", account.address));
            }
            if account.staked > account.balance {
                return Err(format!(
                    "account {} stakes more than its balance",
                    account.address
                ));
            }
        }

        let mut seen = HashSet::new();
        for validator in &self.validators {
            if !seen.insert(validator.address) {
                return Err(format!("duplicate validator {}", validator.address));
            }
            if validator.voting_power.is_zero() {
                return Err(format!("validator {} has zero voting power", validator.address));
            }
            let key = hex::decode(&validator.pub_key)
                .map_err(|e| format!("validator {} pub_key: {e}", validator.address))?;
            if key.len() != 32 {
                return Err(format!(
                    "validator {} pub_key must be 32 bytes, got {}",
                    validator.address,
                    key.len()
                ));
            }
        }
        Ok(())
    }

    /// Pretty JSON, trailing newline. Same spec, same bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, AppError> {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| AppError::Parse(format!("cannot encode genesis: {e}")))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Sum of all allocated balances.
    pub fn total_supply(&self) -> U256 {
        self.alloc
            .iter()
            .fold(U256::zero(), |acc, a| acc.saturating_add(a.balance))
    }
}

/// Write `spec` to `<chain_dir>/genesis.json`, replacing any previous file.
///
/// The document is written to a temp file first and renamed into place.
pub fn write_genesis(chain_dir: &Path, spec: &GenesisSpec) -> Result<PathBuf, AppError> {
    let bytes = spec.to_json_bytes()?;
    fs::create_dir_all(chain_dir).map_err(|e| {
        AppError::Configuration(format!("cannot create {}: {e}", chain_dir.display()))
    })?;

    let path = chain_dir.join(GENESIS_FILE);
    let tmp = chain_dir.join(format!("{GENESIS_FILE}.tmp"));
    fs::write(&tmp, &bytes)
        .map_err(|e| AppError::Configuration(format!("cannot write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, &path)
        .map_err(|e| AppError::Configuration(format!("cannot replace {}: {e}", path.display())))?;
    Ok(path)
}

/// Decimal-string serde for [`U256`].
pub mod u256_dec {
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::genesis::balance::parse_amount(&s).map_err(serde::de::Error::custom)
    }
}
