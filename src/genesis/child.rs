//! Child-chain genesis derivation from the chain-info store.
//!
//! Each requested chain is handled independently: a missing or invalid
//! record fails that chain only. The caller gets every per-chain outcome in
//! request order plus a rollup that succeeds when any chain was derived.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::spec::{ConsensusParams, GenesisAccount, GenesisSpec, GenesisValidator, write_genesis};
use crate::chaininfo::{ChainInfo, ChainInfoStore, validate_chain_name};
use crate::error::AppError;

/// Ordered, de-duplicated chain names from `--childChain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildChainSet {
    names: Vec<String>,
}

impl ChildChainSet {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut names: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(AppError::Usage(
                "--childChain must name at least one chain (e.g. --childChain=child_0,child_1)"
                    .into(),
            ));
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A child genesis that was synthesized and written.
#[derive(Debug, Clone)]
pub struct DerivedChild {
    pub spec: GenesisSpec,
    pub path: PathBuf,
}

/// Per-chain outcomes, in request order.
#[derive(Debug)]
pub struct ChildDerivation {
    results: Vec<(String, Result<DerivedChild, AppError>)>,
}

impl ChildDerivation {
    pub fn results(&self) -> &[(String, Result<DerivedChild, AppError>)] {
        &self.results
    }

    pub fn get(&self, name: &str) -> Option<&Result<DerivedChild, AppError>> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(n, _)| n.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &AppError)> {
        self.results
            .iter()
            .filter_map(|(n, r)| r.as_ref().err().map(|e| (n.as_str(), e)))
    }

    pub fn any_succeeded(&self) -> bool {
        self.results.iter().any(|(_, r)| r.is_ok())
    }

    /// Partial success is success. With nothing derived, the error lists
    /// every requested name with its reason.
    pub fn into_result(self) -> Result<Vec<DerivedChild>, AppError> {
        if !self.any_succeeded() {
            let detail = self
                .results
                .iter()
                .map(|(n, r)| match r {
                    Err(e) => format!("{n} ({e})"),
                    Ok(_) => n.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppError::NotFound(format!(
                "no child chain could be derived: {detail}"
            )));
        }
        Ok(self
            .results
            .into_iter()
            .filter_map(|(_, r)| r.ok())
            .collect())
    }
}

/// `init_child_chain`: derive and write a genesis for every name in `chains`.
pub fn derive_child_genesis(
    data_dir: &Path,
    main_chain_id: &str,
    store: &dyn ChainInfoStore,
    chains: &ChildChainSet,
    genesis_time: DateTime<Utc>,
) -> ChildDerivation {
    let results = chains
        .names()
        .iter()
        .map(|name| {
            let outcome = derive_one(data_dir, main_chain_id, store, name, genesis_time);
            match &outcome {
                Ok(child) => info!(
                    chain = %name,
                    validators = child.spec.validators.len(),
                    path = %child.path.display(),
                    "child chain genesis written"
                ),
                Err(e) => warn!(chain = %name, kind = e.kind(), error = %e, "child chain skipped"),
            }
            (name.clone(), outcome)
        })
        .collect();
    ChildDerivation { results }
}

fn derive_one(
    data_dir: &Path,
    main_chain_id: &str,
    store: &dyn ChainInfoStore,
    name: &str,
    genesis_time: DateTime<Utc>,
) -> Result<DerivedChild, AppError> {
    validate_chain_name(name)?;
    if name == main_chain_id {
        return Err(AppError::Validation(format!(
            "'{name}' is the main chain, not a child chain"
        )));
    }
    let info = store
        .get(name)?
        .ok_or_else(|| AppError::NotFound(format!("no chain info for '{name}'")))?;

    let spec = child_genesis_spec(&info, genesis_time)?;
    let path = write_genesis(&data_dir.join(name), &spec)?;
    Ok(DerivedChild { spec, path })
}

/// Synthesize a genesis from a chain-info record. Every joined validator
/// is funded with its deposit, fully staked, with voting power equal to it.
pub fn child_genesis_spec(
    info: &ChainInfo,
    genesis_time: DateTime<Utc>,
) -> Result<GenesisSpec, AppError> {
    let joined = &info.joined_validators;
    if joined.len() < info.min_validators as usize {
        return Err(AppError::Validation(format!(
            "chain '{}' has {} joined validators, needs {}",
            info.chain_id,
            joined.len(),
            info.min_validators
        )));
    }
    if let Some(short) = joined.iter().find(|v| v.deposit < info.min_deposit) {
        return Err(AppError::Validation(format!(
            "validator {} deposit {} is below the minimum {} for chain '{}'",
            short.address, short.deposit, info.min_deposit, info.chain_id
        )));
    }

    let alloc = joined
        .iter()
        .map(|v| GenesisAccount {
            address: v.address,
            balance: v.deposit,
            staked: v.deposit,
        })
        .collect();
    let validators = joined
        .iter()
        .enumerate()
        .map(|(i, v)| GenesisValidator {
            address: v.address,
            pub_key: v.pub_key.clone(),
            voting_power: v.deposit,
            name: format!("{}-validator-{i}", info.chain_id),
        })
        .collect();

    let spec = GenesisSpec {
        chain_id: info.chain_id.clone(),
        genesis_time,
        consensus: ConsensusParams {
            epoch_length: info.epoch_length,
            min_validators: info.min_validators,
            min_deposit: info.min_deposit,
            start_block: info.start_block,
            end_block: info.end_block,
            ..ConsensusParams::default()
        },
        alloc,
        validators,
    };
    spec.validate().map_err(|e| {
        AppError::Validation(format!("chain info for '{}' is unusable: {e}", info.chain_id))
    })?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaininfo::JoinedValidator;
    use crate::keys::{Address, derive_genesis_key};
    use primitive_types::U256;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn joined(seed: u32, deposit: u64) -> JoinedValidator {
        let vk = derive_genesis_key("registry", seed).verifying_key().to_bytes();
        JoinedValidator {
            address: Address::from_verifying_key(&vk),
            pub_key: hex::encode(vk),
            deposit: U256::from(deposit),
        }
    }

    fn info(name: &str, validators: Vec<JoinedValidator>) -> ChainInfo {
        ChainInfo {
            chain_id: name.into(),
            owner: validators[0].address,
            min_validators: 1,
            min_deposit: U256::from(100u64),
            start_block: 10,
            end_block: Some(1_000),
            epoch_length: 600,
            joined_validators: validators,
        }
    }

    fn store_with(records: Vec<ChainInfo>) -> HashMap<String, ChainInfo> {
        records.into_iter().map(|r| (r.chain_id.clone(), r)).collect()
    }

    #[test]
    fn chain_set_trims_and_dedupes_in_order() {
        let set = ChildChainSet::parse(" child_1, child_0,,child_1 ").unwrap();
        assert_eq!(set.names(), ["child_1", "child_0"]);
    }

    #[test]
    fn empty_chain_set_is_usage_error() {
        assert!(matches!(ChildChainSet::parse(" , "), Err(AppError::Usage(_))));
    }

    #[test]
    fn missing_sibling_does_not_abort_derivation() {
        let tmp = TempDir::new().unwrap();
        let store = store_with(vec![info("child_0", vec![joined(0, 500)])]);
        let set = ChildChainSet::parse("child_0,child_1").unwrap();

        let derivation = derive_child_genesis(tmp.path(), "intchain", &store, &set, Utc::now());

        assert_eq!(derivation.succeeded().collect::<Vec<_>>(), ["child_0"]);
        let failed: Vec<_> = derivation.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "child_1");
        assert!(matches!(failed[0].1, AppError::NotFound(_)));

        let names: Vec<&str> = derivation.results().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["child_0", "child_1"]);

        assert!(tmp.path().join("child_0/genesis.json").exists());
        assert!(!tmp.path().join("child_1").exists());
        assert_eq!(derivation.into_result().unwrap().len(), 1);
    }

    #[test]
    fn nothing_resolved_lists_every_name() {
        let tmp = TempDir::new().unwrap();
        let store = store_with(Vec::new());
        let set = ChildChainSet::parse("child_a,child_b").unwrap();

        let err = derive_child_genesis(tmp.path(), "intchain", &store, &set, Utc::now())
            .into_result()
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(msg.contains("child_a") && msg.contains("child_b"));
    }

    #[test]
    fn spec_carries_record_parameters_and_stake() {
        let record = info("child_0", vec![joined(0, 500), joined(1, 700)]);
        let spec = child_genesis_spec(&record, Utc::now()).unwrap();

        assert_eq!(spec.chain_id, "child_0");
        assert_eq!(spec.consensus.start_block, 10);
        assert_eq!(spec.consensus.end_block, Some(1_000));
        assert_eq!(spec.consensus.epoch_length, 600);
        assert_eq!(spec.validators.len(), 2);
        assert_eq!(spec.alloc[1].staked, U256::from(700u64));
    }

    #[test]
    fn under_staffed_or_under_funded_records_fail_validation() {
        let mut few = info("child_0", vec![joined(0, 500)]);
        few.min_validators = 2;
        assert!(matches!(
            child_genesis_spec(&few, Utc::now()),
            Err(AppError::Validation(_))
        ));

        let poor = info("child_0", vec![joined(0, 50)]);
        assert!(matches!(
            child_genesis_spec(&poor, Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn main_chain_name_is_not_a_child() {
        let tmp = TempDir::new().unwrap();
        let store = store_with(vec![info("intchain", vec![joined(0, 500)])]);
        let set = ChildChainSet::parse("intchain").unwrap();

        let derivation = derive_child_genesis(tmp.path(), "intchain", &store, &set, Utc::now());
        assert!(matches!(derivation.get("intchain"), Some(Err(AppError::Validation(_)))));
    }
}
