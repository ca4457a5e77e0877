//! Chain-info store: registered child chain records, keyed by chain name.
//!
//! Records are read-only here. The file-backed store keeps one JSON document
//! per chain at `<data_dir>/<main_chain>/chaininfo/<name>.json`.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::genesis::spec::u256_dec;
use crate::keys::Address;

const CHAININFO_DIR: &str = "chaininfo";

/// Persisted description of a registered child chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_id: String,
    pub owner: Address,
    pub min_validators: u32,
    #[serde(with = "u256_dec")]
    pub min_deposit: U256,
    pub start_block: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_block: Option<u64>,
    pub epoch_length: u64,
    #[serde(default)]
    pub joined_validators: Vec<JoinedValidator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedValidator {
    pub address: Address,
    /// Hex-encoded ed25519 verifying key.
    pub pub_key: String,
    #[serde(with = "u256_dec")]
    pub deposit: U256,
}

/// Lookup of chain records by name. `Ok(None)` means no record exists.
pub trait ChainInfoStore {
    fn get(&self, name: &str) -> Result<Option<ChainInfo>, AppError>;
}

impl ChainInfoStore for HashMap<String, ChainInfo> {
    fn get(&self, name: &str) -> Result<Option<ChainInfo>, AppError> {
        Ok(HashMap::get(self, name).cloned())
    }
}

/// Store backed by one JSON file per chain.
#[derive(Debug, Clone)]
pub struct FsChainInfoStore {
    root: PathBuf,
}

impl FsChainInfoStore {
    pub fn open(data_dir: &Path, main_chain_id: &str) -> Self {
        Self {
            root: data_dir.join(main_chain_id).join(CHAININFO_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, name: &str) -> Result<PathBuf, AppError> {
        validate_chain_name(name)?;
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl ChainInfoStore for FsChainInfoStore {
    fn get(&self, name: &str) -> Result<Option<ChainInfo>, AppError> {
        let path = self.record_path(name)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };

        let info: ChainInfo = serde_json::from_str(&raw).map_err(|e| {
            AppError::Parse(format!("malformed chain info {}: {e}", path.display()))
        })?;
        if info.chain_id != name {
            return Err(AppError::Validation(format!(
                "chain info {} describes chain '{}'",
                path.display(),
                info.chain_id
            )));
        }
        Ok(Some(info))
    }
}

/// Chain names become directory and file names.
pub fn validate_chain_name(name: &str) -> Result<(), AppError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid chain name '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str) -> ChainInfo {
        ChainInfo {
            chain_id: name.into(),
            owner: "0x00112233445566778899aabbccddeeff00112233".parse().unwrap(),
            min_validators: 1,
            min_deposit: U256::from(10u64),
            start_block: 100,
            end_block: None,
            epoch_length: 3600,
            joined_validators: Vec::new(),
        }
    }

    #[test]
    fn missing_record_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsChainInfoStore::open(tmp.path(), "intchain");
        assert!(store.get("child_0").unwrap().is_none());
    }

    #[test]
    fn reads_stored_record() {
        let tmp = TempDir::new().unwrap();
        let store = FsChainInfoStore::open(tmp.path(), "intchain");
        fs::create_dir_all(store.root()).unwrap();
        fs::write(
            store.record_path("child_0").unwrap(),
            serde_json::to_vec(&record("child_0")).unwrap(),
        )
        .unwrap();

        assert_eq!(store.get("child_0").unwrap(), Some(record("child_0")));
        assert!(store.root().ends_with("intchain/chaininfo"));
    }

    #[test]
    fn mismatched_chain_id_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = FsChainInfoStore::open(tmp.path(), "intchain");
        fs::create_dir_all(store.root()).unwrap();
        fs::write(
            store.record_path("child_0").unwrap(),
            serde_json::to_vec(&record("child_9")).unwrap(),
        )
        .unwrap();
        assert!(matches!(store.get("child_0"), Err(AppError::Validation(_))));
    }

    #[test]
    fn malformed_record_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let store = FsChainInfoStore::open(tmp.path(), "intchain");
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.record_path("child_0").unwrap(), "[]").unwrap();
        assert!(matches!(store.get("child_0"), Err(AppError::Parse(_))));
    }

    #[test]
    fn path_like_names_are_rejected() {
        for bad in ["", "../intchain", "a/b", ".hidden", "a b"] {
            assert!(validate_chain_name(bad).is_err(), "{bad:?} should be rejected");
        }
        validate_chain_name("child_0").unwrap();
    }
}
