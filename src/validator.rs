//! Validator credential generation (`gen_priv_validator`).
//!
//! Writes `<chain_dir>/priv_validator.json` (mode 0600 on unix):
//! ```text
//! {
//!   "address": "0x…",
//!   "pub_key":  { "type": "ed25519", "value": "<32-byte hex>" },
//!   "priv_key": { "type": "ed25519", "value": "<64-byte hex: seed || pub>" },
//!   "last_height": 0, "last_round": 0, "last_step": 0
//! }
//! ```
//!
//! Every call generates a fresh key and replaces the file. Prior content is
//! never read.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::keys::{Address, generate_signing_key};

pub const PRIV_VALIDATOR_FILE: &str = "priv_validator.json";

const KEY_TYPE: &str = "ed25519";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCredential {
    pub address: Address,
    pub pub_key: KeyValue,
    pub priv_key: KeyValue,
    pub last_height: u64,
    pub last_round: u32,
    pub last_step: u8,
}

// Keeps the private key out of logs.
impl std::fmt::Debug for ValidatorCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCredential")
            .field("address", &self.address)
            .field("pub_key", &self.pub_key)
            .finish_non_exhaustive()
    }
}

impl ValidatorCredential {
    /// Fresh credential bound to `address`.
    pub fn generate(address: Address) -> Self {
        let signing_key = generate_signing_key();
        let verifying = signing_key.verifying_key().to_bytes();

        let mut keypair = Vec::with_capacity(64);
        keypair.extend_from_slice(&signing_key.to_bytes());
        keypair.extend_from_slice(&verifying);

        Self {
            address,
            pub_key: KeyValue {
                key_type: KEY_TYPE.into(),
                value: hex::encode(verifying),
            },
            priv_key: KeyValue {
                key_type: KEY_TYPE.into(),
                value: hex::encode(keypair),
            },
            last_height: 0,
            last_round: 0,
            last_step: 0,
        }
    }
}

/// Validate `address`, generate a credential and write it under `chain_dir`.
pub fn generate_validator_credential(
    chain_dir: &Path,
    address: &str,
) -> Result<(ValidatorCredential, PathBuf), AppError> {
    let address: Address = address.parse()?;
    let credential = ValidatorCredential::generate(address);

    let mut bytes = serde_json::to_vec_pretty(&credential)
        .map_err(|e| AppError::Parse(format!("cannot encode validator credential: {e}")))?;
    bytes.push(b'\n');

    fs::create_dir_all(chain_dir).map_err(|e| {
        AppError::Configuration(format!("cannot create {}: {e}", chain_dir.display()))
    })?;
    let path = chain_dir.join(PRIV_VALIDATOR_FILE);
    fs::write(&path, &bytes).map_err(|e| {
        AppError::Configuration(format!("cannot write {}: {e}", path.display()))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            AppError::Configuration(format!("cannot set permissions on {}: {e}", path.display()))
        })?;
    }

    info!(
        %address,
        pub_key = %credential.pub_key.value,
        path = %path.display(),
        "validator credential written"
    );
    Ok((credential, path))
}
