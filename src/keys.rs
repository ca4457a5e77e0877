//! Account addresses and ed25519 key helpers.
//!
//! An address is 20 bytes, rendered as `0x` + 40 lower-case hex chars. A
//! key's address is the last 20 bytes of `SHA256(verifying_key_bytes)`.

use std::{fmt, str::FromStr};

use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::AppError;

pub const ADDRESS_LEN: usize = 20;

const GENESIS_KEY_DOMAIN: &[u8] = b"intchain-genesis";

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn from_verifying_key(vk: &[u8; 32]) -> Self {
        let digest = Sha256::digest(vk);
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
        Address(bytes)
    }
}

impl FromStr for Address {
    type Err = AppError;

    /// Accepts an optional `0x`/`0X` prefix and either hex case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AppError::Validation(format!(
                "address '{s}' must be {} hex characters, got {}",
                ADDRESS_LEN * 2,
                digits.len()
            )));
        }
        let bytes = hex::decode(digits)
            .map_err(|e| AppError::Validation(format!("address '{s}' is not valid hex: {e}")))?;
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AppError::Validation(format!("address '{s}' has the wrong length")))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Fresh ed25519 key from the OS RNG.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Deterministic key for genesis account `index` of `chain_id`.
///
/// Seed is `SHA256("intchain-genesis" || chain_id || index_be)`. Anyone can
/// recompute these keys, so they are only fit for development genesis files.
pub fn derive_genesis_key(chain_id: &str, index: u32) -> SigningKey {
    let mut hasher = Sha256::new();
    hasher.update(GENESIS_KEY_DOMAIN);
    hasher.update(chain_id.as_bytes());
    hasher.update(index.to_be_bytes());
    let seed: [u8; 32] = hasher.finalize().into();
    SigningKey::from_bytes(&seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let a: Address = "0x00112233445566778899aabbccddeeff00112233".parse().unwrap();
        let b: Address = "00112233445566778899AABBCCDDEEFF00112233".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0x00112233445566778899aabbccddeeff00112233");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "0x", "0x1234", "zz112233445566778899aabbccddeeff00112233", "INT3abc"] {
            let err = bad.parse::<Address>().unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{bad} should be invalid");
        }
    }

    #[test]
    fn serde_uses_display_form() {
        let a: Address = "0x00112233445566778899aabbccddeeff00112233".parse().unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0x00112233445566778899aabbccddeeff00112233\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn genesis_keys_are_deterministic_per_chain_and_index() {
        let k1 = derive_genesis_key("intchain", 0);
        let k2 = derive_genesis_key("intchain", 0);
        assert_eq!(k1.to_bytes(), k2.to_bytes());
        assert_ne!(k1.to_bytes(), derive_genesis_key("intchain", 1).to_bytes());
        assert_ne!(k1.to_bytes(), derive_genesis_key("testnet", 0).to_bytes());
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(generate_signing_key().to_bytes(), generate_signing_key().to_bytes());
    }
}
