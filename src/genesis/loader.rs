//! Genesis installation from an externally supplied file (`init <path>`).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::info;

use super::spec::{GenesisSpec, write_genesis};
use crate::error::AppError;

/// Read and validate a genesis description file.
pub fn load_genesis(path: &Path) -> Result<GenesisSpec, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            AppError::NotFound(format!("genesis file {} does not exist", path.display()))
        }
        _ => AppError::Io(e),
    })?;

    let spec: GenesisSpec = serde_json::from_str(&raw)
        .map_err(|e| AppError::Parse(format!("malformed genesis {}: {e}", path.display())))?;
    spec.validate()
        .map_err(|e| AppError::Parse(format!("invalid genesis {}: {e}", path.display())))?;
    Ok(spec)
}

/// Install `spec` as the active genesis of `chain_dir`, replacing any previous one.
pub fn install_genesis(chain_dir: &Path, spec: &GenesisSpec) -> Result<PathBuf, AppError> {
    write_genesis(chain_dir, spec)
}

/// `init`: load `genesis_path` and install it for the main chain `chain_id`.
pub fn init_genesis(
    chain_dir: &Path,
    chain_id: &str,
    genesis_path: &Path,
) -> Result<(GenesisSpec, PathBuf), AppError> {
    let spec = load_genesis(genesis_path)?;
    if spec.chain_id != chain_id {
        return Err(AppError::Validation(format!(
            "genesis is for chain '{}', expected '{chain_id}'",
            spec.chain_id
        )));
    }
    let path = install_genesis(chain_dir, &spec)?;

    info!(
        chain = %chain_id,
        source = %genesis_path.display(),
        path = %path.display(),
        "genesis installed"
    );
    Ok((spec, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::balance::BalanceAllocation;
    use crate::genesis::builder::build_genesis;
    use chrono::Utc;
    use tempfile::TempDir;

    fn spec_for(chain_id: &str) -> GenesisSpec {
        let allocation = BalanceAllocation::parse(r#""100","200""#).unwrap();
        build_genesis(chain_id, &allocation, Utc::now()).unwrap()
    }

    fn write_source(dir: &Path, spec: &GenesisSpec) -> PathBuf {
        let path = dir.join("source.json");
        fs::write(&path, spec.to_json_bytes().unwrap()).unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_genesis(Path::new("/nonexistent/genesis.json")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_genesis(&path), Err(AppError::Parse(_))));
    }

    #[test]
    fn structurally_invalid_spec_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let mut spec = spec_for("intchain");
        spec.validators.clear();
        let path = write_source(tmp.path(), &spec);
        assert!(matches!(load_genesis(&path), Err(AppError::Parse(_))));
    }

    #[test]
    fn init_installs_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let chain_dir = tmp.path().join("data").join("intchain");
        fs::create_dir_all(&chain_dir).unwrap();
        fs::write(chain_dir.join("genesis.json"), b"old").unwrap();

        let spec = spec_for("intchain");
        let source = write_source(tmp.path(), &spec);
        let (installed, path) = init_genesis(&chain_dir, "intchain", &source).unwrap();

        assert_eq!(installed, spec);
        let on_disk: GenesisSpec = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(on_disk, spec);
    }

    #[test]
    fn chain_id_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), &spec_for("testnet"));
        let chain_dir = tmp.path().join("intchain");
        let err = init_genesis(&chain_dir, "intchain", &source).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!chain_dir.exists());
    }
}
