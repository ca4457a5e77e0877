//! Command-line surface and dispatch.
//!
//! [`parse`] turns argv into a [`Cli`]; [`resolve`] turns that into the
//! resolved [`NodeConfig`] and exactly one [`Command`]. Both run before any
//! lifecycle setup, so usage mistakes never touch the data directory.

use std::ffi::OsString;
use std::path::PathBuf;

use chrono::{DateTime, SubsecRound, Utc};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::chaininfo::FsChainInfoStore;
use crate::config::{self, CLIENT_IDENTIFIER, GlobalFlags, NodeConfig};
use crate::error::AppError;
use crate::genesis::builder::init_int_genesis;
use crate::genesis::child::{ChildChainSet, derive_child_genesis};
use crate::genesis::loader::init_genesis;
use crate::node::{IdleNode, NodeRuntime};
use crate::validator::generate_validator_credential;

#[derive(Debug, Parser)]
#[command(
    name = "intchain",
    about = "INT Chain node bootstrap",
    disable_version_flag = true
)]
pub struct Cli {
    #[command(flatten)]
    pub flags: GlobalFlags,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print version numbers
    #[command(name = "version")]
    Version,

    /// Bootstrap and initialize a new main chain genesis
    #[command(name = "init_int_genesis")]
    InitIntGenesis {
        /// Initial balances, e.g. balance:"1000","2000"
        balance: String,

        /// Genesis timestamp (RFC 3339); defaults to now
        #[arg(long = "genesis-time")]
        genesis_time: Option<DateTime<Utc>>,
    },

    /// Install a genesis file for the main chain
    #[command(name = "init")]
    Init {
        /// Path to the genesis JSON file
        path: PathBuf,
    },

    /// Derive genesis files for the chains listed in --childChain
    #[command(name = "init_child_chain")]
    InitChildChain {
        /// Genesis timestamp (RFC 3339); defaults to now
        #[arg(long = "genesis-time")]
        genesis_time: Option<DateTime<Utc>>,
    },

    /// Generate a new validator credential for an address
    #[command(name = "gen_priv_validator")]
    GenPrivValidator {
        /// Account address (0x + 40 hex characters)
        address: String,
    },
}

/// One dispatched operation, carrying only what it needs.
#[derive(Debug)]
pub enum Command {
    Version,
    InitIntGenesis {
        chain_dir: PathBuf,
        chain_id: String,
        balance: String,
        genesis_time: DateTime<Utc>,
    },
    InitGenesis {
        chain_dir: PathBuf,
        chain_id: String,
        path: PathBuf,
    },
    InitChildChain {
        data_dir: PathBuf,
        main_chain_id: String,
        chains: ChildChainSet,
        genesis_time: DateTime<Utc>,
    },
    GenPrivValidator {
        chain_dir: PathBuf,
        address: String,
    },
    RunNode {
        config: NodeConfig,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Version => "version",
            Command::InitIntGenesis { .. } => "init_int_genesis",
            Command::InitGenesis { .. } => "init",
            Command::InitChildChain { .. } => "init_child_chain",
            Command::GenPrivValidator { .. } => "gen_priv_validator",
            Command::RunNode { .. } => "node",
        }
    }
}

/// Parse argv. `Ok(None)` means help was printed and there is nothing to run.
pub fn parse<I, T>(args: I) -> Result<Option<Cli>, AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                e.print()?;
                Ok(None)
            }
            _ => {
                let rendered = e.to_string();
                let msg = rendered.trim().trim_start_matches("error: ");
                Err(AppError::Usage(msg.to_string()))
            }
        },
    }
}

/// Resolve flags and select the operation.
pub fn resolve(cli: Cli) -> Result<(NodeConfig, Command), AppError> {
    let config = config::load(cli.flags)?;
    let main = config.main_chain_id.clone();

    let command = match cli.command {
        None => Command::RunNode {
            config: config.clone(),
        },
        Some(CliCommand::Version) => Command::Version,
        Some(CliCommand::InitIntGenesis {
            balance,
            genesis_time,
        }) => Command::InitIntGenesis {
            chain_dir: config.chain_dir(&main),
            chain_id: main,
            balance,
            genesis_time: genesis_time.unwrap_or_else(now),
        },
        Some(CliCommand::Init { path }) => Command::InitGenesis {
            chain_dir: config.chain_dir(&main),
            chain_id: main,
            path,
        },
        Some(CliCommand::InitChildChain { genesis_time }) => Command::InitChildChain {
            data_dir: config.data_dir.clone(),
            main_chain_id: main,
            chains: ChildChainSet::parse(&config.child_chain)?,
            genesis_time: genesis_time.unwrap_or_else(now),
        },
        Some(CliCommand::GenPrivValidator { address }) => Command::GenPrivValidator {
            chain_dir: config.chain_dir(&main),
            address,
        },
    };
    Ok((config, command))
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Run one operation to completion.
pub async fn execute(command: Command) -> Result<(), AppError> {
    info!(command = command.name(), "dispatching");

    match command {
        Command::Version => {
            println!("{}", version_text());
        }
        Command::InitIntGenesis {
            chain_dir,
            chain_id,
            balance,
            genesis_time,
        } => {
            let (spec, path) = init_int_genesis(&chain_dir, &chain_id, &balance, genesis_time)?;
            println!(
                "Genesis for '{}' written to {} ({} accounts, {} validators)",
                spec.chain_id,
                path.display(),
                spec.alloc.len(),
                spec.validators.len()
            );
        }
        Command::InitGenesis {
            chain_dir,
            chain_id,
            path,
        } => {
            let (_, installed) = init_genesis(&chain_dir, &chain_id, &path)?;
            println!("Genesis for '{chain_id}' installed at {}", installed.display());
        }
        Command::InitChildChain {
            data_dir,
            main_chain_id,
            chains,
            genesis_time,
        } => {
            let store = FsChainInfoStore::open(&data_dir, &main_chain_id);
            let derivation =
                derive_child_genesis(&data_dir, &main_chain_id, &store, &chains, genesis_time);
            for (name, outcome) in derivation.results() {
                match outcome {
                    Ok(child) => println!("{name}: genesis written to {}", child.path.display()),
                    Err(e) => eprintln!("{name}: {e}"),
                }
            }
            derivation.into_result()?;
        }
        Command::GenPrivValidator { chain_dir, address } => {
            let (credential, path) = generate_validator_credential(&chain_dir, &address)?;
            println!("Validator credential written to {}", path.display());
            println!("Public key: {}", credential.pub_key.value);
        }
        Command::RunNode { config } => {
            IdleNode::new().run(&config).await?;
        }
    }
    Ok(())
}

fn version_text() -> String {
    format!("{CLIENT_IDENTIFIER} {}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(args: &[&str]) -> Cli {
        parse(args.iter().copied()).unwrap().expect("should parse to a command")
    }

    #[test]
    fn no_subcommand_runs_node() {
        let cli = parse_ok(&["intchain", "--datadir", "/tmp/ic"]);
        let (_, command) = resolve(cli).unwrap();
        assert!(matches!(command, Command::RunNode { .. }));
    }

    #[test]
    fn init_int_genesis_targets_main_chain_dir() {
        let cli = parse_ok(&[
            "intchain",
            "--datadir",
            "/tmp/ic",
            "init_int_genesis",
            r#"balance:"1000","2000""#,
        ]);
        match resolve(cli).unwrap().1 {
            Command::InitIntGenesis {
                chain_dir,
                chain_id,
                balance,
                ..
            } => {
                assert_eq!(chain_dir, PathBuf::from("/tmp/ic/intchain"));
                assert_eq!(chain_id, "intchain");
                assert_eq!(balance, r#"balance:"1000","2000""#);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_accepted_after_subcommand() {
        let cli = parse_ok(&[
            "intchain",
            "gen_priv_validator",
            "0x00112233445566778899aabbccddeeff00112233",
            "--datadir",
            "/tmp/ic",
            "--testnet",
        ]);
        match resolve(cli).unwrap().1 {
            Command::GenPrivValidator { chain_dir, .. } => {
                assert_eq!(chain_dir, PathBuf::from("/tmp/ic/testnet"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_child_chain_reads_child_chain_flag() {
        let cli = parse_ok(&[
            "intchain",
            "--datadir=/tmp/ic",
            "--childChain=child_0,child_1",
            "init_child_chain",
            "--genesis-time",
            "2024-01-01T00:00:00Z",
        ]);
        match resolve(cli).unwrap().1 {
            Command::InitChildChain {
                chains,
                genesis_time,
                main_chain_id,
                ..
            } => {
                assert_eq!(chains.names(), ["child_0", "child_1"]);
                assert_eq!(main_chain_id, "intchain");
                assert_eq!(genesis_time.to_rfc3339(), "2024-01-01T00:00:00+00:00");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_child_chain_without_names_is_usage_error() {
        let cli = parse_ok(&["intchain", "--datadir", "/tmp/ic", "init_child_chain"]);
        assert!(matches!(resolve(cli), Err(AppError::Usage(_))));
    }

    #[test]
    fn unknown_subcommand_is_usage_error() {
        let err = parse(["intchain", "frobnicate"]).unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }

    #[test]
    fn missing_argument_is_usage_error() {
        let err = parse(["intchain", "gen_priv_validator"]).unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }

    #[test]
    fn version_text_names_the_client() {
        let text = version_text();
        assert_eq!(text, format!("intchain {}", env!("CARGO_PKG_VERSION")));
        assert_eq!(text.lines().count(), 1);
    }
}
