//! `intchain` entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse arguments and resolve flags (usage errors exit here)
//!   3. Build the tokio runtime
//!   4. Lifecycle setup: logger, debug session, metrics sampler
//!   5. Dispatch one command, then tear down

use intchain_node::bootstrap::lifecycle::Lifecycle;
use intchain_node::cli;
use intchain_node::error::AppError;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // Optional file.
    let _ = dotenvy::dotenv();

    let Some(cli) = cli::parse(std::env::args_os())? else {
        return Ok(());
    };
    let (config, command) = cli::resolve(cli)?;

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let lifecycle = Lifecycle::setup(&config.lifecycle_options())?;
        lifecycle.run(cli::execute(command)).await
    })
}
