//! Process lifecycle: symmetric setup/teardown around one dispatched command.
//!
//! Setup order:
//!   1. Logger (`<data_dir>/<log_dir>/common`)
//!   2. Debug session (`<data_dir>/<log_dir>/debug`)
//!   3. Metrics sampler (fire-and-forget)
//!
//! Teardown stops the debug session and restores the terminal mode. It runs
//! exactly once: explicitly via [`Lifecycle::teardown`] / [`Lifecycle::run`],
//! or from `Drop` if neither was reached. The metrics task is left running.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::debug::{DebugSession, DebugSink};
use super::logger::{self, LoggerHandle};
use super::metrics::{self, MetricsTask};
use crate::error::AppError;

/// Snapshot file written by the metrics sampler under the common log dir.
pub const METRICS_SNAPSHOT: &str = "metrics.prom";

/// Inputs to [`Lifecycle::setup`].
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    pub data_dir: PathBuf,
    /// Log folder name under `data_dir`.
    pub log_dir: String,
    pub verbosity: u8,
    pub debug: bool,
    pub vmodule: String,
    pub backtrace_at: String,
    pub metrics_interval: Duration,
}

impl LifecycleOptions {
    /// `<data_dir>/<log_dir>`
    pub fn log_root(&self) -> PathBuf {
        self.data_dir.join(&self.log_dir)
    }

    /// `<data_dir>/<log_dir>/common`
    pub fn common_dir(&self) -> PathBuf {
        self.log_root().join("common")
    }
}

/// Resources owned between setup and teardown.
pub struct LifecycleState {
    pub logger: LoggerHandle,
    debug: Option<DebugSession>,
    metrics: Option<MetricsTask>,
    raw_mode_at_start: bool,
}

impl LifecycleState {
    pub fn debug_trace(&self) -> Option<&Path> {
        self.debug.as_ref().and_then(|d| d.trace_path())
    }

    pub fn metrics(&self) -> Option<&MetricsTask> {
        self.metrics.as_ref()
    }
}

/// Explicit lifecycle context. Created by [`Lifecycle::setup`], consumed by
/// [`Lifecycle::run`].
pub struct Lifecycle {
    state: Option<LifecycleState>,
}

impl Lifecycle {
    /// Run all setup steps. On a failure after the logger is installed, the
    /// partial state is torn down before the error is returned.
    pub fn setup(opts: &LifecycleOptions) -> Result<Self, AppError> {
        let sink = DebugSink::new();
        let logger = logger::init(
            &opts.common_dir(),
            opts.verbosity,
            &opts.vmodule,
            &opts.backtrace_at,
            sink.clone(),
        )?;

        let mut lifecycle = Lifecycle {
            state: Some(LifecycleState {
                logger,
                debug: None,
                metrics: None,
                raw_mode_at_start: terminal_raw_mode(),
            }),
        };

        if let Err(e) = lifecycle.finish_setup(opts, sink) {
            error!(error = %e, "lifecycle setup failed");
            if let Err(teardown_err) = lifecycle.teardown() {
                warn!(error = %teardown_err, "teardown after failed setup also failed");
            }
            return Err(e);
        }

        info!(
            data_dir = %opts.data_dir.display(),
            log_dir = %opts.log_root().display(),
            verbosity = opts.verbosity,
            debug = opts.debug,
            "lifecycle setup complete"
        );
        Ok(lifecycle)
    }

    fn finish_setup(&mut self, opts: &LifecycleOptions, sink: DebugSink) -> Result<(), AppError> {
        let Some(state) = self.state.as_mut() else {
            return Err(AppError::Configuration("lifecycle already torn down".into()));
        };
        state.debug = Some(DebugSession::start(&opts.log_root(), opts.debug, sink)?);
        state.metrics = Some(metrics::spawn(
            opts.common_dir().join(METRICS_SNAPSHOT),
            opts.metrics_interval,
        )?);
        Ok(())
    }

    pub fn state(&self) -> Option<&LifecycleState> {
        self.state.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.is_none()
    }

    /// Release lifecycle resources. A second call is a no-op.
    pub fn teardown(&mut self) -> Result<(), AppError> {
        let Some(mut state) = self.state.take() else {
            return Ok(());
        };
        debug!("lifecycle teardown");

        let mut first_err = None;

        if let Some(session) = state.debug.take() {
            if let Err(e) = session.stop() {
                warn!(error = %e, "debug session stop failed");
                first_err.get_or_insert(e);
            }
        }

        if let Err(e) = restore_terminal(state.raw_mode_at_start) {
            warn!(error = %e, "terminal restore failed");
            first_err.get_or_insert(e);
        }

        // Dropping the handle detaches the sampler; it ends with the runtime.
        drop(state.metrics.take());

        info!(log_file = %state.logger.log_file.display(), "lifecycle teardown complete");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run `op` on its own task, then tear down exactly once whatever the
    /// outcome. A teardown error is logged and never replaces the result of
    /// `op`. A panic in `op` is resumed after teardown.
    pub async fn run<Fut, T>(mut self, op: Fut) -> Result<T, AppError>
    where
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Send + 'static,
    {
        let joined = tokio::spawn(op).await;

        if let Err(e) = self.teardown() {
            error!(error = %e, "teardown failed");
        }

        match joined {
            Ok(result) => {
                if let Err(e) = &result {
                    debug!(kind = e.kind(), "command failed");
                }
                result
            }
            Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
            Err(join_err) => Err(AppError::Configuration(format!(
                "command task cancelled: {join_err}"
            ))),
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(error = %e, "teardown on drop failed");
        }
    }
}

fn terminal_raw_mode() -> bool {
    crossterm::terminal::is_raw_mode_enabled().unwrap_or(false)
}

/// Put the terminal back into the mode it had at setup.
fn restore_terminal(raw_mode_at_start: bool) -> Result<(), AppError> {
    if !raw_mode_at_start && terminal_raw_mode() {
        crossterm::terminal::disable_raw_mode()
            .map_err(|e| AppError::Configuration(format!("cannot restore terminal mode: {e}")))?;
    }
    Ok(())
}
