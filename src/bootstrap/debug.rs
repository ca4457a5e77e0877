//! Debug/profiling session scoped to the log directory.
//!
//! The logger installs a JSON layer that writes into a [`DebugSink`]. The sink
//! discards everything until a [`DebugSession`] attaches a trace file to it
//! (only with `--debug`). Stopping the session detaches and flushes the file
//! and writes a small summary next to it.
//!
//! Layout under `<data_dir>/<log_dir>/debug/`:
//! ```text
//! trace-{unix_secs}-{pid}.jsonl   one JSON object per log event
//! session-{pid}.json              start/stop summary
//! ```

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::fmt::MakeWriter;

use crate::error::AppError;

/// Shared, swappable destination for the debug trace layer.
#[derive(Clone, Default)]
pub struct DebugSink {
    inner: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl DebugSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a trace file is attached.
    pub fn is_active(&self) -> bool {
        self.inner.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn attach(&self, file: File) -> io::Result<()> {
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        *guard = Some(BufWriter::new(file));
        Ok(())
    }

    /// Detach the trace file, flushing buffered events. No-op when inactive.
    fn detach(&self) -> io::Result<()> {
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        if let Some(mut writer) = guard.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

fn poisoned() -> io::Error {
    io::Error::other("debug sink mutex poisoned")
}

impl Write for DebugSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        match guard.as_mut() {
            Some(writer) => writer.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        match guard.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for DebugSink {
    type Writer = DebugSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Summary written when a debug-enabled session stops.
#[derive(Debug, Serialize)]
struct SessionSummary<'a> {
    pid: u32,
    started_at: DateTime<Utc>,
    stopped_at: DateTime<Utc>,
    elapsed_ms: i64,
    trace_file: Option<&'a Path>,
    trace_bytes: u64,
}

/// A running debug session.
pub struct DebugSession {
    dir: PathBuf,
    sink: DebugSink,
    trace_path: Option<PathBuf>,
    started_at: DateTime<Utc>,
    pid: u32,
}

impl DebugSession {
    /// Start a session under `<log_root>/debug`.
    ///
    /// Fails with [`AppError::Configuration`] when the directory or trace file
    /// cannot be created.
    pub fn start(log_root: &Path, enabled: bool, sink: DebugSink) -> Result<Self, AppError> {
        let dir = log_root.join("debug");
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Configuration(format!(
                "cannot create debug directory {}: {e}",
                dir.display()
            ))
        })?;

        let started_at = Utc::now();
        let pid = std::process::id();

        let trace_path = if enabled {
            let path = dir.join(format!("trace-{}-{pid}.jsonl", started_at.timestamp()));
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    AppError::Configuration(format!(
                        "cannot open debug trace {}: {e}",
                        path.display()
                    ))
                })?;
            sink.attach(file).map_err(|e| {
                AppError::Configuration(format!("cannot attach debug trace: {e}"))
            })?;
            info!(trace = %path.display(), "debug trace capture started");
            Some(path)
        } else {
            None
        };

        Ok(Self {
            dir,
            sink,
            trace_path,
            started_at,
            pid,
        })
    }

    pub fn trace_path(&self) -> Option<&Path> {
        self.trace_path.as_deref()
    }

    /// Stop the session: flush captured events and, when capture was on,
    /// write the summary. Returns the summary path if one was written.
    pub fn stop(self) -> Result<Option<PathBuf>, AppError> {
        let Some(trace_path) = self.trace_path else {
            debug!("debug session stopped (capture disabled)");
            return Ok(None);
        };

        // Last event that still lands in the trace file.
        debug!("debug session stopping");
        self.sink
            .detach()
            .map_err(|e| AppError::Configuration(format!("cannot flush debug trace: {e}")))?;

        let stopped_at = Utc::now();
        let trace_bytes = fs::metadata(&trace_path).map(|m| m.len()).unwrap_or(0);
        let summary = SessionSummary {
            pid: self.pid,
            started_at: self.started_at,
            stopped_at,
            elapsed_ms: (stopped_at - self.started_at).num_milliseconds(),
            trace_file: Some(&trace_path),
            trace_bytes,
        };

        let summary_path = self.dir.join(format!("session-{}.json", self.pid));
        let json = serde_json::to_vec_pretty(&summary)
            .map_err(|e| AppError::Configuration(format!("cannot encode session summary: {e}")))?;
        fs::write(&summary_path, json)?;

        info!(summary = %summary_path.display(), trace_bytes, "debug session stopped");
        Ok(Some(summary_path))
    }
}
