//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once per process, before any other bootstrap step. It
//! installs a global registry with:
//!
//! - a human-readable layer on stderr,
//! - the same format (no ANSI) appended to `<common_dir>/intchain.log`,
//! - a JSON layer feeding the [`DebugSink`] (inert until a debug session attaches),
//! - an optional backtrace trigger for one `file:line` location.

use std::{
    backtrace::Backtrace,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::level_filters::LevelFilter;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::{self, Directive};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use super::debug::DebugSink;
use crate::error::AppError;

/// File name of the common log under the common log directory.
pub const LOG_FILE_NAME: &str = "intchain.log";

/// Handle to the installed logger.
#[derive(Debug, Clone)]
pub struct LoggerHandle {
    pub common_dir: PathBuf,
    pub log_file: PathBuf,
    pub level: LevelFilter,
}

/// Initialise the global tracing subscriber.
///
/// `verbosity` uses the 0..=5 scale (0 silences output). `vmodule` adds
/// per-target overrides, `backtrace_at` is empty or `file:line`.
pub fn init(
    common_dir: &Path,
    verbosity: u8,
    vmodule: &str,
    backtrace_at: &str,
    debug_sink: DebugSink,
) -> Result<LoggerHandle, AppError> {
    let level = verbosity_level(verbosity)?;
    let overrides = parse_vmodule(vmodule)?;
    let backtrace = parse_backtrace_at(backtrace_at)?;

    fs::create_dir_all(common_dir).map_err(|e| {
        AppError::Configuration(format!(
            "cannot create log directory {}: {e}",
            common_dir.display()
        ))
    })?;

    let log_file = common_dir.join(LOG_FILE_NAME);
    let file = open_append(&log_file)?;

    let backtrace_layer = match backtrace {
        Some((file_suffix, line)) => Some(BacktraceLayer {
            file_suffix,
            line,
            out: Mutex::new(open_append(&log_file)?),
        }),
        None => None,
    };

    let sink_for_filter = debug_sink.clone();
    let debug_layer = fmt::layer()
        .json()
        .with_writer(debug_sink)
        .with_filter(filter::dynamic_filter_fn(move |_, _| {
            sink_for_filter.is_active()
        }));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(build_filter(level, &overrides)),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(build_filter(level, &overrides)),
        )
        .with(debug_layer)
        .with(backtrace_layer)
        .try_init()
        .map_err(|e| AppError::Configuration(format!("failed to set subscriber: {e}")))?;

    Ok(LoggerHandle {
        common_dir: common_dir.to_path_buf(),
        log_file,
        level,
    })
}

fn open_append(path: &Path) -> Result<File, AppError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            AppError::Configuration(format!(
                "failed to open log file '{}': {e}",
                path.display()
            ))
        })
}

fn build_filter(level: LevelFilter, overrides: &[Directive]) -> EnvFilter {
    overrides.iter().cloned().fold(
        EnvFilter::builder()
            .with_default_directive(level.into())
            .parse_lossy(""),
        |filter, directive| filter.add_directive(directive),
    )
}

/// Map the 0..=5 verbosity scale onto a [`LevelFilter`].
pub fn verbosity_level(verbosity: u8) -> Result<LevelFilter, AppError> {
    match verbosity {
        0 => Ok(LevelFilter::OFF),
        1 => Ok(LevelFilter::ERROR),
        2 => Ok(LevelFilter::WARN),
        3 => Ok(LevelFilter::INFO),
        4 => Ok(LevelFilter::DEBUG),
        5 => Ok(LevelFilter::TRACE),
        n => Err(AppError::Configuration(format!(
            "verbosity must be between 0 and 5, got {n}"
        ))),
    }
}

/// Parse `target=N[,target=N]` into filter directives.
pub fn parse_vmodule(spec: &str) -> Result<Vec<Directive>, AppError> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (target, level) = part.split_once('=').ok_or_else(|| {
                AppError::Configuration(format!("vmodule entry '{part}' must be <target>=<level>"))
            })?;
            let target = target.trim();
            if target.is_empty() {
                return Err(AppError::Configuration(format!(
                    "vmodule entry '{part}' has an empty target"
                )));
            }
            let verbosity: u8 = level.trim().parse().map_err(|_| {
                AppError::Configuration(format!("vmodule entry '{part}' has a non-numeric level"))
            })?;
            let level = verbosity_level(verbosity)?;
            format!("{target}={level}").parse::<Directive>().map_err(|e| {
                AppError::Configuration(format!("invalid vmodule entry '{part}': {e}"))
            })
        })
        .collect()
}

/// Parse `file:line`. Empty input disables the trigger.
pub fn parse_backtrace_at(spec: &str) -> Result<Option<(String, u32)>, AppError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(None);
    }
    let (file, line) = spec.rsplit_once(':').ok_or_else(|| {
        AppError::Configuration(format!("backtrace location '{spec}' must be <file>:<line>"))
    })?;
    let line: u32 = line.parse().map_err(|_| {
        AppError::Configuration(format!("backtrace location '{spec}' has a non-numeric line"))
    })?;
    if file.is_empty() || line == 0 {
        return Err(AppError::Configuration(format!(
            "backtrace location '{spec}' is incomplete"
        )));
    }
    Ok(Some((file.to_string(), line)))
}

/// Writes a captured backtrace into the common log whenever an event is
/// emitted from `file_suffix:line`.
struct BacktraceLayer {
    file_suffix: String,
    line: u32,
    out: Mutex<File>,
}

impl<S: Subscriber> Layer<S> for BacktraceLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let hit = meta.line() == Some(self.line)
            && meta
                .file()
                .is_some_and(|file| file.ends_with(self.file_suffix.as_str()));
        if !hit {
            return;
        }
        let trace = Backtrace::force_capture();
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(
                out,
                "backtrace at {}:{} ({})\n{trace}",
                self.file_suffix,
                self.line,
                meta.target()
            );
        }
    }
}
