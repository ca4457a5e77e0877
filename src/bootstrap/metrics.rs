//! Background process-metrics sampler.
//!
//! [`spawn`] starts a fire-and-forget tokio task that samples the process
//! every interval, updates a private Prometheus registry and rewrites the
//! text exposition to a snapshot file. Errors are logged, never returned.
//! The task has no stop signal; it ends with the runtime.

use std::{path::PathBuf, time::Duration};

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::AppError;

/// Prometheus registry plus the sampler's own gauges.
pub struct ProcessMetrics {
    registry: Registry,
    uptime: Gauge,
    samples: IntCounter,
    started: Instant,
}

impl ProcessMetrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new_custom(Some("intchain".into()), None)
            .map_err(|e| AppError::Configuration(format!("metrics registry: {e}")))?;

        let uptime = Gauge::new("process_uptime_seconds", "Seconds since lifecycle setup")
            .map_err(|e| AppError::Configuration(format!("metrics gauge: {e}")))?;
        let samples = IntCounter::new("metrics_samples_total", "Process metric samples taken")
            .map_err(|e| AppError::Configuration(format!("metrics counter: {e}")))?;

        registry
            .register(Box::new(uptime.clone()))
            .and_then(|_| registry.register(Box::new(samples.clone())))
            .map_err(|e| AppError::Configuration(format!("metrics register: {e}")))?;

        #[cfg(target_os = "linux")]
        registry
            .register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))
            .map_err(|e| AppError::Configuration(format!("process collector: {e}")))?;

        Ok(Self {
            registry,
            uptime,
            samples,
            started: Instant::now(),
        })
    }

    /// Take one sample and return the text exposition.
    pub fn sample(&self) -> Result<String, AppError> {
        self.uptime.set(self.started.elapsed().as_secs_f64());
        self.samples.inc();

        let families = self.registry.gather();
        if let Some(rss) = families
            .iter()
            .find(|f| f.get_name().ends_with("process_resident_memory_bytes"))
            .and_then(|f| f.get_metric().first())
        {
            debug!(
                resident_bytes = rss.get_gauge().get_value(),
                samples = self.samples.get(),
                "process metrics sampled"
            );
        }

        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| AppError::Configuration(format!("metrics encode: {e}")))?;
        String::from_utf8(buf).map_err(|e| AppError::Configuration(format!("metrics encode: {e}")))
    }

    pub fn samples_taken(&self) -> u64 {
        self.samples.get()
    }
}

/// Handle to the spawned sampler. Dropping it detaches the task.
pub struct MetricsTask {
    pub snapshot_path: PathBuf,
    handle: JoinHandle<()>,
}

impl MetricsTask {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Spawn the sampler on the current tokio runtime.
pub fn spawn(snapshot_path: PathBuf, interval: Duration) -> Result<MetricsTask, AppError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
        AppError::Configuration(format!("metrics collection needs a tokio runtime: {e}"))
    })?;
    let metrics = ProcessMetrics::new()?;
    let path = snapshot_path.clone();

    let handle = runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let text = match metrics.sample() {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "metrics sample failed");
                    continue;
                }
            };
            if let Err(e) = tokio::fs::write(&path, text).await {
                warn!(path = %path.display(), error = %e, "metrics snapshot write failed");
            }
        }
    });

    debug!(interval_ms = interval.as_millis() as u64, "metrics collection started");
    Ok(MetricsTask {
        snapshot_path,
        handle,
    })
}
