#![deny(missing_docs)]
//! # automaton-observe — logging, metrics, alerts
//!
//! In-process collectors owned by the runtime for its whole life:
//!
//! * [`Logger`]: level-filtered structured entries fanned out to
//!   pluggable sinks; the default sink emits [`tracing`] events so any
//!   subscriber the embedder installs sees them.
//! * [`MetricsCollector`]: counters, gauges, and bounded histograms
//!   under label-sorted keys.
//! * [`AlertEngine`]: rule evaluation over metric snapshots with
//!   per-rule cooldowns. Cooldowns are process-lifetime state: build
//!   the engine once at boot, never per tick.

mod alerts;
mod logger;
mod metrics;

pub use alerts::{ActiveAlert, AlertEngine, AlertRule, AlertSeverity};
pub use logger::{LogEntry, LogError, LogLevel, LogSink, Logger, MemorySink, TracingSink};
pub use metrics::{MetricEntry, MetricType, MetricsCollector, MetricsSnapshot, metric_key};
