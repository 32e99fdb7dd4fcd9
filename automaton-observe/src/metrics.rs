//! Counters, gauges, and bounded histograms under label-sorted keys.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Histograms keep only the most recent this-many samples per key.
pub const HISTOGRAM_CAPACITY: usize = 1000;

/// Metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Monotonically accumulating value.
    Counter,
    /// Last-write-wins value.
    Gauge,
    /// Recent-sample window.
    Histogram,
}

/// One exported metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    /// Label-qualified key (`name{a=1,b=2}`).
    pub key: String,
    /// Kind tag.
    pub metric_type: MetricType,
    /// Counter or gauge value; histogram sample count.
    pub value: f64,
    /// Histogram samples, oldest first. Empty for other kinds.
    pub samples: Vec<f64>,
    /// ISO-8601 export time.
    pub timestamp: String,
}

/// Name-level aggregation ignoring labels: counters and gauges are
/// summed, histograms contribute their sample mean.
pub type MetricsSnapshot = HashMap<String, f64>;

/// Build the label-aware key: labels sorted by name, so `{a:1, b:2}`
/// and `{b:2, a:1}` address the same series.
pub fn metric_key(name: &str, labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return name.to_string();
    }
    let sorted: BTreeMap<&str, &str> = labels.iter().copied().collect();
    let body: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{name}{{{}}}", body.join(","))
}

fn base_name(key: &str) -> &str {
    key.split('{').next().unwrap_or(key)
}

/// The in-process metrics collector. One per process, built at boot;
/// tests construct their own isolated instances.
#[derive(Default)]
pub struct MetricsCollector {
    counters: Mutex<HashMap<String, f64>>,
    gauges: Mutex<HashMap<String, f64>>,
    histograms: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl MetricsCollector {
    /// New empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add 1 to a counter.
    pub fn increment(&self, name: &str, labels: &[(&str, &str)]) {
        self.add(name, 1.0, labels);
    }

    /// Add `value` to a counter.
    pub fn add(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let key = metric_key(name, labels);
        let mut counters = self.counters.lock().expect("metrics lock");
        *counters.entry(key).or_insert(0.0) += value;
    }

    /// Overwrite a gauge.
    pub fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let key = metric_key(name, labels);
        let mut gauges = self.gauges.lock().expect("metrics lock");
        gauges.insert(key, value);
    }

    /// Record a histogram sample, evicting the oldest beyond capacity.
    pub fn record(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let key = metric_key(name, labels);
        let mut histograms = self.histograms.lock().expect("metrics lock");
        let samples = histograms.entry(key).or_default();
        samples.push_back(value);
        while samples.len() > HISTOGRAM_CAPACITY {
            samples.pop_front();
        }
    }

    /// Current counter value, 0 when never incremented.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        let key = metric_key(name, labels);
        *self
            .counters
            .lock()
            .expect("metrics lock")
            .get(&key)
            .unwrap_or(&0.0)
    }

    /// Current gauge value, if set.
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let key = metric_key(name, labels);
        self.gauges.lock().expect("metrics lock").get(&key).copied()
    }

    /// Histogram samples for a key, oldest first.
    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Vec<f64> {
        let key = metric_key(name, labels);
        self.histograms
            .lock()
            .expect("metrics lock")
            .get(&key)
            .map(|samples| samples.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every series with its type tag and timestamp.
    pub fn get_all(&self) -> Vec<MetricEntry> {
        let now = automaton_core::id::now_iso();
        let mut entries = Vec::new();

        for (key, value) in self.counters.lock().expect("metrics lock").iter() {
            entries.push(MetricEntry {
                key: key.clone(),
                metric_type: MetricType::Counter,
                value: *value,
                samples: vec![],
                timestamp: now.clone(),
            });
        }
        for (key, value) in self.gauges.lock().expect("metrics lock").iter() {
            entries.push(MetricEntry {
                key: key.clone(),
                metric_type: MetricType::Gauge,
                value: *value,
                samples: vec![],
                timestamp: now.clone(),
            });
        }
        for (key, samples) in self.histograms.lock().expect("metrics lock").iter() {
            entries.push(MetricEntry {
                key: key.clone(),
                metric_type: MetricType::Histogram,
                value: samples.len() as f64,
                samples: samples.iter().copied().collect(),
                timestamp: now.clone(),
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Aggregate by base name, ignoring labels.
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::new();

        for (key, value) in self.counters.lock().expect("metrics lock").iter() {
            *snapshot.entry(base_name(key).to_string()).or_insert(0.0) += value;
        }
        for (key, value) in self.gauges.lock().expect("metrics lock").iter() {
            *snapshot.entry(base_name(key).to_string()).or_insert(0.0) += value;
        }
        for (key, samples) in self.histograms.lock().expect("metrics lock").iter() {
            if !samples.is_empty() {
                let mean = samples.iter().sum::<f64>() / samples.len() as f64;
                snapshot.insert(base_name(key).to_string(), mean);
            }
        }

        snapshot
    }

    /// Clear everything.
    pub fn reset(&self) {
        self.counters.lock().expect("metrics lock").clear();
        self.gauges.lock().expect("metrics lock").clear();
        self.histograms.lock().expect("metrics lock").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_order_does_not_matter() {
        let collector = MetricsCollector::new();
        collector.increment("tool_calls", &[("tool", "exec"), ("result", "ok")]);
        collector.increment("tool_calls", &[("result", "ok"), ("tool", "exec")]);
        assert_eq!(
            collector.counter("tool_calls", &[("tool", "exec"), ("result", "ok")]),
            2.0
        );
    }

    #[test]
    fn key_shapes() {
        assert_eq!(metric_key("turns", &[]), "turns");
        assert_eq!(
            metric_key("turns", &[("b", "2"), ("a", "1")]),
            "turns{a=1,b=2}"
        );
    }

    #[test]
    fn gauges_overwrite_counters_accumulate() {
        let collector = MetricsCollector::new();
        collector.add("spend_cents", 5.0, &[]);
        collector.add("spend_cents", 7.0, &[]);
        assert_eq!(collector.counter("spend_cents", &[]), 12.0);

        collector.set_gauge("credits", 900.0, &[]);
        collector.set_gauge("credits", 850.0, &[]);
        assert_eq!(collector.gauge("credits", &[]), Some(850.0));
    }

    #[test]
    fn histogram_keeps_most_recent_1000() {
        let collector = MetricsCollector::new();
        for i in 0..1500 {
            collector.record("turn_ms", i as f64, &[]);
        }
        let samples = collector.histogram("turn_ms", &[]);
        assert_eq!(samples.len(), 1000);
        // The first surviving value is the 501st recorded (index 500).
        assert_eq!(samples[0], 500.0);
        assert_eq!(*samples.last().unwrap(), 1499.0);
    }

    #[test]
    fn snapshot_ignores_labels() {
        let collector = MetricsCollector::new();
        collector.add("tool_calls", 2.0, &[("tool", "exec")]);
        collector.add("tool_calls", 3.0, &[("tool", "web_fetch")]);
        let snapshot = collector.get_snapshot();
        assert_eq!(snapshot["tool_calls"], 5.0);
    }

    #[test]
    fn get_all_tags_types_and_reset_clears() {
        let collector = MetricsCollector::new();
        collector.increment("a", &[]);
        collector.set_gauge("b", 1.0, &[]);
        collector.record("c", 1.0, &[]);

        let all = collector.get_all();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| !e.timestamp.is_empty()));
        assert_eq!(all[0].metric_type, MetricType::Counter);

        collector.reset();
        assert!(collector.get_all().is_empty());
    }
}
