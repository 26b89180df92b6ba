use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Injectable observability port.
///
/// Simulation code reports through this trait instead of global counters so
/// hosts can route diagnostics wherever they like (or nowhere).
pub trait MetricsPort {
    fn inc_counter(&mut self, name: &str, by: u64);
    fn set_gauge(&mut self, name: &str, value: i64);
    fn record_histogram(&mut self, name: &str, value: i64);
}

/// Discards everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoopMetrics;

impl MetricsPort for NoopMetrics {
    fn inc_counter(&mut self, _name: &str, _by: u64) {}
    fn set_gauge(&mut self, _name: &str, _value: i64) {}
    fn record_histogram(&mut self, _name: &str, _value: i64) {}
}

/// Shared handle so the owner can keep reading what the simulation records.
impl<P: MetricsPort> MetricsPort for Rc<RefCell<P>> {
    fn inc_counter(&mut self, name: &str, by: u64) {
        self.borrow_mut().inc_counter(name, by);
    }

    fn set_gauge(&mut self, name: &str, value: i64) {
        self.borrow_mut().set_gauge(name, value);
    }

    fn record_histogram(&mut self, name: &str, value: i64) {
        self.borrow_mut().record_histogram(name, value);
    }
}

/// Deterministic metrics aggregation.
///
/// Metrics must not depend on wall-clock time or unordered iteration.
/// This type uses sorted maps so snapshots have stable ordering.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, i64>,
    histograms: BTreeMap<String, Histogram>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
}

impl Histogram {
    pub fn record(&mut self, value: i64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    pub gauges: Vec<(String, i64)>,
    pub histograms: Vec<(String, Histogram)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.gauges.clear();
        self.histograms.clear();
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: impl Into<String>, by: u64) {
        let name = name.into();
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: impl Into<String>, value: i64) {
        self.gauges.insert(name.into(), value);
    }

    pub fn record_histogram(&mut self, name: impl Into<String>, value: i64) {
        self.histograms
            .entry(name.into())
            .or_default()
            .record(value);
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }

    /// Returns a stable, sorted snapshot suitable for logs/debug UI.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            histograms: self
                .histograms
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}

impl MetricsPort for Metrics {
    fn inc_counter(&mut self, name: &str, by: u64) {
        Metrics::inc_counter(self, name, by);
    }

    fn set_gauge(&mut self, name: &str, value: i64) {
        Metrics::set_gauge(self, name, value);
    }

    fn record_histogram(&mut self, name: &str, value: i64) {
        Metrics::record_histogram(self, name, value);
    }
}
