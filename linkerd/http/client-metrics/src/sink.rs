//! Metric sinks that instrumentation records into.
//!
//! Sinks describe the labels they are partitioned by so that middleware can
//! validate them once, when the middleware is built, and then supply label
//! values positionally for each request.

use prometheus_client::{
    metrics::{
        counter::Counter,
        family::{Family, MetricConstructor},
        gauge::Gauge,
        histogram::Histogram,
    },
    registry::{Registry, Unit},
};
use std::sync::{atomic::AtomicI64, Arc};

/// The label names and values of a single metric in a family.
pub(crate) type Labels = Vec<(&'static str, String)>;

/// Describes the labels by which a metric sink is partitioned.
pub trait Describe {
    /// Returns the sink's label names in the order that label values must
    /// be supplied.
    fn label_names(&self) -> &[&'static str];
}

/// A sink of labeled counters.
pub trait CounterVec: Describe {
    fn incr(&self, values: &[&str]);
}

/// A sink of labeled observations, e.g. a family of histograms.
pub trait ObserverVec: Describe {
    fn observe(&self, value: f64, values: &[&str]);
}

/// An unlabeled gauge of in-flight requests.
pub trait InFlightGauge {
    fn incr(&self);
    fn decr(&self);
}

/// A family of counters with a fixed set of label names.
#[derive(Clone, Debug)]
pub struct CounterFamily {
    names: Arc<[&'static str]>,
    family: Family<Labels, Counter>,
}

/// A family of histograms with a fixed set of label names.
#[derive(Clone, Debug)]
pub struct HistogramFamily {
    names: Arc<[&'static str]>,
    family: Family<Labels, Histogram, MkHistogram>,
}

#[derive(Clone, Debug)]
struct MkHistogram(Arc<[f64]>);

fn labels(names: &[&'static str], values: &[&str]) -> Labels {
    debug_assert_eq!(
        names.len(),
        values.len(),
        "label values must match label names"
    );
    names
        .iter()
        .zip(values)
        .map(|(n, v)| (*n, v.to_string()))
        .collect()
}

// === impl Describe ===

impl<D: Describe + ?Sized> Describe for &D {
    fn label_names(&self) -> &[&'static str] {
        (**self).label_names()
    }
}

impl<D: Describe + ?Sized> Describe for Arc<D> {
    fn label_names(&self) -> &[&'static str] {
        (**self).label_names()
    }
}

impl<C: CounterVec + ?Sized> CounterVec for Arc<C> {
    fn incr(&self, values: &[&str]) {
        (**self).incr(values)
    }
}

impl<O: ObserverVec + ?Sized> ObserverVec for Arc<O> {
    fn observe(&self, value: f64, values: &[&str]) {
        (**self).observe(value, values)
    }
}

impl<G: InFlightGauge + ?Sized> InFlightGauge for Arc<G> {
    fn incr(&self) {
        (**self).incr()
    }

    fn decr(&self) {
        (**self).decr()
    }
}

// === impl Gauge ===

impl InFlightGauge for Gauge<i64, AtomicI64> {
    fn incr(&self) {
        self.inc();
    }

    fn decr(&self) {
        self.dec();
    }
}

// === impl CounterFamily ===

impl CounterFamily {
    /// Returns a new, unregistered family partitioned by `names`.
    pub fn new(names: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            names: names.into_iter().collect(),
            family: Family::default(),
        }
    }

    /// Registers and returns a new family partitioned by `names`.
    pub fn register(
        registry: &mut Registry,
        name: &str,
        help: &str,
        names: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        let counters = Self::new(names);
        registry.register(name, help, counters.family.clone());
        counters
    }

    /// Returns the current value of the counter with the given label values.
    pub fn get(&self, values: &[&str]) -> u64 {
        self.family
            .get_or_create(&labels(&self.names, values))
            .get()
    }
}

impl Describe for CounterFamily {
    fn label_names(&self) -> &[&'static str] {
        &self.names
    }
}

impl CounterVec for CounterFamily {
    fn incr(&self, values: &[&str]) {
        self.family
            .get_or_create(&labels(&self.names, values))
            .inc();
    }
}

// === impl HistogramFamily ===

impl HistogramFamily {
    /// Returns a new, unregistered family partitioned by `names`, with
    /// histograms bucketed by `buckets`.
    pub fn new(
        names: impl IntoIterator<Item = &'static str>,
        buckets: impl IntoIterator<Item = f64>,
    ) -> Self {
        let mk = MkHistogram(buckets.into_iter().collect());
        Self {
            names: names.into_iter().collect(),
            family: Family::new_with_constructor(mk),
        }
    }

    /// Registers and returns a new family of histograms measured in seconds.
    pub fn register_seconds(
        registry: &mut Registry,
        name: &str,
        help: &str,
        names: impl IntoIterator<Item = &'static str>,
        buckets: impl IntoIterator<Item = f64>,
    ) -> Self {
        let histograms = Self::new(names, buckets);
        registry.register_with_unit(name, help, Unit::Seconds, histograms.family.clone());
        histograms
    }
}

impl Describe for HistogramFamily {
    fn label_names(&self) -> &[&'static str] {
        &self.names
    }
}

impl ObserverVec for HistogramFamily {
    fn observe(&self, value: f64, values: &[&str]) {
        self.family
            .get_or_create(&labels(&self.names, values))
            .observe(value);
    }
}

// === impl MkHistogram ===

impl MetricConstructor<Histogram> for MkHistogram {
    fn new_metric(&self) -> Histogram {
        Histogram::new(self.0.iter().copied())
    }
}
