//! A standard set of HTTP client metrics.

use crate::{
    in_flight::InFlight,
    labels::{Label, LabelError, LabelOrder},
    record_response::{Count, CountResponses, Observe, RecordDuration, RecordResponse},
    sink::{CounterFamily, HistogramFamily},
    trace::{Trace, TraceHooks},
};
use prometheus_client::{metrics::gauge::Gauge, registry::Registry};
use std::sync::Arc;
use tower::layer;

/// Configures the metrics registered by [`ClientMetrics`].
#[derive(Clone, Debug)]
pub struct Config {
    /// Histogram bucket bounds, in seconds, for request durations.
    pub duration_buckets: Vec<f64>,
    /// Histogram bucket bounds, in seconds, for lifecycle events.
    pub trace_buckets: Vec<f64>,
}

/// Metrics that instrument an HTTP client.
///
/// - `in_flight_requests`: the number of requests currently being dispatched.
/// - `requests_total{code, method}`: the number of completed requests.
/// - `request_duration_seconds{method}`: the time taken to receive a response.
/// - `trace_duration_seconds{event}`: the time since a request was
///   dispatched at which each lifecycle event occurred.
#[derive(Clone, Debug)]
pub struct ClientMetrics {
    in_flight: Gauge,
    requests: CounterFamily,
    requests_labels: LabelOrder,
    duration: HistogramFamily,
    duration_labels: LabelOrder,
    trace: Arc<TraceHooks>,
}

/// An HTTP client instrumented by [`ClientMetrics`].
pub type Instrumented<S> = InFlight<
    Gauge,
    CountResponses<CounterFamily, Trace<RecordDuration<HistogramFamily, S>>>,
>;

const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_buckets: DEFAULT_BUCKETS.to_vec(),
            trace_buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }
}

// === impl ClientMetrics ===

impl ClientMetrics {
    /// Registers client metrics in `registry`.
    pub fn register(registry: &mut Registry, config: &Config) -> Self {
        let in_flight = Gauge::default();
        registry.register(
            "in_flight_requests",
            "The number of HTTP requests currently being dispatched",
            in_flight.clone(),
        );

        let requests = CounterFamily::register(
            registry,
            "requests",
            "The total number of completed HTTP requests",
            ["code", "method"],
        );

        let duration = HistogramFamily::register_seconds(
            registry,
            "request_duration",
            "The time between dispatching an HTTP request and receiving its response",
            ["method"],
            config.duration_buckets.iter().copied(),
        );

        let events = HistogramFamily::register_seconds(
            registry,
            "trace_duration",
            "The time since an HTTP request was dispatched at which each connection lifecycle event occurred",
            ["event"],
            config.trace_buckets.iter().copied(),
        );

        Self {
            in_flight,
            requests,
            requests_labels: LabelOrder::new(Some(Label::Code), Some(Label::Method)),
            duration,
            duration_labels: LabelOrder::new(Some(Label::Method), None),
            trace: Arc::new(TraceHooks::observe_unchecked(events)),
        }
    }

    /// Builds client metrics from caller-registered families.
    ///
    /// `requests` and `duration` may be partitioned by `code` and `method`;
    /// `events` must be partitioned by a single `event` label.
    pub fn from_families(
        in_flight: Gauge,
        requests: CounterFamily,
        duration: HistogramFamily,
        events: HistogramFamily,
    ) -> Result<Self, LabelError> {
        Ok(Self {
            requests_labels: LabelOrder::check(&requests)?,
            duration_labels: LabelOrder::check(&duration)?,
            trace: Arc::new(TraceHooks::observe_events(events)?),
            in_flight,
            requests,
            duration,
        })
    }

    /// Wraps `inner` with all client metrics.
    ///
    /// Requests pass through, outermost first, the in-flight gauge, the
    /// request counter, the lifecycle trace, and the duration histogram.
    pub fn instrument<S>(&self, inner: S) -> Instrumented<S> {
        let duration = RecordResponse::from_parts(
            Observe::new(self.duration.clone()),
            self.duration_labels,
            inner,
        );
        let trace = Trace::new(self.trace.clone(), duration);
        let count = RecordResponse::from_parts(
            Count::new(self.requests.clone()),
            self.requests_labels,
            trace,
        );
        InFlight::new(self.in_flight.clone(), count)
    }

    pub fn layer<S>(&self) -> impl layer::Layer<S, Service = Instrumented<S>> + Clone {
        let metrics = self.clone();
        layer::layer_fn(move |inner| metrics.instrument(inner))
    }

    pub fn in_flight(&self) -> &Gauge {
        &self.in_flight
    }

    pub fn requests(&self) -> &CounterFamily {
        &self.requests
    }
}
