#![deny(rust_2018_idioms, clippy::disallowed_methods, clippy::disallowed_types)]
#![forbid(unsafe_code)]

//! Tower middleware for instrumenting outbound HTTP clients.
//!
//! Each middleware wraps an HTTP client service and is itself an HTTP client
//! service, so instrumentation can be stacked in any order:
//!
//! - [`InFlight`] tracks the number of requests currently being dispatched.
//! - [`CountResponses`] counts completed requests by status code and method.
//! - [`RecordDuration`] observes the time taken to receive a response.
//! - [`Trace`] times the connection lifecycle events reported through a
//!   request's [`ClientTrace`].
//!
//! Metric sinks are validated when a middleware is constructed, so a sink
//! that is partitioned by unsupported labels is rejected before any request
//! is dispatched.

pub mod client;
mod in_flight;
pub mod labels;
pub mod record_response;
mod round_trip;
pub mod sink;
pub mod trace;

#[cfg(test)]
mod test_util;

pub use self::{
    client::{ClientMetrics, Config},
    in_flight::InFlight,
    labels::{check_event_label, LabelError, LabelOrder},
    record_response::{CountResponses, RecordDuration, RecordResponse},
    round_trip::{round_trip_fn, RoundTripFn},
    sink::{CounterFamily, CounterVec, Describe, HistogramFamily, InFlightGauge, ObserverVec},
    trace::{ClientTrace, Phase, Trace, TraceHooks, TraceListener},
};

/// A boxed error reported by the connection machinery.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
