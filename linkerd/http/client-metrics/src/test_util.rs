use crate::{
    round_trip::{round_trip_fn, RoundTripFn},
    sink::{CounterVec, Describe, ObserverVec},
};
use parking_lot::Mutex;
use std::{future, sync::Arc};

pub use crate::Error;

/// By default, only log this crate's events.
pub const DEFAULT_LOG: &str = "warn,linkerd_http_client_metrics=trace";

type Ready = future::Ready<Result<http::Response<()>, Error>>;

pub fn trace_init() -> tracing::subscriber::DefaultGuard {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG.to_string());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

pub fn get(uri: &str) -> http::Request<()> {
    request(http::Method::GET, uri)
}

pub fn request(method: http::Method, uri: &str) -> http::Request<()> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(())
        .expect("request must be valid")
}

/// A client that responds to every request with `status`.
pub fn respond_with(
    status: http::StatusCode,
) -> RoundTripFn<impl FnMut(http::Request<()>) -> Ready + Clone> {
    round_trip_fn(move |_: http::Request<()>| {
        let rsp = http::Response::builder()
            .status(status)
            .body(())
            .expect("response must be valid");
        future::ready(Ok(rsp))
    })
}

/// A client that fails every request.
pub fn fail_with(msg: &'static str) -> RoundTripFn<impl FnMut(http::Request<()>) -> Ready + Clone> {
    round_trip_fn(move |_: http::Request<()>| future::ready(Err(Error::from(msg))))
}

/// A sink that records each event along with its label values.
#[derive(Clone, Debug)]
pub struct MockSink {
    names: Arc<[&'static str]>,
    events: Arc<Mutex<Vec<(f64, Vec<String>)>>>,
}

// === impl MockSink ===

impl MockSink {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            names: names.into(),
            events: Default::default(),
        }
    }

    pub fn events(&self) -> Vec<(f64, Vec<String>)> {
        self.events.lock().clone()
    }

    /// Returns the label values of each recorded event.
    pub fn labels(&self) -> Vec<Vec<String>> {
        self.events().into_iter().map(|(_, l)| l).collect()
    }

    fn push(&self, value: f64, values: &[&str]) {
        let values = values.iter().map(|v| v.to_string()).collect();
        self.events.lock().push((value, values));
    }
}

impl Describe for MockSink {
    fn label_names(&self) -> &[&'static str] {
        &self.names
    }
}

impl CounterVec for MockSink {
    fn incr(&self, values: &[&str]) {
        self.push(1.0, values)
    }
}

impl ObserverVec for MockSink {
    fn observe(&self, value: f64, values: &[&str]) {
        self.push(value, values)
    }
}
