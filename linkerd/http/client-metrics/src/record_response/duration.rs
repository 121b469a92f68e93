use super::{Record, RecordResponse};
use crate::{
    labels::{LabelError, LabelOrder},
    sink::ObserverVec,
};
use tokio::time;
use tower::layer;

/// Observes the time taken to receive each response, in seconds,
/// partitioned by `code` and/or `method`.
pub type RecordDuration<O, S> = RecordResponse<Observe<O>, S>;

/// Records a response by observing its duration in seconds.
#[derive(Clone, Debug)]
pub struct Observe<O>(O);

// === impl RecordDuration ===

impl<O: ObserverVec, S> RecordResponse<Observe<O>, S> {
    /// Wraps `inner` so that the duration of each completed request is
    /// observed by `observer`.
    ///
    /// Fails if `observer` is partitioned by labels other than `code` and
    /// `method`.
    pub fn new(observer: O, inner: S) -> Result<Self, LabelError> {
        let labels = LabelOrder::check(&observer)?;
        Ok(Self::from_parts(Observe(observer), labels, inner))
    }

    pub fn layer(observer: O) -> Result<impl layer::Layer<S, Service = Self> + Clone, LabelError>
    where
        O: Clone,
    {
        let labels = LabelOrder::check(&observer)?;
        Ok(layer::layer_fn(move |inner| {
            Self::from_parts(Observe(observer.clone()), labels, inner)
        }))
    }
}

// === impl Observe ===

impl<T> Observe<T> {
    pub(crate) fn new(observer: T) -> Self {
        Self(observer)
    }
}

impl<O: ObserverVec> Record for Observe<O> {
    #[inline]
    fn record(&self, values: &[&str], elapsed: time::Duration) {
        self.0.observe(elapsed.as_secs_f64(), values)
    }
}
