use super::{Record, RecordResponse};
use crate::{
    labels::{LabelError, LabelOrder},
    sink::CounterVec,
};
use tokio::time;
use tower::layer;

/// Counts completed responses, partitioned by `code` and/or `method`.
pub type CountResponses<C, S> = RecordResponse<Count<C>, S>;

/// Records a response by incrementing a counter.
#[derive(Clone, Debug)]
pub struct Count<C>(C);

// === impl CountResponses ===

impl<C: CounterVec, S> RecordResponse<Count<C>, S> {
    /// Wraps `inner` so that each completed response increments `counter`.
    ///
    /// Fails if `counter` is partitioned by labels other than `code` and
    /// `method`.
    pub fn new(counter: C, inner: S) -> Result<Self, LabelError> {
        let labels = LabelOrder::check(&counter)?;
        Ok(Self::from_parts(Count(counter), labels, inner))
    }

    /// Returns a layer that counts responses in `counter`.
    ///
    /// The counter's labels are validated before the layer is returned.
    pub fn layer(counter: C) -> Result<impl layer::Layer<S, Service = Self> + Clone, LabelError>
    where
        C: Clone,
    {
        let labels = LabelOrder::check(&counter)?;
        Ok(layer::layer_fn(move |inner| {
            Self::from_parts(Count(counter.clone()), labels, inner)
        }))
    }
}

// === impl Count ===

impl<T> Count<T> {
    pub(crate) fn new(counter: T) -> Self {
        Self(counter)
    }
}

impl<C: CounterVec> Record for Count<C> {
    #[inline]
    fn record(&self, values: &[&str], _: time::Duration) {
        self.0.incr(values)
    }
}
