//! Middleware that records completed responses, partitioned by status code
//! and request method.
//!
//! Only successful round trips are recorded. When the inner service fails,
//! the error is returned unchanged and nothing is recorded.

use crate::labels::{self, LabelOrder};
use futures::TryFuture;
use pin_project::pin_project;
use std::{
    borrow::Cow,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::time;
use tracing::trace;

mod count;
mod duration;


pub use self::{
    count::{Count, CountResponses},
    duration::{Observe, RecordDuration},
};

/// Records a single completed response into a metric sink.
pub trait Record {
    /// Records a response with the given label values. `elapsed` is the
    /// time between dispatching the request and receiving the response.
    fn record(&self, values: &[&str], elapsed: time::Duration);
}

/// A middleware that records each successful response with a `R`-typed
/// recorder.
#[derive(Clone, Debug)]
pub struct RecordResponse<R, S> {
    inner: S,
    recorder: R,
    labels: LabelOrder,
}

#[pin_project]
#[derive(Debug)]
pub struct ResponseFuture<R, F> {
    #[pin]
    inner: F,
    state: Option<RecordState<R>>,
}

#[derive(Debug)]
struct RecordState<R> {
    recorder: R,
    labels: LabelOrder,
    method: Cow<'static, str>,
    start: time::Instant,
}

// === impl RecordResponse ===

impl<R, S> RecordResponse<R, S> {
    /// Builds a middleware from a recorder whose labels have already been
    /// validated.
    pub(crate) fn from_parts(recorder: R, labels: LabelOrder, inner: S) -> Self {
        Self {
            inner,
            recorder,
            labels,
        }
    }

    /// Returns the validated labels, in the order values are recorded.
    pub fn label_order(&self) -> &LabelOrder {
        &self.labels
    }
}

impl<R, S, B, RspB> tower::Service<http::Request<B>> for RecordResponse<R, S>
where
    R: Record + Clone,
    S: tower::Service<http::Request<B>, Response = http::Response<RspB>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<R, S::Future>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let method = labels::method_label(req.method());
        let start = time::Instant::now();
        let inner = self.inner.call(req);
        ResponseFuture {
            inner,
            state: Some(RecordState {
                recorder: self.recorder.clone(),
                labels: self.labels,
                method,
                start,
            }),
        }
    }
}

// === impl ResponseFuture ===

impl<R, F, RspB> Future for ResponseFuture<R, F>
where
    R: Record,
    F: TryFuture<Ok = http::Response<RspB>>,
{
    type Output = Result<http::Response<RspB>, F::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let res = futures::ready!(this.inner.try_poll(cx));
        let Some(RecordState {
            recorder,
            labels,
            method,
            start,
        }) = this.state.take()
        else {
            return Poll::Ready(res);
        };

        match res {
            Ok(rsp) => {
                let elapsed = time::Instant::now().saturating_duration_since(start);
                let status = rsp.status();
                let values = labels.values(status.as_str(), &method);
                trace!(status = %status.as_u16(), %method, ?elapsed, "Recording response");
                recorder.record(&values, elapsed);
                Poll::Ready(Ok(rsp))
            }
            Err(error) => {
                trace!(%method, "Request failed; not recorded");
                Poll::Ready(Err(error))
            }
        }
    }
}
