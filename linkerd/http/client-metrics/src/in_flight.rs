use crate::sink::InFlightGauge;
use futures::TryFuture;
use pin_project::pin_project;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::layer;

/// A middleware that tracks the number of in-flight requests in a gauge.
///
/// The gauge is incremented before each request is dispatched and
/// decremented once the inner service produces a response.
///
/// When the inner service fails, or the response future is dropped before
/// completing, the gauge is *not* decremented, so the request remains
/// counted as in-flight. Under sustained failures the gauge drifts upward.
#[derive(Clone, Debug)]
pub struct InFlight<G, S> {
    gauge: G,
    inner: S,
}

#[pin_project]
#[derive(Debug)]
pub struct ResponseFuture<G, F> {
    #[pin]
    inner: F,
    gauge: Option<G>,
}

// === impl InFlight ===

impl<G, S> InFlight<G, S> {
    pub fn new(gauge: G, inner: S) -> Self {
        Self { gauge, inner }
    }

    pub fn layer(gauge: G) -> impl layer::Layer<S, Service = Self> + Clone
    where
        G: Clone,
    {
        layer::layer_fn(move |inner| Self::new(gauge.clone(), inner))
    }
}

impl<G, S, B, RspB> tower::Service<http::Request<B>> for InFlight<G, S>
where
    G: InFlightGauge + Clone,
    S: tower::Service<http::Request<B>, Response = http::Response<RspB>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<G, S::Future>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        self.gauge.incr();
        ResponseFuture {
            inner: self.inner.call(req),
            gauge: Some(self.gauge.clone()),
        }
    }
}

// === impl ResponseFuture ===

impl<G, F> Future for ResponseFuture<G, F>
where
    G: InFlightGauge,
    F: TryFuture,
{
    type Output = Result<F::Ok, F::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let rsp = futures::ready!(this.inner.try_poll(cx))?;
        if let Some(gauge) = this.gauge.take() {
            gauge.decr();
        }
        Poll::Ready(Ok(rsp))
    }
}
