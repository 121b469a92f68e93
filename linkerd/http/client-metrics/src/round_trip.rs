use std::{
    fmt,
    future::Future,
    task::{Context, Poll},
};

/// Returns a [`RoundTripFn`] that dispatches requests through `f`.
pub fn round_trip_fn<F>(f: F) -> RoundTripFn<F> {
    RoundTripFn(f)
}

/// An HTTP client [`tower::Service`] backed by a closure.
///
/// This allows an HTTP client to be described as a plain function from a
/// request to a response future, so that middleware can wrap it like any
/// other client. The service is always ready.
#[derive(Clone, Copy)]
pub struct RoundTripFn<F>(F);

// === impl RoundTripFn ===

impl<F, B, RspB, E, Fut> tower::Service<http::Request<B>> for RoundTripFn<F>
where
    F: FnMut(http::Request<B>) -> Fut,
    Fut: Future<Output = Result<http::Response<RspB>, E>>,
{
    type Response = http::Response<RspB>;
    type Error = E;
    type Future = Fut;

    #[inline]
    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), E>> {
        Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        (self.0)(req)
    }
}

impl<F> fmt::Debug for RoundTripFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoundTripFn")
            .field(&format_args!("{}", std::any::type_name::<F>()))
            .finish()
    }
}
