use super::{ClientTrace, GotConnInfo, Phase, TraceHooks, TraceListener};
use crate::Error;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    task::{Context, Poll},
};
use tokio::time;
use tower::layer;
use tracing::{debug, trace};

/// A middleware that times a request's lifecycle events.
///
/// Each request is given a [`ClientTrace`] listener that invokes the
/// configured [`TraceHooks`] with the time elapsed since the request was
/// dispatched. The request and its response are otherwise unchanged.
#[derive(Clone, Debug)]
pub struct Trace<S> {
    hooks: Arc<TraceHooks>,
    inner: S,
}

/// Times the events of a single request relative to when it began.
struct HookListener {
    hooks: Arc<TraceHooks>,
    start: time::Instant,
}

// === impl Trace ===

impl<S> Trace<S> {
    pub fn new(hooks: impl Into<Arc<TraceHooks>>, inner: S) -> Self {
        let hooks = hooks.into();
        debug!(?hooks, "Tracing client requests");
        Self { hooks, inner }
    }

    pub fn layer(hooks: impl Into<Arc<TraceHooks>>) -> impl layer::Layer<S, Service = Self> + Clone {
        let hooks = hooks.into();
        layer::layer_fn(move |inner| Self::new(hooks.clone(), inner))
    }
}

impl<S, B> tower::Service<http::Request<B>> for Trace<S>
where
    S: tower::Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let listener = HookListener {
            hooks: self.hooks.clone(),
            start: time::Instant::now(),
        };
        ClientTrace::attach(&mut req, Arc::new(listener));
        self.inner.call(req)
    }
}

// === impl HookListener ===

impl HookListener {
    fn fire(&self, phase: Phase) {
        if let Some(hook) = self.hooks.hook(phase) {
            let secs = self.start.elapsed().as_secs_f64();
            trace!(%phase, secs, "Lifecycle event");
            hook(secs);
        }
    }

    fn fire_ok(&self, phase: Phase, result: Result<(), &Error>) {
        match result {
            Ok(()) => self.fire(phase),
            Err(error) => trace!(%phase, %error, "Lifecycle event failed; not timed"),
        }
    }
}

impl TraceListener for HookListener {
    fn got_conn(&self, _: &GotConnInfo) {
        self.fire(Phase::GotConn)
    }

    fn put_idle_conn(&self, result: Result<(), &Error>) {
        self.fire_ok(Phase::PutIdleConn, result)
    }

    fn got_first_response_byte(&self) {
        self.fire(Phase::GotFirstResponseByte)
    }

    fn got_100_continue(&self) {
        self.fire(Phase::Got100Continue)
    }

    fn dns_start(&self, _: &str) {
        self.fire(Phase::DnsStart)
    }

    fn dns_done(&self, _: &[IpAddr]) {
        self.fire(Phase::DnsDone)
    }

    fn connect_start(&self, _: &SocketAddr) {
        self.fire(Phase::ConnectStart)
    }

    fn connect_done(&self, _: &SocketAddr, result: Result<(), &Error>) {
        self.fire_ok(Phase::ConnectDone, result)
    }

    fn tls_handshake_start(&self) {
        self.fire(Phase::TlsHandshakeStart)
    }

    fn tls_handshake_done(&self, result: Result<(), &Error>) {
        self.fire_ok(Phase::TlsHandshakeDone, result)
    }

    fn wrote_headers(&self) {
        self.fire(Phase::WroteHeaders)
    }

    fn wait_100_continue(&self) {
        self.fire(Phase::Wait100Continue)
    }

    fn wrote_request(&self) {
        self.fire(Phase::WroteRequest)
    }
}
