//! Client connection lifecycle events.
//!
//! A [`ClientTrace`] is carried as a request extension. The connection
//! machinery that dispatches a request (a connector, a connection pool, a
//! client) looks it up with [`ClientTrace::get`] and reports each lifecycle
//! event as it happens. Instrumentation registers [`TraceListener`]s on the
//! request with [`ClientTrace::attach`].

use crate::Error;
use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

mod hooks;
mod service;

#[cfg(test)]
mod tests;

pub use self::{hooks::TraceHooks, service::Trace};

/// A point in a client request's connection lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// A connection was obtained, either new or from the idle pool.
    GotConn,
    /// A connection was returned to the idle pool.
    PutIdleConn,
    /// The first byte of the response headers was read.
    GotFirstResponseByte,
    /// A `100 Continue` response was received.
    Got100Continue,
    DnsStart,
    DnsDone,
    /// A new connection attempt began.
    ConnectStart,
    /// A connection attempt completed.
    ConnectDone,
    TlsHandshakeStart,
    TlsHandshakeDone,
    /// The request headers were written.
    WroteHeaders,
    /// The client is waiting for a `100 Continue` before writing the body.
    Wait100Continue,
    /// The request, including its body, was fully written.
    WroteRequest,
}

/// Describes a connection obtained for a request.
#[derive(Clone, Debug, Default)]
pub struct GotConnInfo {
    /// Whether the connection was previously used for another request.
    pub reused: bool,
    /// Whether the connection was obtained from the idle pool.
    pub was_idle: bool,
    /// How long the connection was idle, if it was.
    pub idle_time: Duration,
}

/// Receives the lifecycle events of a single client request.
///
/// Events that may fail carry a `Result`. All methods default to doing
/// nothing.
pub trait TraceListener: Send + Sync {
    fn got_conn(&self, _info: &GotConnInfo) {}

    fn put_idle_conn(&self, _result: Result<(), &Error>) {}

    fn got_first_response_byte(&self) {}

    fn got_100_continue(&self) {}

    fn dns_start(&self, _host: &str) {}

    fn dns_done(&self, _addrs: &[IpAddr]) {}

    fn connect_start(&self, _addr: &SocketAddr) {}

    fn connect_done(&self, _addr: &SocketAddr, _result: Result<(), &Error>) {}

    fn tls_handshake_start(&self) {}

    fn tls_handshake_done(&self, _result: Result<(), &Error>) {}

    fn wrote_headers(&self) {}

    fn wait_100_continue(&self) {}

    fn wrote_request(&self) {}
}

/// The set of listeners attached to a request.
///
/// Events are delivered to each listener in the order it was attached.
#[derive(Clone, Default)]
pub struct ClientTrace {
    listeners: Vec<Arc<dyn TraceListener>>,
}

// === impl Phase ===

impl Phase {
    pub const ALL: [Phase; 13] = [
        Self::GotConn,
        Self::PutIdleConn,
        Self::GotFirstResponseByte,
        Self::Got100Continue,
        Self::DnsStart,
        Self::DnsDone,
        Self::ConnectStart,
        Self::ConnectDone,
        Self::TlsHandshakeStart,
        Self::TlsHandshakeDone,
        Self::WroteHeaders,
        Self::Wait100Continue,
        Self::WroteRequest,
    ];

    /// The phase's name, as used in `event` labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GotConn => "got_conn",
            Self::PutIdleConn => "put_idle_conn",
            Self::GotFirstResponseByte => "got_first_response_byte",
            Self::Got100Continue => "got_100_continue",
            Self::DnsStart => "dns_start",
            Self::DnsDone => "dns_done",
            Self::ConnectStart => "connect_start",
            Self::ConnectDone => "connect_done",
            Self::TlsHandshakeStart => "tls_handshake_start",
            Self::TlsHandshakeDone => "tls_handshake_done",
            Self::WroteHeaders => "wrote_headers",
            Self::Wait100Continue => "wait_100_continue",
            Self::WroteRequest => "wrote_request",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl ClientTrace ===

impl ClientTrace {
    /// Returns the trace attached to `req`, if any.
    pub fn get<B>(req: &http::Request<B>) -> Option<&Self> {
        req.extensions().get::<Self>()
    }

    /// Attaches `listener` to `req`, after any listeners that are already
    /// attached.
    pub fn attach<B>(req: &mut http::Request<B>, listener: Arc<dyn TraceListener>) {
        let ext = req.extensions_mut();
        match ext.get_mut::<Self>() {
            Some(trace) => trace.listeners.push(listener),
            None => {
                ext.insert(Self {
                    listeners: vec![listener],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn each(&self, f: impl Fn(&dyn TraceListener)) {
        for listener in &self.listeners {
            f(&**listener)
        }
    }
}

impl TraceListener for ClientTrace {
    fn got_conn(&self, info: &GotConnInfo) {
        self.each(|l| l.got_conn(info))
    }

    fn put_idle_conn(&self, result: Result<(), &Error>) {
        self.each(|l| l.put_idle_conn(result))
    }

    fn got_first_response_byte(&self) {
        self.each(|l| l.got_first_response_byte())
    }

    fn got_100_continue(&self) {
        self.each(|l| l.got_100_continue())
    }

    fn dns_start(&self, host: &str) {
        self.each(|l| l.dns_start(host))
    }

    fn dns_done(&self, addrs: &[IpAddr]) {
        self.each(|l| l.dns_done(addrs))
    }

    fn connect_start(&self, addr: &SocketAddr) {
        self.each(|l| l.connect_start(addr))
    }

    fn connect_done(&self, addr: &SocketAddr, result: Result<(), &Error>) {
        self.each(|l| l.connect_done(addr, result))
    }

    fn tls_handshake_start(&self) {
        self.each(|l| l.tls_handshake_start())
    }

    fn tls_handshake_done(&self, result: Result<(), &Error>) {
        self.each(|l| l.tls_handshake_done(result))
    }

    fn wrote_headers(&self) {
        self.each(|l| l.wrote_headers())
    }

    fn wait_100_continue(&self) {
        self.each(|l| l.wait_100_continue())
    }

    fn wrote_request(&self) {
        self.each(|l| l.wrote_request())
    }
}

impl fmt::Debug for ClientTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientTrace")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
