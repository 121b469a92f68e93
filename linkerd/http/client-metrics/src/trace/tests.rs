use super::*;
use crate::{
    labels::LabelError,
    round_trip::round_trip_fn,
    test_util::{self, MockSink},
};
use parking_lot::Mutex;
use tokio::time;
use tower::{Layer, ServiceExt};

type Events = Arc<Mutex<Vec<(Phase, f64)>>>;

fn hooks_for(events: &Events, phases: &[Phase]) -> TraceHooks {
    phases.iter().fold(TraceHooks::default(), |hooks, &phase| {
        let events = events.clone();
        hooks.on(phase, move |secs| events.lock().push((phase, secs)))
    })
}

fn assert_secs(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}s; got {actual}s"
    );
}

fn conn_err() -> Error {
    Error::from("connection reset by peer")
}

#[tokio::test(start_paused = true)]
async fn times_phases_since_request_start() {
    let _trace = test_util::trace_init();

    let events = Events::default();
    let hooks = hooks_for(
        &events,
        &[
            Phase::DnsStart,
            Phase::DnsDone,
            Phase::ConnectStart,
            Phase::ConnectDone,
            Phase::GotConn,
            Phase::WroteRequest,
            Phase::GotFirstResponseByte,
        ],
    );

    let addr = SocketAddr::from(([192, 0, 2, 1], 80));
    let client = Trace::new(
        hooks,
        round_trip_fn(move |req: http::Request<()>| {
            let trace = ClientTrace::get(&req).cloned().expect("trace must be set");
            async move {
                trace.dns_start("example.com");
                time::advance(time::Duration::from_millis(5)).await;
                trace.dns_done(&[addr.ip()]);
                trace.connect_start(&addr);
                time::advance(time::Duration::from_millis(10)).await;
                trace.connect_done(&addr, Ok(()));
                trace.tls_handshake_start();
                trace.got_conn(&GotConnInfo::default());
                trace.wrote_headers();
                trace.wrote_request();
                time::advance(time::Duration::from_millis(20)).await;
                trace.got_first_response_byte();
                Ok::<_, Error>(http::Response::new(()))
            }
        }),
    );

    client
        .oneshot(test_util::get("http://example.com/"))
        .await
        .expect("request must succeed");

    let events = events.lock().clone();
    let phases = events.iter().map(|(p, _)| *p).collect::<Vec<_>>();
    assert_eq!(
        phases,
        [
            Phase::DnsStart,
            Phase::DnsDone,
            Phase::ConnectStart,
            Phase::ConnectDone,
            Phase::GotConn,
            Phase::WroteRequest,
            Phase::GotFirstResponseByte,
        ],
        "events must be reported in the order they fire"
    );
    let expected = [0.0, 0.005, 0.005, 0.015, 0.015, 0.015, 0.035];
    for ((_, actual), expected) in events.iter().zip(expected) {
        assert_secs(*actual, expected);
    }
    assert!(
        events.windows(2).all(|w| w[0].1 <= w[1].1),
        "elapsed times must not decrease: {events:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn failed_phases_are_not_timed() {
    let _trace = test_util::trace_init();

    let events = Events::default();
    let hooks = hooks_for(
        &events,
        &[
            Phase::PutIdleConn,
            Phase::ConnectDone,
            Phase::TlsHandshakeDone,
        ],
    );

    let addr = SocketAddr::from(([192, 0, 2, 1], 443));
    let client = Trace::new(
        hooks,
        round_trip_fn(move |req: http::Request<()>| {
            let trace = ClientTrace::get(&req).cloned().expect("trace must be set");
            async move {
                let err = conn_err();
                trace.connect_done(&addr, Err(&err));
                trace.tls_handshake_done(Err(&err));
                trace.put_idle_conn(Err(&err));
                time::advance(time::Duration::from_millis(3)).await;
                trace.connect_done(&addr, Ok(()));
                trace.tls_handshake_done(Ok(()));
                trace.put_idle_conn(Ok(()));
                Ok::<_, Error>(http::Response::new(()))
            }
        }),
    );

    client
        .oneshot(test_util::get("https://example.com/"))
        .await
        .expect("request must succeed");

    let events = events.lock().clone();
    assert_eq!(
        events.iter().map(|(p, _)| *p).collect::<Vec<_>>(),
        [Phase::ConnectDone, Phase::TlsHandshakeDone, Phase::PutIdleConn],
        "only successful events are timed"
    );
    for (_, secs) in events {
        assert_secs(secs, 0.003);
    }
}

#[tokio::test]
async fn passes_requests_and_responses_through() {
    let _trace = test_util::trace_init();

    let client = Trace::layer(TraceHooks::default()).layer(round_trip_fn(
        |req: http::Request<()>| async move {
            let trace = ClientTrace::get(&req).expect("trace must be set");
            assert_eq!(trace.len(), 1);
            // Unset hooks are never invoked.
            trace.dns_start("example.com");
            trace.got_first_response_byte();

            assert_eq!(req.method(), http::Method::DELETE);
            assert_eq!(req.uri().path(), "/item/7");
            let rsp = http::Response::builder()
                .status(http::StatusCode::ACCEPTED)
                .body("gone")
                .expect("response must be valid");
            Ok::<_, Error>(rsp)
        },
    ));

    let rsp = client
        .oneshot(test_util::request(http::Method::DELETE, "http://example.com/item/7"))
        .await
        .expect("request must succeed");
    assert_eq!(rsp.status(), http::StatusCode::ACCEPTED);
    assert_eq!(*rsp.body(), "gone");
}

#[tokio::test]
async fn propagates_errors() {
    let _trace = test_util::trace_init();

    let events = Events::default();
    let client = Trace::new(
        hooks_for(&events, &Phase::ALL),
        test_util::fail_with("no route to host"),
    );

    let err = client
        .oneshot(test_util::get("http://example.com/"))
        .await
        .expect_err("request must fail");
    assert_eq!(err.to_string(), "no route to host");
    assert!(events.lock().is_empty());
}

#[tokio::test]
async fn stacked_traces_are_independent() {
    let _trace = test_util::trace_init();

    let outer = Events::default();
    let inner = Events::default();
    let client = Trace::new(
        hooks_for(&outer, &[Phase::GotConn]),
        Trace::new(
            hooks_for(&inner, &[Phase::GotConn, Phase::WroteRequest]),
            round_trip_fn(|req: http::Request<()>| async move {
                let trace = ClientTrace::get(&req).expect("trace must be set");
                assert_eq!(trace.len(), 2, "each trace attaches a listener");
                trace.got_conn(&GotConnInfo {
                    reused: true,
                    was_idle: true,
                    idle_time: time::Duration::from_secs(1),
                });
                trace.wrote_request();
                Ok::<_, Error>(http::Response::new(()))
            }),
        ),
    );

    client
        .oneshot(test_util::get("http://example.com/"))
        .await
        .expect("request must succeed");

    let phases = |events: &Events| events.lock().iter().map(|(p, _)| *p).collect::<Vec<_>>();
    assert_eq!(phases(&outer), [Phase::GotConn]);
    assert_eq!(phases(&inner), [Phase::GotConn, Phase::WroteRequest]);
}

#[tokio::test(start_paused = true)]
async fn observes_events_by_name() {
    let _trace = test_util::trace_init();

    let sink = MockSink::new(&["event"]);
    let hooks = TraceHooks::observe_events(sink.clone()).expect("event label is supported");
    assert_eq!(hooks.phases().count(), Phase::ALL.len());

    let client = Trace::new(
        hooks,
        round_trip_fn(|req: http::Request<()>| {
            let trace = ClientTrace::get(&req).cloned().expect("trace must be set");
            async move {
                trace.tls_handshake_start();
                time::advance(time::Duration::from_millis(40)).await;
                trace.tls_handshake_done(Ok(()));
                Ok::<_, Error>(http::Response::new(()))
            }
        }),
    );

    client
        .oneshot(test_util::get("https://example.com/"))
        .await
        .expect("request must succeed");

    let events = sink.events();
    assert_eq!(
        sink.labels(),
        [vec!["tls_handshake_start"], vec!["tls_handshake_done"]]
    );
    assert_secs(events[0].0, 0.0);
    assert_secs(events[1].0, 0.040);
}

#[test]
fn observe_events_requires_event_label() {
    let err = TraceHooks::observe_events(MockSink::new(&["method"]))
        .expect_err("method is not an event label");
    assert_eq!(err, LabelError::EventLabel(vec!["method".to_string()]));

    assert!(TraceHooks::observe_events(MockSink::new(&["event", "code"])).is_err());
}

#[test]
fn phase_names() {
    assert_eq!(Phase::DnsStart.to_string(), "dns_start");
    assert_eq!(Phase::GotFirstResponseByte.as_str(), "got_first_response_byte");
    let names = Phase::ALL
        .iter()
        .map(Phase::as_str)
        .collect::<std::collections::HashSet<_>>();
    assert_eq!(names.len(), Phase::ALL.len(), "phase names must be unique");
}
