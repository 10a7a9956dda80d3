//! End-to-end delivery against a local mock collector over plain HTTP.

mod test_utils;

use std::time::Duration;

use rstest::rstest;
use splunk_trace_sink::http::request_url;
use splunk_trace_sink::test_utils::test_config_builder;
use splunk_trace_sink::{
    EventLevel, HttpTransport, SinkConfig, SplunkSink, TraceEvent, TraceSink,
};

use test_utils::spawn_collector;

const WAIT: Duration = Duration::from_secs(5);

fn sink_for(addr: std::net::SocketAddr, builder_tz: Option<&str>) -> SplunkSink {
    let mut builder = test_config_builder()
        .with_host_name(addr.to_string())
        .with_project_id("proj1")
        .with_source("integration")
        .with_machine_name("box01");
    if let Some(tz) = builder_tz {
        builder = builder.with_tz(tz);
    }
    let config: SinkConfig = builder.build().expect("valid config");
    let url = request_url(&config, "box01").replacen("https://", "http://", 1);
    let transport = HttpTransport::new(HttpTransport::plain_agent(WAIT), url, &config.access_token);
    SplunkSink::with_transport(config, transport)
}

#[rstest]
fn posts_line_delimited_json_with_basic_auth() {
    let (addr, rx) = spawn_collector(vec![200]);
    let sink = sink_for(addr, None);
    sink.record_event(
        TraceEvent::new(EventLevel::Information, "say \"hi\"")
            .with_operation_stack(vec!["Main".into(), "TestFunction".into()]),
    );

    let request = rx.recv_timeout(WAIT).expect("request");
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.target,
        "/1/inputs/http?index=proj1&sourcetype=json_predefined_timestamp&host=box01&source=integration"
    );
    // "x:test-token"
    assert_eq!(request.header("authorization"), Some("Basic eDp0ZXN0LXRva2Vu"));
    assert_eq!(request.header("content-type"), Some("application/json"));

    let line = request.body.lines().next().expect("one line");
    let value: serde_json::Value = serde_json::from_str(line).expect("json line");
    assert_eq!(value["Message"], "say \"hi\"");
    assert_eq!(value["Level"], "Information");
    assert_eq!(value["Path"], "Main/TestFunction");
    assert!(request.body.ends_with('\n'));

    assert!(sink.flush());
    assert_eq!(sink.stats().entries_delivered, 1);
}

#[rstest]
fn tz_is_forwarded_when_configured() {
    let (addr, rx) = spawn_collector(vec![200]);
    let sink = sink_for(addr, Some("Europe/Oslo"));
    sink.write_line("with tz");

    let request = rx.recv_timeout(WAIT).expect("request");
    assert!(request.target.ends_with("&tz=Europe/Oslo"), "{}", request.target);
}

#[rstest]
fn rejected_batch_is_dropped_and_next_batch_is_sent() {
    let (addr, rx) = spawn_collector(vec![503, 200]);
    let sink = sink_for(addr, None);

    sink.write_line("first");
    let first = rx.recv_timeout(WAIT).expect("first request");
    assert!(first.body.contains("\"first\""));
    assert!(sink.flush());

    sink.write_line("second");
    let second = rx.recv_timeout(WAIT).expect("second request");
    assert!(second.body.contains("\"second\""));
    assert!(!second.body.contains("\"first\""));
    assert!(sink.flush());

    let stats = sink.stats();
    assert_eq!(stats.entries_failed, 1);
    assert_eq!(stats.entries_delivered, 1);
}

#[rstest]
fn unreachable_collector_counts_a_failure() {
    let addr = test_utils::tcp_listener()
        .local_addr()
        .expect("listener address");
    // The listener is dropped here, so connections are refused.
    let sink = sink_for(addr, None);
    sink.write_line("nowhere");
    assert!(sink.flush());
    assert_eq!(sink.stats().entries_failed, 1);
}
