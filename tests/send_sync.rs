//! Send/Sync guarantees for core types.

use rstest::rstest;
use splunk_trace_sink::{
    HttpTransport, LogicalOperation, SinkConfig, SinkConfigBuilder, SplunkLogAdapter, SplunkSink,
    TraceEvent,
};
use static_assertions::{assert_impl_all, assert_not_impl_any};

#[rstest]
fn builders_are_send_sync() {
    assert_impl_all!(SinkConfigBuilder: Send, Sync);
    assert_impl_all!(SinkConfig: Send, Sync);
}

#[rstest]
fn components_are_send_sync() {
    assert_impl_all!(SplunkSink: Send, Sync);
    assert_impl_all!(SplunkLogAdapter: Send, Sync);
    assert_impl_all!(TraceEvent: Send, Sync);
    assert_impl_all!(HttpTransport: Send);
}

#[rstest]
fn operation_guard_stays_on_its_thread() {
    assert_not_impl_any!(LogicalOperation: Send, Sync);
}
