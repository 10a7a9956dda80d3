//! Compatibility bridge for the Rust `log` crate.
//!
//! [`SplunkLogAdapter`] implements `log::Log` and forwards records to a
//! [`TraceSink`] as structured events. The path of each event is the calling
//! thread's [`LogicalOperation`](crate::scope::LogicalOperation) stack.
//! Targets listed in [`IGNORED_TARGETS`](crate::filter::IGNORED_TARGETS) are
//! skipped.

use std::sync::Arc;

use log::{LevelFilter, Metadata, Record};

use crate::filter::is_ignored_target;
use crate::level::EventLevel;
use crate::log_entry::TraceEvent;
use crate::scope;
use crate::sink::TraceSink;

/// Adapter implementing the Rust `log::Log` trait.
pub struct SplunkLogAdapter {
    sink: Arc<dyn TraceSink>,
    level: LevelFilter,
}

impl SplunkLogAdapter {
    pub fn new(sink: Arc<dyn TraceSink>, level: LevelFilter) -> Self {
        Self { sink, level }
    }
}

impl log::Log for SplunkLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && !is_ignored_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let event = TraceEvent::new(EventLevel::from(record.level()), record.args().to_string())
            .with_operation_stack(scope::current_stack());
        self.sink.record_event(event);
    }

    fn flush(&self) {
        self.sink.flush();
    }
}

/// Install an adapter for `sink` as the global Rust logger.
///
/// # Errors
///
/// Returns [`log::SetLoggerError`] when another global logger is already
/// set.
pub fn install_global_logger(
    sink: Arc<dyn TraceSink>,
    level: LevelFilter,
) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(SplunkLogAdapter::new(sink, level)))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Unit tests for the `log` crate bridge.

    use super::*;
    use crate::error::InitError;
    use crate::scope::LogicalOperation;
    use log::Log;
    use parking_lot::Mutex;
    use rstest::{fixture, rstest};

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<TraceEvent>>,
        flushes: Mutex<usize>,
    }

    impl TraceSink for CollectingSink {
        fn open(&self) -> Result<(), InitError> {
            Ok(())
        }

        fn record_event(&self, event: TraceEvent) {
            self.events.lock().push(event);
        }

        fn write(&self, _text: &str) {}

        fn write_line(&self, _text: &str) {}

        fn flush(&self) -> bool {
            *self.flushes.lock() += 1;
            true
        }

        fn close(&self) {}
    }

    #[fixture]
    fn sink() -> Arc<CollectingSink> {
        Arc::new(CollectingSink::default())
    }

    fn emit(adapter: &SplunkLogAdapter, level: log::Level, target: &str, message: &str) {
        adapter.log(
            &Record::builder()
                .args(format_args!("{message}"))
                .level(level)
                .target(target)
                .build(),
        );
    }

    #[rstest]
    fn records_become_events(sink: Arc<CollectingSink>) {
        let adapter = SplunkLogAdapter::new(sink.clone(), LevelFilter::Info);
        emit(&adapter, log::Level::Warn, "app::db", "slow query");

        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, EventLevel::Warning);
        assert_eq!(events[0].message, "slow query");
        assert!(events[0].operation_stack.is_empty());
    }

    #[rstest]
    fn operation_stack_is_attached(sink: Arc<CollectingSink>) {
        let adapter = SplunkLogAdapter::new(sink.clone(), LevelFilter::Info);
        let _main = LogicalOperation::start("Main");
        let _inner = LogicalOperation::start("TestFunction");
        emit(&adapter, log::Level::Info, "app", "inside");
        assert_eq!(
            sink.events.lock()[0].operation_stack,
            vec!["Main".to_string(), "TestFunction".to_string()]
        );
    }

    #[rstest]
    fn records_above_level_are_skipped(sink: Arc<CollectingSink>) {
        let adapter = SplunkLogAdapter::new(sink.clone(), LevelFilter::Info);
        emit(&adapter, log::Level::Debug, "app", "noise");
        assert!(sink.events.lock().is_empty());
    }

    #[rstest]
    #[case("splunk_trace_sink")]
    #[case("splunk_trace_sink::worker")]
    #[case("ureq::pool")]
    #[case("rustls::client::hs")]
    fn own_stack_is_ignored(sink: Arc<CollectingSink>, #[case] target: &str) {
        let adapter = SplunkLogAdapter::new(sink.clone(), LevelFilter::Trace);
        emit(&adapter, log::Level::Error, target, "loop");
        assert!(sink.events.lock().is_empty());
    }

    #[rstest]
    fn flush_reaches_sink(sink: Arc<CollectingSink>) {
        let adapter = SplunkLogAdapter::new(sink.clone(), LevelFilter::Info);
        adapter.flush();
        assert_eq!(*sink.flushes.lock(), 1);
    }
}
