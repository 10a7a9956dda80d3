//! `tracing-subscriber` layer forwarding events to a [`TraceSink`].
//!
//! The names of the spans enclosing an event, outermost first, become its
//! operation stack, so `Path` mirrors the span tree.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::filter::is_ignored_target;
use crate::level::EventLevel;
use crate::log_entry::TraceEvent;
use crate::sink::TraceSink;

/// Layer sending each enabled event to a sink.
pub struct SplunkLayer {
    sink: Arc<dyn TraceSink>,
    level: LevelFilter,
}

impl SplunkLayer {
    pub fn new(sink: Arc<dyn TraceSink>, level: LevelFilter) -> Self {
        Self { sink, level }
    }
}

/// Collects the `message` field, appending other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", field.name(), value);
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field, format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field, format_args!("{value:?}"));
        }
    }
}

impl<S> Layer<S> for SplunkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.level || is_ignored_target(metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let stack = ctx
            .event_scope(event)
            .map(|scope| {
                scope
                    .from_root()
                    .map(|span| span.name().to_owned())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let event = TraceEvent::new(EventLevel::from(*metadata.level()), visitor.finish())
            .with_operation_stack(stack);
        self.sink.record_event(event);
    }
}
