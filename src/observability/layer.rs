//! `tracing` layer that encodes events and writes them to sinks.
//!
//! Facade calls arrive as events under [`FACADE_TARGET`] carrying the
//! severity and caller as fields. The `with` context of a derived logger lives
//! in the extensions of a span that is the explicit parent of its events. Any
//! other event (from `tracing::info!` and friends once a logger is installed
//! globally) is encoded the same way, with its level mapped onto [`Level`].

use std::backtrace::Backtrace;
use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Span, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::{LookupSpan, Registry};
use tracing_subscriber::Layer;

use super::encoder::{Encoder, Record};
use super::field::Fields;
use super::level::{AtomicLevel, Level};
use super::sink::SinkSet;

/// Target of events emitted by [`Logger`](super::Logger).
pub const FACADE_TARGET: &str = "service_kit::logger";

pub(crate) const SEVERITY_FIELD: &str = "severity";
pub(crate) const CALLER_FIELD: &str = "caller";

/// Create the span that carries `context` for events emitted under `dispatch`.
pub(crate) fn context_span(dispatch: &tracing::Dispatch, context: &Fields) -> Span {
    if context.is_empty() {
        return Span::none();
    }
    let span = tracing::dispatcher::with_default(dispatch, || {
        tracing::span!(target: FACADE_TARGET, parent: None, tracing::Level::INFO, "with")
    });
    span.with_subscriber(|(id, dispatch)| {
        let span = dispatch
            .downcast_ref::<Registry>()
            .and_then(|registry| registry.span(id));
        if let Some(span) = span {
            span.extensions_mut().replace(context.clone());
        }
    });
    span
}

pub(crate) struct RecordLayer {
    pub(crate) encoder: Encoder,
    pub(crate) sinks: Arc<SinkSet>,
    pub(crate) level: AtomicLevel,
    pub(crate) initial_fields: Map<String, Value>,
    pub(crate) with_caller: bool,
    pub(crate) stacktrace_from: Option<Level>,
}

impl<S> Layer<S> for RecordLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    // The threshold can change at runtime, so callsite interest is never cached.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // Facade events are filtered before dispatch, with the full level range.
        metadata.target() == FACADE_TARGET
            || self.level.enabled(Level::from_tracing(metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let facade = metadata.target() == FACADE_TARGET;

        let mut visitor = RecordVisitor::new(facade);
        event.record(&mut visitor);

        let level = visitor
            .severity
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| Level::from_tracing(metadata.level()));
        if !self.level.enabled(level) {
            return;
        }

        let caller = if !self.with_caller {
            None
        } else if visitor.caller.is_some() {
            visitor.caller
        } else {
            match (metadata.file(), metadata.line()) {
                (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
                _ => None,
            }
        };

        let mut fields = self.initial_fields.clone();
        if facade {
            if let Some(span) = ctx.event_span(event) {
                if let Some(context) = span.extensions().get::<Fields>() {
                    fields.extend(context.to_map());
                }
            }
        }
        fields.extend(visitor.fields);

        let stacktrace = self
            .stacktrace_from
            .filter(|from| level >= *from)
            .map(|_| Backtrace::force_capture().to_string());

        let message = visitor.message.unwrap_or_default();
        let line = self.encoder.encode(Record {
            level,
            time: chrono::Utc::now(),
            caller: caller.as_deref(),
            message: &message,
            fields,
            stacktrace,
        });
        self.sinks.write(&line);
    }
}

/// Collects event fields into JSON values.
struct RecordVisitor {
    facade: bool,
    message: Option<String>,
    severity: Option<String>,
    caller: Option<String>,
    fields: Map<String, Value>,
}

impl RecordVisitor {
    fn new(facade: bool) -> Self {
        Self {
            facade,
            message: None,
            severity: None,
            caller: None,
            fields: Map::new(),
        }
    }

    /// Route a textual value to the reserved slots, or to the field map.
    fn record_text(&mut self, field: &Field, value: String) {
        match (field.name(), self.facade) {
            ("message", _) => self.message = Some(value),
            (SEVERITY_FIELD, true) => self.severity = Some(value),
            (CALLER_FIELD, true) => self.caller = Some(value),
            (name, _) => {
                self.fields.insert(name.to_string(), Value::String(value));
            }
        }
    }
}

impl Visit for RecordVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{:?}", value);
        self.record_text(field, buf);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields
                .insert(field.name().to_string(), Value::Number(n));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::encoder::Encoding;
    use crate::observability::sink::{register_sink, MemorySink};
    use tracing_subscriber::prelude::*;

    fn layer(scheme: &str, threshold: Level) -> (RecordLayer, MemorySink) {
        let sink = MemorySink::new();
        register_sink(scheme, sink.factory()).unwrap();
        let sinks = SinkSet::open(&[format!("{}://", scheme)], &[]).unwrap();
        let layer = RecordLayer {
            encoder: Encoder::new(Encoding::Json, false),
            sinks: Arc::new(sinks),
            level: AtomicLevel::new(threshold),
            initial_fields: Map::new(),
            with_caller: true,
            stacktrace_from: None,
        };
        (layer, sink)
    }

    #[test]
    fn plain_tracing_events_are_encoded() {
        let (layer, sink) = layer("layer-test-plain", Level::Info);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::warn!(count = 42, "Warning with field");
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        let value: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["level"], "warn");
        assert_eq!(value["msg"], "Warning with field");
        assert_eq!(value["count"], 42);
        assert!(value["caller"].as_str().unwrap().contains("layer.rs"));
    }

    #[test]
    fn reserved_names_only_apply_to_facade_events() {
        let (layer, sink) = layer("layer-test-reserved", Level::Debug);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(severity = "fatal", "not a facade event");
            tracing::event!(
                target: FACADE_TARGET,
                tracing::Level::ERROR,
                severity = "panic",
                caller = "app.rs:1",
                "from facade"
            );
        });

        let lines = sink.lines();
        let plain: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(plain["level"], "info");
        assert_eq!(plain["severity"], "fatal");

        let facade: Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(facade["level"], "panic");
        assert_eq!(facade["caller"], "app.rs:1");
        assert!(facade.get("severity").is_none());
    }

    #[test]
    fn context_comes_from_the_parent_span() {
        let (layer, sink) = layer("layer-test-context", Level::Debug);
        let dispatch = tracing::Dispatch::new(tracing_subscriber::registry().with(layer));
        let context: Fields = [crate::observability::Field::new("user", "alice")]
            .into_iter()
            .collect();
        let span = context_span(&dispatch, &context);

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::event!(
                target: FACADE_TARGET,
                parent: &span,
                tracing::Level::INFO,
                severity = "info",
                "with context"
            );
            tracing::event!(
                target: FACADE_TARGET,
                parent: None,
                tracing::Level::INFO,
                severity = "info",
                "without context"
            );
        });

        let records: Vec<Value> = sink
            .lines()
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records[0]["user"], "alice");
        assert!(records[1].get("user").is_none());
    }
}
