//! `tracing-subscriber` layer that emits trace-enriched log records.

use crate::bridge::{ContextBridge, DIAGNOSTICS_TARGET};
use crate::sink::RecordSink;
use crate::source::{CurrentContext, FixedContext};
use opentelemetry::trace::{SamplingDecision, SpanContext, TraceContextExt, TraceFlags};
use otelog_core::{Level, LogRecord};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_opentelemetry::OtelData;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Turns every `tracing` event into a [`LogRecord`], enriches it with the
/// identifiers of the active span and hands it to a sink.
///
/// Register it explicitly when building the subscriber:
///
/// ```no_run
/// use otelog_bridge::{BridgeLayer, ContextBridge, JsonSink};
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let layer = BridgeLayer::new(ContextBridge::default(), JsonSink::stdout("stdout"));
/// let subscriber = tracing_subscriber::registry().with(layer);
/// tracing::subscriber::set_global_default(subscriber).unwrap();
/// ```
pub struct BridgeLayer<K> {
    bridge: Arc<ContextBridge>,
    sink: K,
}

impl<K: RecordSink> BridgeLayer<K> {
    pub fn new(bridge: ContextBridge, sink: K) -> Self {
        Self::shared(Arc::new(bridge), sink)
    }

    /// Build a layer around a bridge shared with other components.
    pub fn shared(bridge: Arc<ContextBridge>, sink: K) -> Self {
        Self { bridge, sink }
    }

    pub fn bridge(&self) -> &ContextBridge {
        &self.bridge
    }
}

impl<K> fmt::Debug for BridgeLayer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeLayer")
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl<S, K> Layer<S> for BridgeLayer<K>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    K: RecordSink + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() == DIAGNOSTICS_TARGET {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(
            Level::from(*metadata.level()),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        record.fields = visitor.fields;

        // Span extensions must be released before the bridge can emit diagnostics.
        match event_span_context(event, &ctx) {
            Some(span_context) => {
                self.bridge
                    .enrich_from(&mut record, &FixedContext::new(span_context));
            }
            None => {
                self.bridge.enrich_from(&mut record, &CurrentContext);
            }
        }

        if let Err(err) = self.sink.emit(&record) {
            self.bridge.diagnostics().sink_failure(&err);
        }
    }
}

/// Identifiers of the OpenTelemetry span backing the event's `tracing` span.
fn event_span_context<S>(event: &Event<'_>, ctx: &Context<'_, S>) -> Option<SpanContext>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let span = ctx.event_span(event)?;
    let extensions = span.extensions();
    let otel = extensions.get::<OtelData>()?;

    let parent = otel.parent_cx.span();
    let parent_context = parent.span_context();

    // Root spans carry their own trace id; children inherit the parent's.
    let trace_id = otel
        .builder
        .trace_id
        .or_else(|| parent_context.is_valid().then(|| parent_context.trace_id()))?;
    let span_id = otel.builder.span_id?;

    let sampled = match &otel.builder.sampling_result {
        Some(result) => matches!(result.decision, SamplingDecision::RecordAndSample),
        None => parent_context.is_sampled(),
    };
    let flags = if sampled {
        TraceFlags::SAMPLED
    } else {
        TraceFlags::default()
    };

    Some(SpanContext::new(
        trace_id,
        span_id,
        flags,
        false,
        parent_context.trace_state().clone(),
    ))
}

#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl RecordVisitor {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields
                .insert(LogRecord::field_key(field.name()).into_owned(), value);
        }
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}
