//! The bridge layer running next to `tracing-opentelemetry`.

use opentelemetry::trace::{TraceContextExt, TracerProvider as _};
use opentelemetry_sdk::trace::TracerProvider;
use otelog_bridge::{BridgeLayer, ContextBridge, FieldNames, Level, MemorySink, TraceContext};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

fn run_with_otel<F: FnOnce()>(sink: &MemorySink, bridge: ContextBridge, f: F) {
    let provider = TracerProvider::builder().build();
    let tracer = provider.tracer("layer-tests");

    // Keep the SDK's own diagnostics out of the captured records.
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("trace,opentelemetry=off"))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(BridgeLayer::new(bridge, sink.clone()));

    tracing::subscriber::with_default(subscriber, f);
}

fn span_ids(span: &tracing::Span) -> TraceContext {
    let cx = span.context();
    let otel_span = cx.span();
    TraceContext::from_span_context(otel_span.span_context()).expect("valid span context")
}

#[test]
fn test_event_in_span_carries_span_ids() {
    let sink = MemorySink::new("mem");
    let mut expected = None;

    run_with_otel(&sink, ContextBridge::default(), || {
        let span = tracing::info_span!("handle_request");
        let _entered = span.enter();
        tracing::info!(path = "/orders", "request received");
        expected = Some(span_ids(&span));
    });

    let expected = expected.expect("span ids");
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "request received");
    assert_eq!(records[0].field("path"), Some("/orders"));
    assert_eq!(
        records[0].field("trace_id"),
        Some(expected.trace_id_hex().as_str())
    );
    assert_eq!(
        records[0].field("span_id"),
        Some(expected.span_id_hex().as_str())
    );
}

#[test]
fn test_child_span_shares_trace_id() {
    let sink = MemorySink::new("mem");

    run_with_otel(&sink, ContextBridge::default(), || {
        let parent = tracing::info_span!("parent");
        let _p = parent.enter();
        tracing::info!("in parent");

        let child = tracing::info_span!("child");
        let _c = child.enter();
        tracing::info!("in child");
    });

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].field("trace_id"), records[1].field("trace_id"));
    assert!(records[0].field("trace_id").is_some());
    assert_ne!(records[0].field("span_id"), records[1].field("span_id"));
}

#[test]
fn test_event_outside_span_is_not_enriched() {
    let sink = MemorySink::new("mem");

    run_with_otel(&sink, ContextBridge::default(), || {
        tracing::error!(code = 500, "no span here");
    });

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Error);
    assert_eq!(records[0].field("code"), Some("500"));
    assert_eq!(records[0].field("trace_id"), None);
    assert_eq!(records[0].field("span_id"), None);
}

#[test]
fn test_custom_field_names() {
    let sink = MemorySink::new("mem");
    let names = FieldNames {
        trace_id: "traceId".to_string(),
        span_id: "spanId".to_string(),
        ..FieldNames::default()
    };

    run_with_otel(&sink, ContextBridge::new(names), || {
        let span = tracing::info_span!("job");
        let _entered = span.enter();
        tracing::debug!("working");
    });

    let record = &sink.records()[0];
    assert!(record.field("traceId").is_some());
    assert!(record.field("spanId").is_some());
    assert_eq!(record.field("trace_id"), None);
}
