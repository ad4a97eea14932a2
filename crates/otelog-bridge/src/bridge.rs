//! Context bridge: attaches the active trace context to log records.

use crate::source::ContextSource;
use otelog_core::{Error, FieldInsert, LogRecord, TraceContext};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Target used for the bridge's own diagnostics.
pub const DIAGNOSTICS_TARGET: &str = "otelog::diagnostics";

/// Field names used when enriching a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    #[serde(default = "default_trace_id")]
    pub trace_id: String,
    #[serde(default = "default_span_id")]
    pub span_id: String,
    #[serde(default = "default_sampled")]
    pub sampled: String,
}

fn default_trace_id() -> String {
    "trace_id".to_string()
}

fn default_span_id() -> String {
    "span_id".to_string()
}

fn default_sampled() -> String {
    "sampled".to_string()
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            trace_id: default_trace_id(),
            span_id: default_span_id(),
            sampled: default_sampled(),
        }
    }
}

/// Result of enriching one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Fields newly written to the record.
    pub added: usize,
    /// Fields skipped because the record already held a different value.
    pub collisions: usize,
}

/// Warn-once flags owned by a bridge instance.
#[derive(Debug, Default)]
pub struct Diagnostics {
    context_failure: AtomicBool,
    field_collision: AtomicBool,
    sink_failure: AtomicBool,
}

impl Diagnostics {
    pub fn context_failure_reported(&self) -> bool {
        self.context_failure.load(Ordering::Relaxed)
    }

    pub fn field_collision_reported(&self) -> bool {
        self.field_collision.load(Ordering::Relaxed)
    }

    pub fn sink_failure_reported(&self) -> bool {
        self.sink_failure.load(Ordering::Relaxed)
    }

    pub(crate) fn context_failure(&self, err: &Error) {
        if !self.context_failure.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                error = %err,
                "failed to read trace context, log records will not be enriched"
            );
        }
    }

    pub(crate) fn field_collision(&self, key: &str, existing: &str) {
        if !self.field_collision.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                field = key,
                existing = existing,
                "log record already has a field with this name, keeping the original value"
            );
        }
    }

    pub(crate) fn sink_failure(&self, err: &Error) {
        if !self.sink_failure.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                error = %err,
                "failed to emit log record, further failures are silent"
            );
        }
    }
}

/// Injects trace and span identifiers into log records.
///
/// The bridge never fails the logging call: a context that cannot be read
/// is treated as absent, and colliding fields are left untouched. Each of
/// those conditions is reported at most once per bridge.
#[derive(Debug, Default)]
pub struct ContextBridge {
    names: FieldNames,
    include_sampled: bool,
    diagnostics: Diagnostics,
}

impl ContextBridge {
    pub fn new(names: FieldNames) -> Self {
        Self {
            names,
            include_sampled: false,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Also write the sampled flag as a field.
    pub fn with_sampled(mut self, include: bool) -> Self {
        self.include_sampled = include;
        self
    }

    pub fn field_names(&self) -> &FieldNames {
        &self.names
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Snapshot the ambient context exposed by `source`.
    pub fn capture(&self, source: &dyn ContextSource) -> Option<TraceContext> {
        match source.span_context() {
            Ok(Some(span_context)) => TraceContext::from_span_context(&span_context),
            Ok(None) => None,
            Err(err) => {
                self.diagnostics.context_failure(&err);
                None
            }
        }
    }

    /// Merge the identifiers of `context` into `record`.
    pub fn enrich(&self, record: &mut LogRecord, context: Option<&TraceContext>) -> Enrichment {
        let mut outcome = Enrichment::default();
        let Some(context) = context else {
            return outcome;
        };

        self.apply(record, &self.names.trace_id, context.trace_id_hex(), &mut outcome);
        self.apply(record, &self.names.span_id, context.span_id_hex(), &mut outcome);
        if self.include_sampled {
            self.apply(
                record,
                &self.names.sampled,
                context.is_sampled().to_string(),
                &mut outcome,
            );
        }

        outcome
    }

    /// Capture from `source` and enrich `record` in one step.
    pub fn enrich_from(&self, record: &mut LogRecord, source: &dyn ContextSource) -> Enrichment {
        let context = self.capture(source);
        self.enrich(record, context.as_ref())
    }

    fn apply(&self, record: &mut LogRecord, key: &str, value: String, outcome: &mut Enrichment) {
        match record.insert_field_if_absent(key, value) {
            FieldInsert::Inserted => outcome.added += 1,
            FieldInsert::Unchanged => {}
            FieldInsert::Collision { existing } => {
                outcome.collisions += 1;
                self.diagnostics.field_collision(key, &existing);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FixedContext;
    use otelog_core::Level;
    use opentelemetry::trace::SpanContext;

    const TRACE: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
    const SPAN: &str = "00f067aa0ba902b7";

    struct FailingSource;

    impl ContextSource for FailingSource {
        fn span_context(&self) -> otelog_core::Result<Option<SpanContext>> {
            Err(Error::ContextUnavailable("thread local destroyed".to_string()))
        }
    }

    fn record() -> LogRecord {
        LogRecord::new(Level::Info, "test", "hello")
    }

    fn active() -> TraceContext {
        TraceContext::from_hex(TRACE, SPAN, true).unwrap()
    }

    #[test]
    fn test_enrich_adds_ids() {
        let bridge = ContextBridge::default();
        let mut rec = record();

        let outcome = bridge.enrich(&mut rec, Some(&active()));

        assert_eq!(outcome.added, 2);
        assert_eq!(rec.field("trace_id"), Some(TRACE));
        assert_eq!(rec.field("span_id"), Some(SPAN));
        assert_eq!(rec.field("sampled"), None);
    }

    #[test]
    fn test_no_context_leaves_record_unchanged() {
        let bridge = ContextBridge::default();
        let mut rec = record();
        let before = rec.clone();

        let outcome = bridge.enrich(&mut rec, None);

        assert_eq!(outcome, Enrichment::default());
        assert_eq!(rec, before);
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let bridge = ContextBridge::default().with_sampled(true);
        let mut once = record();
        bridge.enrich(&mut once, Some(&active()));

        let mut twice = once.clone();
        let outcome = bridge.enrich(&mut twice, Some(&active()));

        assert_eq!(twice, once);
        assert_eq!(outcome, Enrichment::default());
        assert!(!bridge.diagnostics().field_collision_reported());
    }

    #[test]
    fn test_collision_keeps_original() {
        let bridge = ContextBridge::default();
        let mut rec = record().with_field("trace_id", "user-supplied");

        let outcome = bridge.enrich(&mut rec, Some(&active()));

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.collisions, 1);
        assert_eq!(rec.field("trace_id"), Some("user-supplied"));
        assert_eq!(rec.field("span_id"), Some(SPAN));
        assert!(bridge.diagnostics().field_collision_reported());
    }

    #[test]
    fn test_custom_field_names_and_sampled() {
        let names = FieldNames {
            trace_id: "otel.trace_id".to_string(),
            span_id: "otel.span_id".to_string(),
            sampled: "otel.sampled".to_string(),
        };
        let bridge = ContextBridge::new(names).with_sampled(true);
        let mut rec = record();

        bridge.enrich(&mut rec, Some(&active()));

        assert_eq!(rec.field("otel.trace_id"), Some(TRACE));
        assert_eq!(rec.field("otel.span_id"), Some(SPAN));
        assert_eq!(rec.field("otel.sampled"), Some("true"));
        assert_eq!(rec.field("trace_id"), None);
    }

    #[test]
    fn test_capture_invalid_context_is_none() {
        let bridge = ContextBridge::default();
        let source = FixedContext::new(SpanContext::empty_context());

        assert_eq!(bridge.capture(&source), None);
        assert!(!bridge.diagnostics().context_failure_reported());
    }

    #[test]
    fn test_capture_failure_degrades_to_none() {
        let bridge = ContextBridge::default();
        let mut rec = record();

        let outcome = bridge.enrich_from(&mut rec, &FailingSource);

        assert_eq!(outcome, Enrichment::default());
        assert!(rec.fields.is_empty());
        assert!(bridge.diagnostics().context_failure_reported());
    }

    #[test]
    fn test_enrich_from_fixed_source() {
        let bridge = ContextBridge::default();
        let source = FixedContext::new(active().to_span_context());
        let mut rec = record();

        bridge.enrich_from(&mut rec, &source);

        assert_eq!(rec.field("trace_id"), Some(TRACE));
    }

    #[test]
    fn test_diagnostics_flags_are_per_instance() {
        let first = ContextBridge::default();
        let second = ContextBridge::default();

        first.capture(&FailingSource);

        assert!(first.diagnostics().context_failure_reported());
        assert!(!second.diagnostics().context_failure_reported());
    }
}
