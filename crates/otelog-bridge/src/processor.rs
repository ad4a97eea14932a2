//! Span processor that forwards span events to a log sink.

use crate::convert::SpanEventConverter;
use crate::sink::{RecordSink, SinkRegistry};
use opentelemetry::Context;
use opentelemetry::trace::TraceResult;
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::trace::{Span, SpanProcessor};
use otelog_core::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Forwards the events of every ended span to a named sink.
///
/// Events are converted with a [`SpanEventConverter`] once the span ends.
/// Spans without events produce nothing.
pub struct SpanEventProcessor {
    converter: SpanEventConverter,
    sink: Arc<dyn RecordSink>,
}

impl SpanEventProcessor {
    pub fn builder() -> SpanEventProcessorBuilder {
        SpanEventProcessorBuilder::default()
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    fn forward(&self, span: &SpanData) {
        if span.events.is_empty() {
            return;
        }

        let Ok(records) = self.converter.convert_events(span) else {
            return;
        };

        for record in &records {
            if let Err(err) = self.sink.emit(record) {
                self.converter.bridge().diagnostics().sink_failure(&err);
            }
        }
    }
}

impl fmt::Debug for SpanEventProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanEventProcessor")
            .field("converter", &self.converter)
            .field("sink", &self.sink.name())
            .finish()
    }
}

impl SpanProcessor for SpanEventProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) {
        self.forward(&span);
    }

    fn force_flush(&self) -> TraceResult<()> {
        Ok(())
    }

    fn shutdown(&self) -> TraceResult<()> {
        Ok(())
    }
}

/// Builder for [`SpanEventProcessor`].
#[derive(Debug, Default)]
pub struct SpanEventProcessorBuilder {
    converter: Option<SpanEventConverter>,
    target_sink_name: Option<String>,
    registry: Option<SinkRegistry>,
}

impl SpanEventProcessorBuilder {
    /// Converter for span events. Required.
    pub fn converter(mut self, converter: SpanEventConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Name of the sink receiving converted records. Required.
    pub fn target_sink_name(mut self, name: impl Into<String>) -> Self {
        self.target_sink_name = Some(name.into());
        self
    }

    /// Registry the target sink is resolved against. Required.
    pub fn registry(mut self, registry: SinkRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<SpanEventProcessor> {
        let converter = self.converter.ok_or(Error::MissingField("converter"))?;
        let name = self
            .target_sink_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(Error::MissingField("target_sink_name"))?;
        let registry = self.registry.ok_or(Error::MissingField("registry"))?;

        let sink = registry.get(&name)?;
        tracing::debug!(sink = %sink.name(), "span events will be forwarded");

        Ok(SpanEventProcessor { converter, sink })
    }
}
