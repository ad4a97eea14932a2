//! Conversion of OpenTelemetry span events into log records.

use crate::bridge::ContextBridge;
use chrono::{DateTime, Utc};
use opentelemetry::trace::{Event, Status};
use opentelemetry_sdk::export::trace::SpanData;
use otelog_core::{Error, Level, LogRecord, Result, TraceContext};
use std::sync::Arc;

/// Attribute that selects the level of a converted event.
pub const LEVEL_ATTRIBUTE: &str = "level";

/// Converts span events to [`LogRecord`]s.
#[derive(Debug, Clone)]
pub struct SpanEventConverter {
    logger_name: String,
    default_level: Level,
    bridge: Arc<ContextBridge>,
}

impl SpanEventConverter {
    pub fn builder() -> SpanEventConverterBuilder {
        SpanEventConverterBuilder::default()
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn default_level(&self) -> Level {
        self.default_level
    }

    pub fn bridge(&self) -> &ContextBridge {
        &self.bridge
    }

    /// Convert a single event recorded on `span`.
    pub fn convert_event(&self, event: &Event, span: &SpanData) -> LogRecord {
        let mut record = LogRecord::new(
            self.level_for(event, span),
            self.logger_name.clone(),
            event.name.to_string(),
        )
        .at(DateTime::<Utc>::from(event.timestamp));

        for kv in &event.attributes {
            if kv.key.as_str().eq_ignore_ascii_case(LEVEL_ATTRIBUTE) {
                continue;
            }
            record.insert_field_if_absent(kv.key.as_str(), kv.value.as_str().into_owned());
        }

        let context = TraceContext::from_span_context(&span.span_context);
        self.bridge.enrich(&mut record, context.as_ref());

        record
    }

    /// Convert every event of `span`, in recording order.
    pub fn convert_events(&self, span: &SpanData) -> Result<Vec<LogRecord>> {
        if span.events.is_empty() {
            return Err(Error::NoEvents);
        }

        Ok(span
            .events
            .iter()
            .map(|event| self.convert_event(event, span))
            .collect())
    }

    /// An errored span forces `Error`; otherwise the event's `level`
    /// attribute wins over the default.
    fn level_for(&self, event: &Event, span: &SpanData) -> Level {
        if matches!(span.status, Status::Error { .. }) {
            return Level::Error;
        }

        event
            .attributes
            .iter()
            .find(|kv| kv.key.as_str().eq_ignore_ascii_case(LEVEL_ATTRIBUTE))
            .and_then(|kv| Level::parse(&kv.value.as_str()))
            .unwrap_or(self.default_level)
    }
}

/// Builder for [`SpanEventConverter`].
#[derive(Debug, Default)]
pub struct SpanEventConverterBuilder {
    logger_name: Option<String>,
    default_level: Option<Level>,
    bridge: Option<Arc<ContextBridge>>,
}

impl SpanEventConverterBuilder {
    /// Logger name stamped on every converted record. Required.
    pub fn logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    /// Level used when an event carries no usable `level` attribute.
    /// Defaults to `Info`.
    pub fn default_level(mut self, level: Level) -> Self {
        self.default_level = Some(level);
        self
    }

    /// Bridge used to attach span identifiers. Defaults to a fresh bridge
    /// with the standard field names.
    pub fn bridge(mut self, bridge: Arc<ContextBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn build(self) -> Result<SpanEventConverter> {
        let logger_name = self
            .logger_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(Error::MissingField("logger_name"))?;

        Ok(SpanEventConverter {
            logger_name,
            default_level: self.default_level.unwrap_or_default(),
            bridge: self.bridge.unwrap_or_default(),
        })
    }
}
