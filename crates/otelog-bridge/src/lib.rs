//! OpenTelemetry bridge for `tracing` logs.
//!
//! Enriches log records with the identifiers of the active span, and
//! forwards span events to a log sink when spans end.

pub mod bridge;
pub mod config;
pub mod convert;
pub mod install;
pub mod layer;
pub mod processor;
pub mod sink;
pub mod source;

pub use bridge::{ContextBridge, DIAGNOSTICS_TARGET, Diagnostics, Enrichment, FieldNames};
pub use config::BridgeConfig;
pub use convert::{LEVEL_ATTRIBUTE, SpanEventConverter, SpanEventConverterBuilder};
pub use install::{Installed, build_tracer_provider, install};
pub use layer::BridgeLayer;
pub use processor::{SpanEventProcessor, SpanEventProcessorBuilder};
pub use sink::{JsonSink, MemorySink, RecordSink, SinkRegistry};
pub use source::{ContextSource, CurrentContext, FixedContext};

pub use otelog_core::{Error, Level, LogRecord, Result, TraceContext};
