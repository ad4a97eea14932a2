//! otelog core
//!
//! Shared vocabulary for bridging log records and OpenTelemetry trace
//! context: immutable trace context snapshots, log records, and errors.

pub mod context;
pub mod error;
pub mod record;

pub use context::TraceContext;
pub use error::{Error, Result};
pub use record::{FieldInsert, Level, LogRecord, RESERVED_FIELD_PREFIX, RESERVED_KEYS};
