//! Trace context snapshots and W3C `traceparent` handling.

use crate::{Error, Result};
use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};
use std::fmt;

/// Length of a hex-encoded trace id.
pub const TRACE_ID_HEX_LEN: usize = 32;
/// Length of a hex-encoded span id.
pub const SPAN_ID_HEX_LEN: usize = 16;

/// Immutable snapshot of the identifiers of an active span.
///
/// A `TraceContext` only exists for valid contexts: both identifiers are
/// non-zero. Code that reads ambient state gets `Option<TraceContext>`, and
/// `None` means "no trace", never a zero-valued placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceContext {
    trace_id: TraceId,
    span_id: SpanId,
    sampled: bool,
}

impl TraceContext {
    /// Snapshot an OpenTelemetry span context. Returns `None` when the
    /// context is invalid.
    pub fn from_span_context(span_context: &SpanContext) -> Option<Self> {
        if !span_context.is_valid() {
            return None;
        }

        Some(Self {
            trace_id: span_context.trace_id(),
            span_id: span_context.span_id(),
            sampled: span_context.is_sampled(),
        })
    }

    /// Build a snapshot from raw identifiers.
    pub fn from_ids(trace_id: TraceId, span_id: SpanId, sampled: bool) -> Result<Self> {
        if trace_id == TraceId::INVALID {
            return Err(Error::InvalidTraceId(format!("{trace_id}")));
        }
        if span_id == SpanId::INVALID {
            return Err(Error::InvalidSpanId(format!("{span_id}")));
        }

        Ok(Self {
            trace_id,
            span_id,
            sampled,
        })
    }

    /// Parse hex-encoded identifiers (case-insensitive, fixed width).
    pub fn from_hex(trace_id: &str, span_id: &str, sampled: bool) -> Result<Self> {
        let trace = parse_hex(trace_id, TRACE_ID_HEX_LEN)
            .map(|v| TraceId::from_bytes(v.to_be_bytes()))
            .ok_or_else(|| Error::InvalidTraceId(trace_id.to_string()))?;
        let span = parse_hex(span_id, SPAN_ID_HEX_LEN)
            .map(|v| SpanId::from_bytes((v as u64).to_be_bytes()))
            .ok_or_else(|| Error::InvalidSpanId(span_id.to_string()))?;

        Self::from_ids(trace, span, sampled)
    }

    /// Parse a W3C `traceparent` header value.
    ///
    /// Only version `00` is understood. Invalid identifiers yield `None`.
    pub fn from_traceparent(header: &str) -> Option<Self> {
        let parts: Vec<&str> = header.trim().split('-').collect();
        if parts.len() != 4 {
            return None;
        }

        if parts[0] != "00" {
            return None;
        }

        let flags = parse_hex(parts[3], 2)? as u8;
        Self::from_hex(parts[1], parts[2], flags & 0x01 == 0x01).ok()
    }

    /// Render as a W3C `traceparent` header value.
    pub fn to_traceparent(&self) -> String {
        let flags = if self.sampled { "01" } else { "00" };
        format!("00-{}-{}-{}", self.trace_id_hex(), self.span_id_hex(), flags)
    }

    /// Rebuild a remote OpenTelemetry span context from this snapshot.
    pub fn to_span_context(&self) -> SpanContext {
        let flags = if self.sampled {
            TraceFlags::SAMPLED
        } else {
            TraceFlags::default()
        };
        SpanContext::new(
            self.trace_id,
            self.span_id,
            flags,
            true,
            TraceState::default(),
        )
    }

    /// The 128-bit trace id.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The 64-bit span id.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Whether the span was sampled.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Trace id as 32 lowercase hex characters.
    pub fn trace_id_hex(&self) -> String {
        format!("{:032x}", u128::from_be_bytes(self.trace_id.to_bytes()))
    }

    /// Span id as 16 lowercase hex characters.
    pub fn span_id_hex(&self) -> String {
        format!("{:016x}", u64::from_be_bytes(self.span_id.to_bytes()))
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_traceparent())
    }
}

fn parse_hex(value: &str, len: usize) -> Option<u128> {
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u128::from_str_radix(value, 16).ok()
}
