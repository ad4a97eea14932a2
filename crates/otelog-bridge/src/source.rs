//! Accessors for the ambient trace context.

use opentelemetry::Context;
use opentelemetry::trace::{SpanContext, TraceContextExt};
use otelog_core::{Error, Result};
use std::panic::{self, AssertUnwindSafe};

/// Source of the currently active span context.
///
/// `Ok(None)` means no span is active, which is not an error.
pub trait ContextSource: Send + Sync {
    fn span_context(&self) -> Result<Option<SpanContext>>;
}

/// Reads the OpenTelemetry context attached to the current thread or task.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentContext;

impl ContextSource for CurrentContext {
    fn span_context(&self) -> Result<Option<SpanContext>> {
        // Reading thread-local context panics once the thread is tearing down.
        let read = panic::catch_unwind(AssertUnwindSafe(|| {
            Context::map_current(|cx| {
                cx.has_active_span()
                    .then(|| cx.span().span_context().clone())
            })
        }));

        read.map_err(|payload| Error::ContextUnavailable(panic_message(payload.as_ref())))
    }
}

/// A fixed span context, for explicitly propagated context.
#[derive(Debug, Clone, Default)]
pub struct FixedContext(Option<SpanContext>);

impl FixedContext {
    pub fn new(span_context: SpanContext) -> Self {
        Self(Some(span_context))
    }

    /// A source with no active span.
    pub fn none() -> Self {
        Self(None)
    }
}

impl ContextSource for FixedContext {
    fn span_context(&self) -> Result<Option<SpanContext>> {
        Ok(self.0.clone())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic while reading context".to_string()
    }
}
