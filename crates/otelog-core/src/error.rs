//! Error types for otelog.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Identifier errors
    #[error("Invalid trace id: {0}")]
    InvalidTraceId(String),

    #[error("Invalid span id: {0}")]
    InvalidSpanId(String),

    // Context errors
    #[error("Ambient trace context unavailable: {0}")]
    ContextUnavailable(String),

    // Construction errors
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("No sink registered with name '{0}'")]
    UnknownSink(String),

    #[error("Span has no events to convert")]
    NoEvents,

    // Sink errors
    #[error("Sink '{sink}' failed to write record: {message}")]
    SinkWrite { sink: String, message: String },

    // Infrastructure errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to install subscriber: {0}")]
    Install(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}
