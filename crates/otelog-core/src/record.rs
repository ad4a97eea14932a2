//! Log records and levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    /// Parse a level name.
    ///
    /// Surrounding whitespace is ignored and case does not matter. Returns
    /// `None` for blank or unrecognized input.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Some(Level::Trace),
            "DEBUG" => Some(Level::Debug),
            "INFO" => Some(Level::Info),
            "WARN" | "WARNING" => Some(Level::Warn),
            "ERROR" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            _ => Level::Error,
        }
    }
}

/// Outcome of a non-destructive field insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInsert {
    /// The key was absent and is now set.
    Inserted,
    /// The key already held the same value.
    Unchanged,
    /// The key already held a different value, which was kept.
    Collision { existing: String },
}

/// JSON keys owned by the record itself.
pub const RESERVED_KEYS: [&str; 4] = ["timestamp", "level", "message", "logger"];

/// Prefix under which fields named after a reserved key are stored.
pub const RESERVED_FIELD_PREFIX: &str = "field.";

/// A single log record, optionally enriched with trace fields.
///
/// Fields are flattened into the JSON object. A field whose name is one of
/// [`RESERVED_KEYS`] is stored as `field.<name>` so it never shadows the
/// record's own keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub logger: String,
    #[serde(default, flatten)]
    pub fields: BTreeMap<String, String>,
}

impl LogRecord {
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            logger: logger.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Storage key of the field named `key`.
    pub fn field_key(key: &str) -> Cow<'_, str> {
        if RESERVED_KEYS.contains(&key) {
            Cow::Owned(format!("{RESERVED_FIELD_PREFIX}{key}"))
        } else {
            Cow::Borrowed(key)
        }
    }

    /// Set the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let key = match Self::field_key(&key) {
            Cow::Owned(renamed) => renamed,
            Cow::Borrowed(_) => key,
        };
        self.fields.insert(key, value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(Self::field_key(key).as_ref()).map(String::as_str)
    }

    /// Insert a field without overwriting an existing value.
    pub fn insert_field_if_absent(&mut self, key: &str, value: String) -> FieldInsert {
        let key = Self::field_key(key);
        match self.fields.get(key.as_ref()) {
            Some(existing) if *existing == value => FieldInsert::Unchanged,
            Some(existing) => FieldInsert::Collision {
                existing: existing.clone(),
            },
            None => {
                self.fields.insert(key.into_owned(), value);
                FieldInsert::Inserted
            }
        }
    }

    /// Serialize as a single JSON line.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
