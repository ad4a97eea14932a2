//! Record sinks and the named sink registry.

use otelog_core::{Error, LogRecord, Result};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// Destination for log records.
pub trait RecordSink: Send + Sync {
    /// Registration name of the sink.
    fn name(&self) -> &str;

    /// Write one record.
    fn emit(&self, record: &LogRecord) -> Result<()>;
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        (**self).emit(record)
    }
}

/// Writes records as JSON lines.
pub struct JsonSink<W> {
    name: String,
    make_writer: W,
}

impl<W> JsonSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, make_writer: W) -> Self {
        Self {
            name: name.into(),
            make_writer,
        }
    }
}

impl JsonSink<fn() -> io::Stdout> {
    /// JSON lines on standard output.
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, io::stdout as fn() -> io::Stdout)
    }
}

impl<W> fmt::Debug for JsonSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSink").field("name", &self.name).finish()
    }
}

impl<W> RecordSink for JsonSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut line = record.to_json()?;
        line.push('\n');

        let mut writer = self.make_writer.make_writer();
        writer
            .write_all(line.as_bytes())
            .map_err(|e| Error::SinkWrite {
                sink: self.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Keeps records in memory. Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the records emitted so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Sinks registered by name at application start.
///
/// Names are matched case-insensitively.
#[derive(Clone, Default)]
pub struct SinkRegistry {
    sinks: HashMap<String, Arc<dyn RecordSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink under its own name, replacing any sink with the same name.
    pub fn register(&mut self, sink: Arc<dyn RecordSink>) -> &mut Self {
        self.sinks.insert(sink.name().to_lowercase(), sink);
        self
    }

    /// Look up a sink by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn RecordSink>> {
        self.sinks
            .get(&name.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnknownSink(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sinks.values().map(|s| s.name().to_string()).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("sinks", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otelog_core::Level;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedBuf {
        type Writer = SharedBuf;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_json_sink_writes_lines() {
        let buf = SharedBuf::default();
        let sink = JsonSink::new("json", buf.clone());

        sink.emit(&LogRecord::new(Level::Info, "app", "one")).unwrap();
        sink.emit(&LogRecord::new(Level::Warn, "app", "two")).unwrap();

        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: LogRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.message, "two");
        assert_eq!(second.level, Level::Warn);
    }

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let sink = MemorySink::new("mem");
        let handle = sink.clone();

        sink.emit(&LogRecord::new(Level::Info, "app", "hello")).unwrap();

        assert_eq!(handle.len(), 1);
        handle.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = SinkRegistry::new();
        registry.register(Arc::new(MemorySink::new("MyAppender")));

        assert_eq!(registry.get("myappender").unwrap().name(), "MyAppender");
        assert_eq!(registry.get("MYAPPENDER").unwrap().name(), "MyAppender");
    }

    #[test]
    fn test_registry_unknown_sink() {
        let registry = SinkRegistry::new();
        assert!(matches!(registry.get("missing"), Err(Error::UnknownSink(name)) if name == "missing"));
    }
}
