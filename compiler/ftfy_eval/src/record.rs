//! Record sinks.
//!
//! Every surfaced value becomes a [`Record`]: the source line it belongs to
//! and a JSON value. Sinks decide where records go:
//! - Stdout: one JSON array per line (`[line, value]`)
//! - Buffer: captured for tests and embedders
//! - Silent: discarded
//!
//! Enum dispatch rather than a trait object; the set of sinks is closed.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// A single recorded value. `line` is `-1` when the value is not tied to a
/// source line.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub line: i64,
    pub value: serde_json::Value,
}

impl Record {
    pub fn new(line: i64, value: serde_json::Value) -> Self {
        Record { line, value }
    }

    /// Record for an optional source line.
    pub fn at(line: Option<u32>, value: serde_json::Value) -> Self {
        Record::new(line.map_or(-1, i64::from), value)
    }

    /// The wire form, `[line, value]`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(vec![self.line.into(), self.value.clone()])
    }
}

/// Sink that captures records in memory.
#[derive(Default)]
pub struct BufferSink {
    records: Mutex<Vec<Record>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, record: Record) {
        self.records.lock().push(record);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

pub enum RecordSinkImpl {
    /// JSON lines on stdout.
    Stdout,
    /// Captured in memory.
    Buffer(BufferSink),
    /// Discarded.
    Silent,
}

impl RecordSinkImpl {
    pub fn emit(&self, record: Record) {
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                // A closed stdout only loses records; the run itself goes on.
                let _ = writeln!(out, "{}", record.to_json()).and_then(|()| out.flush());
            }
            Self::Buffer(sink) => sink.emit(record),
            Self::Silent => {}
        }
    }

    /// Captured records. Empty for sinks that do not capture.
    pub fn records(&self) -> Vec<Record> {
        match self {
            Self::Buffer(sink) => sink.records(),
            Self::Stdout | Self::Silent => Vec::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(sink) = self {
            sink.clear();
        }
    }
}

/// Shared record sink that can be passed around.
pub type SharedRecordSink = Arc<RecordSinkImpl>;

pub fn stdout_sink() -> SharedRecordSink {
    Arc::new(RecordSinkImpl::Stdout)
}

pub fn buffer_sink() -> SharedRecordSink {
    Arc::new(RecordSinkImpl::Buffer(BufferSink::new()))
}

pub fn silent_sink() -> SharedRecordSink {
    Arc::new(RecordSinkImpl::Silent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn buffer_captures_in_order() {
        let sink = buffer_sink();
        sink.emit(Record::new(1, json!("a")));
        sink.emit(Record::at(None, json!(2)));
        assert_eq!(
            sink.records(),
            vec![Record::new(1, json!("a")), Record::new(-1, json!(2))]
        );
        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn silent_discards() {
        let sink = silent_sink();
        sink.emit(Record::new(1, json!(null)));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn wire_form() {
        let record = Record::at(Some(3), json!("4.5"));
        assert_eq!(record.to_json().to_string(), r#"[3,"4.5"]"#);
    }
}
