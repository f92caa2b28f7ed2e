//! Span/attribute recorder capability.
//!
//! Components never reach for a global tracer. They receive an
//! `Arc<dyn SpanRecorder>` and wrap each operation with [`traced`], which
//! opens a span, runs the operation inside it and records the outcome.

use parking_lot::Mutex;
use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{field, Instrument};

use crate::error::Result;

pub type Attribute = (&'static str, String);

#[derive(Debug, Clone, PartialEq)]
pub enum SpanStatus {
    Ok,
    Error { kind: String, message: String },
}

impl SpanStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error { .. })
    }
}

pub trait SpanRecorder: Send + Sync {
    fn open(&self, operation: &'static str, attributes: &[Attribute]) -> Box<dyn ActiveSpan>;
}

/// A span that has been opened and must be finished exactly once.
pub trait ActiveSpan: Send {
    /// The `tracing` span the wrapped future is instrumented with.
    fn tracing_span(&self) -> tracing::Span;

    fn finish(self: Box<Self>, status: SpanStatus);
}

/// Runs `operation` inside a span opened on `recorder` and records whether it
/// succeeded.
pub async fn traced<T, F>(
    recorder: &dyn SpanRecorder,
    name: &'static str,
    attributes: &[Attribute],
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let span = recorder.open(name, attributes);
    let result = operation.instrument(span.tracing_span()).await;

    let status = match &result {
        Ok(_) => SpanStatus::Ok,
        Err(e) => SpanStatus::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        },
    };
    span.finish(status);

    result
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Whole milliseconds since `started`.
pub fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}

fn format_attributes(attributes: &[Attribute]) -> String {
    let mut out = String::new();
    for (i, (key, value)) in attributes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}={}", key, value);
    }
    out
}

/// Emits every operation as a `tracing` span.
#[derive(Debug, Clone, Default)]
pub struct TracingSpanRecorder;

impl TracingSpanRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl SpanRecorder for TracingSpanRecorder {
    fn open(&self, operation: &'static str, attributes: &[Attribute]) -> Box<dyn ActiveSpan> {
        let span = tracing::info_span!(
            "operation",
            otel.name = operation,
            attributes = %format_attributes(attributes),
            otel.status_code = field::Empty,
            error.kind = field::Empty,
            error.message = field::Empty,
            duration_ms = field::Empty,
        );

        Box::new(TracingActiveSpan {
            span,
            operation,
            started: Instant::now(),
        })
    }
}

struct TracingActiveSpan {
    span: tracing::Span,
    operation: &'static str,
    started: Instant,
}

impl ActiveSpan for TracingActiveSpan {
    fn tracing_span(&self) -> tracing::Span {
        self.span.clone()
    }

    fn finish(self: Box<Self>, status: SpanStatus) {
        let elapsed_ms = elapsed_ms(self.started);
        self.span.record("duration_ms", elapsed_ms);

        match status {
            SpanStatus::Ok => {
                self.span.record("otel.status_code", "OK");
                tracing::debug!(parent: &self.span, operation = self.operation, elapsed_ms, "operation completed");
            }
            SpanStatus::Error { kind, message } => {
                self.span.record("otel.status_code", "ERROR");
                self.span.record("error.kind", kind.as_str());
                self.span.record("error.message", message.as_str());
                tracing::error!(parent: &self.span, operation = self.operation, elapsed_ms, error = %message, "operation failed");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSpan {
    pub operation: &'static str,
    pub attributes: Vec<Attribute>,
    pub status: SpanStatus,
    pub duration: Duration,
}

impl FinishedSpan {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps finished spans in memory so callers can assert on them.
#[derive(Debug, Clone, Default)]
pub struct InMemorySpanRecorder {
    finished: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl InMemorySpanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.finished.lock().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.finished.lock().iter().map(|s| s.operation).collect()
    }

    pub fn spans_named(&self, operation: &str) -> Vec<FinishedSpan> {
        self.finished
            .lock()
            .iter()
            .filter(|s| s.operation == operation)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.finished.lock().clear();
    }
}

impl SpanRecorder for InMemorySpanRecorder {
    fn open(&self, operation: &'static str, attributes: &[Attribute]) -> Box<dyn ActiveSpan> {
        Box::new(InMemoryActiveSpan {
            sink: self.finished.clone(),
            operation,
            attributes: attributes.to_vec(),
            started: Instant::now(),
        })
    }
}

struct InMemoryActiveSpan {
    sink: Arc<Mutex<Vec<FinishedSpan>>>,
    operation: &'static str,
    attributes: Vec<Attribute>,
    started: Instant,
}

impl ActiveSpan for InMemoryActiveSpan {
    fn tracing_span(&self) -> tracing::Span {
        tracing::Span::none()
    }

    fn finish(self: Box<Self>, status: SpanStatus) {
        let span = FinishedSpan {
            operation: self.operation,
            attributes: self.attributes,
            status,
            duration: self.started.elapsed(),
        };
        self.sink.lock().push(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_traced_records_success() {
        let recorder = InMemorySpanRecorder::new();

        let value = traced(&recorder, "compute", &[("input", "21".to_string())], async {
            Ok(21 * 2)
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        let spans = recorder.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].operation, "compute");
        assert_eq!(spans[0].attribute("input"), Some("21"));
        assert_eq!(spans[0].status, SpanStatus::Ok);
    }

    #[tokio::test]
    async fn test_traced_records_error_detail() {
        let recorder = InMemorySpanRecorder::new();

        let result: Result<()> = traced(&recorder, "write", &[], async {
            Err(AppError::StorageUnavailable("disk full".to_string()))
        })
        .await;

        assert!(result.is_err());
        let span = &recorder.spans_named("write")[0];
        match &span.status {
            SpanStatus::Error { kind, message } => {
                assert_eq!(kind, "storage_unavailable");
                assert!(message.contains("disk full"));
            }
            SpanStatus::Ok => panic!("expected error status"),
        }
    }

    #[tokio::test]
    async fn test_nested_spans_finish_inner_first() {
        let recorder = InMemorySpanRecorder::new();

        traced(&recorder, "outer", &[], async {
            traced(&recorder, "inner", &[], async { Ok(()) }).await
        })
        .await
        .unwrap();

        assert_eq!(recorder.operations(), vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn test_tracing_recorder_passes_result_through() {
        let recorder = TracingSpanRecorder::new();

        let result: Result<&str> = traced(&recorder, "noop", &[("k", "v".to_string())], async { Ok("done") }).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_micros(2_999)), 2);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_format_attributes() {
        let attrs = vec![("item.id", "7".to_string()), ("catalog.table", "products".to_string())];
        assert_eq!(format_attributes(&attrs), "item.id=7 catalog.table=products");
        assert_eq!(format_attributes(&[]), "");
    }
}
