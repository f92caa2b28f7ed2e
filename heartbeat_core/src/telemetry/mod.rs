pub mod recorder;
pub mod resource;

pub use recorder::{
    duration_ms, elapsed_ms, traced, ActiveSpan, Attribute, FinishedSpan, InMemorySpanRecorder,
    SpanRecorder, SpanStatus, TracingSpanRecorder,
};
pub use resource::ServiceResource;
