//! Trace identifiers attached to each composition
//!
//! Every `compose` call gets a [`TraceContext`]; the appraisal and packaging
//! steps run in child spans so their log lines share the trace id.

use std::time::Instant;

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TraceContext {
    /// Shared by every span of one composition
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub parent_span_id: Option<Uuid>,
    pub operation: String,
    started: Instant,
}

impl TraceContext {
    pub fn new(operation: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            parent_span_id: None,
            operation: operation.to_string(),
            started: Instant::now(),
        }
    }

    /// Create a child span context
    pub fn child_span(&self, operation: &str) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: Some(self.span_id),
            operation: operation.to_string(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    /// `tracing` span carrying the ids
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "compose",
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            parent_span_id = ?self.parent_span_id,
            operation = %self.operation,
        )
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new("compose")
    }
}
