//! Structured request logging.
//!
//! Every line carries the request id and operation so a soft failure that
//! was replaced by a default can be traced back to the request and step
//! that produced it.

use parody_models::RequestId;
use tracing::{error, info, warn, Span};

/// Per-request logger with fixed context fields.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    operation: String,
}

impl RequestLogger {
    /// Create a logger for one request and operation (e.g. "generate", "batch").
    pub fn new(request_id: &RequestId, operation: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request started: {}", message
        );
    }

    pub fn log_step(&self, step: &str, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            step = step,
            "{}", message
        );
    }

    /// A step failed and was replaced by a default.
    pub fn log_fallback(&self, step: &str, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            step = step,
            "Falling back: {}", message
        );
    }

    pub fn log_warning(&self, step: &str, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            step = step,
            "Request warning: {}", message
        );
    }

    pub fn log_error(&self, step: &str, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = %self.operation,
            step = step,
            "Request failed: {}", message
        );
    }

    pub fn log_completion(&self, total_ms: u64) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            total_ms = total_ms,
            "Request completed"
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span to instrument the request's futures with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_logger_fields() {
        let id = RequestId::from_string("req-123");
        let logger = RequestLogger::new(&id, "generate");

        assert_eq!(logger.request_id(), "req-123");
        assert_eq!(logger.operation(), "generate");
    }
}
