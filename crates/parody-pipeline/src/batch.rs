//! Batch fan-out over the generation pipeline.

use futures::future::join_all;
use parody_models::{BatchItemOutcome, BatchResponse, GenerationRequest, RequestId};
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::metrics::record_batch;
use crate::orchestrator::{GenerateOptions, Orchestrator};

/// Largest accepted batch. A resource limit, not a tuning knob.
pub const MAX_BATCH_SIZE: usize = 5;

/// Runs the pipeline for several requests concurrently.
#[derive(Clone)]
pub struct BatchOrchestrator {
    orchestrator: Orchestrator,
}

impl BatchOrchestrator {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Reject batches that are empty or larger than [`MAX_BATCH_SIZE`].
    pub fn check_size(size: usize) -> PipelineResult<()> {
        if size == 0 {
            return Err(PipelineError::EmptyBatch);
        }
        if size > MAX_BATCH_SIZE {
            return Err(PipelineError::BatchTooLarge {
                size,
                max: MAX_BATCH_SIZE,
            });
        }
        Ok(())
    }

    /// Generate every item. One item's failure never affects the others.
    ///
    /// Results keep input order; failed items become `{error, index}`.
    pub async fn run(
        &self,
        requests: &[GenerationRequest],
        cohesive: bool,
        batch_id: Option<RequestId>,
    ) -> PipelineResult<BatchResponse> {
        Self::check_size(requests.len())?;

        let batch_id = batch_id.unwrap_or_default();
        info!(batch_id = %batch_id, items = requests.len(), "Batch started");
        record_batch(requests.len());

        let batch_id = &batch_id;
        let futures = requests.iter().enumerate().map(|(index, request)| {
            let options = GenerateOptions {
                cohesive,
                request_id: Some(RequestId::from_string(format!("{}-{}", batch_id, index))),
            };
            async move {
                match self.orchestrator.generate(request, options).await {
                    Ok(response) => BatchItemOutcome::Success(Box::new(response)),
                    Err(e) => {
                        warn!(batch_id = %batch_id, index = index, "Batch item failed: {}", e);
                        BatchItemOutcome::Failure {
                            error: e.to_string(),
                            index,
                        }
                    }
                }
            }
        });

        let response = BatchResponse::from_outcomes(join_all(futures).await);
        info!(
            batch_id = %batch_id,
            processed = response.processed,
            failed = response.failed,
            "Batch completed"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_size() {
        assert!(BatchOrchestrator::check_size(1).is_ok());
        assert!(BatchOrchestrator::check_size(MAX_BATCH_SIZE).is_ok());
        assert!(matches!(
            BatchOrchestrator::check_size(MAX_BATCH_SIZE + 1),
            Err(PipelineError::BatchTooLarge { size: 6, max: 5 })
        ));
        assert!(matches!(
            BatchOrchestrator::check_size(0),
            Err(PipelineError::EmptyBatch)
        ));
    }
}
