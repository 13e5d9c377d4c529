//! Download orchestration
//!
//! Consumes one batch of link requests and drives each through the same
//! strictly sequential pipeline: record the attempt, run the download
//! executor, sweep the temporary directory into the request's output
//! directory, record the outcome. Only one outbound download runs at a time,
//! and the shared temporary directory is single-tenant.

use crate::executor::DownloadExecutor;
use crate::relocate::Relocator;
use crate::results::ResultTracker;
use crate::types::{DownloadResult, LinkRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Drives batches of link requests through download, relocation, and tracking
pub struct Orchestrator {
    executor: Arc<dyn DownloadExecutor>,
    relocator: Relocator,
    tracker: Box<dyn ResultTracker>,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        executor: Arc<dyn DownloadExecutor>,
        relocator: Relocator,
        tracker: Box<dyn ResultTracker>,
    ) -> Self {
        Self {
            executor,
            relocator,
            tracker,
        }
    }

    /// Process one batch, strictly in order, one download at a time
    ///
    /// Every request produces exactly one result, paired in input order.
    /// Executor errors (the command could not even start) are logged and
    /// count as failed downloads; relocation and tracking failures are
    /// absorbed by those components and never abort the batch.
    pub async fn run(&mut self, batch: Vec<LinkRequest>) -> Vec<DownloadResult> {
        info!(count = batch.len(), "processing download batch");
        self.tracker.batch_started().await;

        let mut results = Vec::with_capacity(batch.len());
        for request in batch {
            self.tracker.attempt_started(&request).await;

            let succeeded = match self.executor.download(&request.link).await {
                Ok(succeeded) => succeeded,
                Err(error) => {
                    warn!(link = %request.link, error = %error, "download attempt failed to start");
                    false
                }
            };

            // The executor may have produced files even on failure
            self.relocator.relocate(&request.output_dir).await;

            self.tracker.record(&request, succeeded).await;
            results.push(DownloadResult { request, succeeded });
        }
        results
    }
}
