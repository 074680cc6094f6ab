//! Batch runner that drives a list of screen paths through the executor

use futures::stream::{FuturesUnordered, StreamExt};
use screentest_common::{
    HarnessError, Parameters, RenderRequest, RenderResult, RequestMethod, StatsSnapshot,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::context::ExecutionContext;
use crate::executor::ScreenTest;
use crate::session::RenderSessionConfig;

/// Per-completion notifications from a batch
pub trait BatchObserver: Send + Sync {
    fn render_completed(&self, result: &RenderResult);

    fn render_failed(&self, screen_path: &str, error: &HarnessError);
}

/// Logs every completion through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl BatchObserver for LoggingObserver {
    fn render_completed(&self, result: &RenderResult) {
        if result.is_success() {
            info!(
                "✓ {} ({} ms, {} chars)",
                result.screen_path,
                result.render_time_ms,
                result.output_chars()
            );
        } else {
            error!(
                "✗ {} ({} ms, {} chars) - {}",
                result.screen_path,
                result.render_time_ms,
                result.output_chars(),
                result.error_messages.join("; ")
            );
        }
    }

    fn render_failed(&self, screen_path: &str, error: &HarnessError) {
        error!("✗ {} - {}", screen_path, error);
    }
}

/// Result of one path in a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub screen_path: String,
    pub result: Option<RenderResult>,
    /// Set when the render could not run at all (resolution, identity, timeout)
    pub failure: Option<String>,
}

impl BatchOutcome {
    fn from_result(screen_path: &str, outcome: Result<RenderResult, HarnessError>) -> Self {
        match outcome {
            Ok(result) => Self {
                screen_path: screen_path.to_string(),
                result: Some(result),
                failure: None,
            },
            Err(e) => Self {
                screen_path: screen_path.to_string(),
                result: None,
                failure: Some(e.to_string()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.as_ref().map(RenderResult::is_success).unwrap_or(false)
    }
}

/// Result of a whole batch; outcomes are in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<BatchOutcome>,
    pub stats: StatsSnapshot,
}

/// Runs screen paths against one shared session
pub struct BatchRunner {
    harness: ScreenTest,
    session: Arc<RenderSessionConfig>,
    observer: Arc<dyn BatchObserver>,
}

impl BatchRunner {
    pub fn new(harness: ScreenTest, session: Arc<RenderSessionConfig>) -> Self {
        Self {
            harness,
            session,
            observer: Arc::new(LoggingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn harness(&self) -> &ScreenTest {
        &self.harness
    }

    /// Render every path. With `concurrency` above one, paths run in groups
    /// of at most that many and each group drains before the next starts.
    /// A failed render never stops the rest.
    pub async fn run_all(
        &self,
        caller: &ExecutionContext,
        paths: &[String],
        parameters: &Parameters,
        request_method: RequestMethod,
        concurrency: usize,
    ) -> BatchReport {
        let start = Instant::now();
        let concurrency = concurrency.max(1);

        info!("Rendering {} screen(s), concurrency {}...", paths.len(), concurrency);

        let mut outcomes: Vec<Option<BatchOutcome>> = vec![None; paths.len()];

        if concurrency == 1 {
            for (index, path) in paths.iter().enumerate() {
                let outcome = self.render_one(caller, path, parameters, request_method).await;
                outcomes[index] = Some(outcome);
            }
        } else {
            for (group_index, group) in paths.chunks(concurrency).enumerate() {
                let offset = group_index * concurrency;
                let mut in_flight: FuturesUnordered<_> = group
                    .iter()
                    .enumerate()
                    .map(|(i, path)| async move {
                        let outcome = self
                            .render_one(caller, path, parameters, request_method)
                            .await;
                        (offset + i, outcome)
                    })
                    .collect();

                while let Some((index, outcome)) = in_flight.next().await {
                    outcomes[index] = Some(outcome);
                }
            }
        }

        let outcomes: Vec<BatchOutcome> = outcomes.into_iter().flatten().collect();
        let passed = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;
        let stats = self.harness.stats().snapshot();

        info!(
            "Render results: {} passed, {} failed ({} ms); \
             harness totals: {} renders, {} errors, {} chars",
            passed,
            failed,
            duration_ms,
            stats.render_count,
            stats.error_count,
            stats.total_output_chars
        );

        BatchReport {
            total: paths.len(),
            passed,
            failed,
            duration_ms,
            outcomes,
            stats,
        }
    }

    async fn render_one(
        &self,
        caller: &ExecutionContext,
        path: &str,
        parameters: &Parameters,
        request_method: RequestMethod,
    ) -> BatchOutcome {
        let request = RenderRequest::new(path)
            .with_parameters(parameters)
            .with_method(request_method);
        let outcome = self.harness.execute(caller, &self.session, request).await;
        match &outcome {
            Ok(result) => self.observer.render_completed(result),
            Err(e) => self.observer.render_failed(path, e),
        }
        BatchOutcome::from_result(path, outcome)
    }
}
