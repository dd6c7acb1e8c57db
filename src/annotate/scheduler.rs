//! Concurrent annotation scheduler
//!
//! Executes independent annotation tasks against the completion service
//! under a worker cap and a shared rate limit, with per-task retry/backoff
//! and run-level cancellation. Every task resolves to exactly one
//! [`AnnotationResult`]; nothing is dropped silently.

use crate::annotate::{
    AnnotationResult, AnnotationTask, CompletionService, ServiceError, TaskStatus,
};
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum tasks holding an open service call at once
    pub concurrency: usize,
    /// Admission rate shared across all workers; bursts are delayed, not
    /// rejected
    pub requests_per_second: f64,
    /// Maximum retries per task on transient errors
    pub max_retries: u32,
    /// Per-call timeout; exceeding it counts as a transient failure
    pub request_timeout: Duration,
    /// First backoff delay; doubles per retry
    pub base_delay: Duration,
    /// Backoff cap
    pub max_delay: Duration,
    /// Consecutive fatal errors before the whole run is cancelled
    pub fatal_error_limit: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: available_cores(),
            requests_per_second: 5.0,
            max_retries: 3,
            request_timeout: Duration::from_secs(60),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(16),
            fatal_error_limit: 3,
        }
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Token-bucket rate limiter shared by all workers. The bucket state is the
/// only mutable state shared across workers; everything else is owned by
/// the task being processed.
struct RateLimiter {
    rate: f64,
    burst: f64,
    state: tokio::sync::Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    fn new(rate: f64) -> Self {
        let rate = rate.max(0.001);
        Self {
            rate,
            burst: rate.max(1.0),
            state: tokio::sync::Mutex::new(BucketState {
                tokens: rate.max(1.0),
                last: Instant::now(),
            }),
        }
    }

    /// Wait until a token is available, then take it. Never rejects.
    async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
                state.last = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate)
            };
            tokio::time::sleep(wait).await;
        }
    }
}

/// Drives a set of annotation tasks to completion.
pub struct AnnotationScheduler {
    service: Arc<dyn CompletionService>,
    config: SchedulerConfig,
    cancel: CancellationToken,
}

impl AnnotationScheduler {
    pub fn new(service: Arc<dyn CompletionService>, config: SchedulerConfig) -> Self {
        Self {
            service,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that cancels the whole run. The scheduler also cancels it
    /// itself after too many consecutive fatal service errors.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute all tasks. Returns one result per task, in input order,
    /// regardless of completion order. Resolves only when every task has
    /// settled (success, terminal failure, or cancelled).
    pub async fn run(&self, tasks: Vec<AnnotationTask>, model: &str) -> Vec<AnnotationResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let limiter = Arc::new(RateLimiter::new(self.config.requests_per_second));
        let consecutive_fatals = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let worker = Worker {
                service: Arc::clone(&self.service),
                config: self.config.clone(),
                semaphore: Arc::clone(&semaphore),
                limiter: Arc::clone(&limiter),
                cancel: self.cancel.clone(),
                consecutive_fatals: Arc::clone(&consecutive_fatals),
                model: model.to_string(),
            };
            let id = task.id.clone();
            handles.push((id, tokio::spawn(worker.execute(task))));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                // A panicked worker still owes the run a result
                Err(e) => results.push(AnnotationResult {
                    task_id: id,
                    status: TaskStatus::Failed(ServiceError::ServerError {
                        status: 0,
                        message: format!("worker panicked: {e}"),
                    }),
                    text: None,
                    retries: 0,
                }),
            }
        }
        results
    }
}

/// Per-task execution state. Owned exclusively by the tokio task processing
/// it until the result is produced.
struct Worker {
    service: Arc<dyn CompletionService>,
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
    limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
    consecutive_fatals: Arc<AtomicU32>,
    model: String,
}

impl Worker {
    async fn execute(self, task: AnnotationTask) -> AnnotationResult {
        let cancelled = |retries| AnnotationResult {
            task_id: task.id.clone(),
            status: TaskStatus::Cancelled,
            text: None,
            retries,
        };

        // Not-yet-started tasks are abandoned promptly on cancellation.
        // All selects check cancellation first so no new call starts after
        // the token trips.
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return cancelled(0),
            permit = self.semaphore.acquire() => match permit {
                Ok(p) => p,
                Err(_) => return cancelled(0),
            },
        };

        let mut retries: u32 = 0;
        loop {
            // Rate-limiter admission
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return cancelled(retries),
                _ = self.limiter.acquire() => {}
            }

            // Service call under a per-call timeout
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return cancelled(retries),
                r = tokio::time::timeout(
                    self.config.request_timeout,
                    self.service.submit(&task.prompt, &self.model),
                ) => r,
            };

            let err = match outcome {
                Ok(Ok(text)) => {
                    self.consecutive_fatals.store(0, Ordering::Relaxed);
                    return AnnotationResult {
                        task_id: task.id.clone(),
                        status: TaskStatus::Succeeded,
                        text: Some(text),
                        retries,
                    };
                }
                Ok(Err(err)) => err,
                Err(_) => ServiceError::Timeout,
            };

            if !err.is_transient() {
                let fatals = self.consecutive_fatals.fetch_add(1, Ordering::Relaxed) + 1;
                if fatals >= self.config.fatal_error_limit {
                    warn!(
                        "{fatals} consecutive fatal service errors, cancelling remaining work"
                    );
                    self.cancel.cancel();
                }
                return AnnotationResult {
                    task_id: task.id.clone(),
                    status: TaskStatus::Failed(err),
                    text: None,
                    retries,
                };
            }

            if retries >= self.config.max_retries {
                debug!(task = ?task.id, "retries exhausted: {err}");
                return AnnotationResult {
                    task_id: task.id.clone(),
                    status: TaskStatus::Failed(err),
                    text: None,
                    retries,
                };
            }

            let delay = backoff_delay(&self.config, retries);
            retries += 1;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return cancelled(retries),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Exponential backoff with jitter: base * 2^retry, capped, plus up to 50%
/// random extra so synchronized retries spread out.
fn backoff_delay(config: &SchedulerConfig, retry: u32) -> Duration {
    let base = config.base_delay.as_millis() as u64;
    let exp = base.saturating_mul(1u64 << retry.min(16));
    let capped = exp.min(config.max_delay.as_millis() as u64);
    let jitter = if capped > 1 {
        rand::rng().random_range(0..=capped / 2)
    } else {
        0
    };
    Duration::from_millis(capped + jitter)
}
