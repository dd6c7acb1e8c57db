//! Annotation pipeline: task partitioning, concurrent scheduling against an
//! external completion service, and merging results back into source text.
//!
//! The completion service is BYOK (bring your own key) - the API key is read
//! from the environment by the CLI and carried in the run configuration.

mod merge;
mod openai;
mod prompts;
mod scheduler;
mod tasks;

pub use merge::merge_file;
pub use openai::{OpenAiService, DEFAULT_API_URL, DEFAULT_MODEL};
pub use scheduler::{AnnotationScheduler, SchedulerConfig};
pub use tasks::{partition_unit, AnnotationTask, Priority, TaskId, TaskKind};

use async_trait::async_trait;
use thiserror::Error;

/// Errors the external completion service can produce.
///
/// Transient subtypes are retried with backoff; fatal subtypes fail the task
/// immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by service")]
    RateLimited,

    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl ServiceError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout | ServiceError::RateLimited | ServiceError::ServerError { .. }
        )
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// The external text-completion service, reduced to the one call the
/// scheduler needs. Transport, authentication, and model selection live in
/// the implementation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn submit(&self, prompt: &str, model: &str) -> ServiceResult<String>;
}

/// Terminal state of one annotation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed(ServiceError),
    Cancelled,
}

/// The single result every task resolves to. Produced exactly once per
/// task; a task that exhausts its retries yields a terminal failure here
/// instead of disappearing.
#[derive(Debug, Clone)]
pub struct AnnotationResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// Generated comment text, present only on success
    pub text: Option<String>,
    /// Number of retries performed (0 = first attempt settled it)
    pub retries: u32,
}

impl AnnotationResult {
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Timeout.is_transient());
        assert!(ServiceError::RateLimited.is_transient());
        assert!(ServiceError::ServerError {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(!ServiceError::AuthFailure("bad key".into()).is_transient());
        assert!(!ServiceError::MalformedRequest("empty prompt".into()).is_transient());
    }
}
