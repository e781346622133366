//! Ports to the external services the quiz client depends on.
//!
//! Every call takes an explicit `RequestScope` and every response echoes the
//! scope it was produced for, so callers can tell a late answer to an old
//! request from an answer to the current one.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use quiz_core::model::{DatasetId, Feedback, GradeResult, Question, Subject, SubmissionEntry};

use crate::error::CollaboratorError;

/// Dataset and subject a request is made under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestScope {
    pub dataset: DatasetId,
    pub subject: Subject,
}

impl RequestScope {
    #[must_use]
    pub fn new(dataset: DatasetId, subject: Subject) -> Self {
        Self { dataset, subject }
    }
}

/// A collaborator response tagged with the scope it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Scoped<T> {
    pub scope: RequestScope,
    pub value: T,
}

impl<T> Scoped<T> {
    #[must_use]
    pub fn new(scope: RequestScope, value: T) -> Self {
        Self { scope, value }
    }

    #[must_use]
    pub fn answers(&self, scope: &RequestScope) -> bool {
        &self.scope == scope
    }
}

/// Lists the selectable question sets.
#[async_trait]
pub trait SetRegistry: Send + Sync {
    async fn list(&self) -> Result<Vec<DatasetId>, CollaboratorError>;
}

/// Serves the questions of one dataset, optionally filtered by subject.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn fetch(&self, scope: &RequestScope) -> Result<Scoped<Vec<Question>>, CollaboratorError>;
}

/// Verifies a single in-progress answer.
#[async_trait]
pub trait AnswerChecker: Send + Sync {
    async fn check(
        &self,
        scope: &RequestScope,
        entry: &SubmissionEntry,
    ) -> Result<Scoped<Feedback>, CollaboratorError>;
}

/// Scores a whole submission.
#[async_trait]
pub trait Grader: Send + Sync {
    async fn grade(
        &self,
        scope: &RequestScope,
        entries: &[SubmissionEntry],
    ) -> Result<Scoped<Vec<GradeResult>>, CollaboratorError>;
}

/// Whether the grading backend has an AI-grading key configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStatus {
    pub ai_grading_enabled: bool,
}

/// Configuration surface of the AI-grading backend.
#[async_trait]
pub trait GradingBackend: Send + Sync {
    async fn key_status(&self) -> Result<KeyStatus, CollaboratorError>;
    async fn set_api_key(&self, key: &str) -> Result<KeyStatus, CollaboratorError>;
    async fn clear_api_key(&self) -> Result<KeyStatus, CollaboratorError>;
}

/// Host-provided prompt for the AI-grading key.
///
/// Returns `None` when the user chooses to skip.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn request_api_key(&self) -> Option<String>;
}

/// Await a collaborator call, giving up after `limit`.
pub(crate) async fn call_within<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, CollaboratorError>>,
) -> Result<T, CollaboratorError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis(), "collaborator call timed out");
            Err(CollaboratorError::Timeout(limit))
        }
    }
}
