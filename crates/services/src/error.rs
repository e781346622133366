//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use quiz_core::model::{GradeError, ParseIdError, QuestionId};
use storage::repository::StorageError;

/// Failures talking to an external collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollaboratorError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Errors from loading a question set.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("no dataset selected")]
    NoDatasetSelected,
    #[error("question store returned question {0} more than once")]
    DuplicateQuestion(QuestionId),
    #[error("could not load questions: {0}")]
    Fetch(#[from] CollaboratorError),
}

/// Client-side preconditions. None of these reach the network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("no answer provided for question {0}")]
    NoAnswer(QuestionId),
    #[error("answered {answered} of {total} questions")]
    Incomplete { answered: usize, total: usize },
    #[error("the session has no questions")]
    NoQuestions,
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),
    #[error("{text:?} is not an option of question {question_id}")]
    NotAnOption { question_id: QuestionId, text: String },
}

impl From<quiz_core::submission::SubmissionError> for ValidationError {
    fn from(err: quiz_core::submission::SubmissionError) -> Self {
        match err {
            quiz_core::submission::SubmissionError::Incomplete { answered, total } => {
                Self::Incomplete { answered, total }
            }
        }
    }
}

/// Non-fatal failure of an answer check.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    #[error("could not check answer: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Failure of a final submission. Answers and feedback are kept.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("could not submit answers: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("grading response was issued for a different dataset or subject")]
    ScopeMismatch,
    #[error("grading response rejected: {0}")]
    InvalidResponse(#[from] GradeError),
}

/// Errors emitted by the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {operation} while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: &'static str,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Errors emitted by `DataSetSelector`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SelectorError {
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
    #[error("could not list datasets: {0}")]
    Registry(#[from] CollaboratorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CredentialService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CredentialError {
    #[error("API key must not be empty")]
    EmptyKey,
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}
