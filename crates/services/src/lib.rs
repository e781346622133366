#![forbid(unsafe_code)]

pub mod collaborators;
pub mod credential_service;
pub mod dataset_selector;
pub mod error;
pub mod http;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use collaborators::{
    AnswerChecker, CredentialPrompt, Grader, GradingBackend, KeyStatus, QuestionStore,
    RequestScope, Scoped, SetRegistry,
};
pub use credential_service::{CredentialOutcome, CredentialService};
pub use dataset_selector::DataSetSelector;
pub use error::{
    CheckError, CollaboratorError, CredentialError, LoadError, SelectorError, SessionError,
    SubmissionError, ValidationError,
};
pub use http::{HttpCollaborators, HttpConfig};
pub use sessions::{
    Completion, Direction, DiscardReason, FailureKind, Notice, NoticeLevel, Phase,
    QuestionSetShuffler, QuizSession, SessionController, SessionProgress,
};
