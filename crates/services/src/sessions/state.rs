use std::fmt;

use quiz_core::model::{QuestionId, SessionId, SubmissionEntry};

use crate::collaborators::RequestScope;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Which operation put the controller into `Phase::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No session exists; retry with a new load.
    Load,
    /// The session is kept; answers may be edited and the submission retried.
    Submission,
}

/// Lifecycle of the quiz controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Submitting,
    Submitted,
    Failed(FailureKind),
}

impl Phase {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
            Self::Failed(FailureKind::Load) => "failed to load",
            Self::Failed(FailureKind::Submission) => "failed to submit",
        }
    }

    /// Phases in which answers, navigation and checks are accepted.
    #[must_use]
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Ready | Self::Failed(FailureKind::Submission))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//
// ─── NOTICE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Error,
    Info,
}

/// Inline message for the host to show next to the quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub const NO_DATASET: &'static str = "Please select a question set first.";
    pub const NO_ANSWER: &'static str = "Please provide an answer before checking.";
    pub const INCOMPLETE: &'static str = "Please answer all questions before submitting.";
    pub const NO_QUESTIONS: &'static str = "There are no questions to submit.";
    pub const LOAD_FAILED: &'static str =
        "Failed to load questions. Please ensure the backend server is running.";
    pub const CHECK_FAILED: &'static str = "Failed to check answer.";
    pub const SUBMIT_FAILED: &'static str = "Failed to submit answers.";
    pub const LOAD_SUPERSEDED: &'static str =
        "The question set changed while loading. Please load again.";

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

//
// ─── TICKETS ───────────────────────────────────────────────────────────────────
//

/// Issued by `begin_load`; hand it back with the store's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub(crate) generation: u64,
    pub(crate) scope: RequestScope,
}

impl LoadTicket {
    #[must_use]
    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }
}

/// Issued by `begin_check`; carries the exact answer that was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    pub(crate) session: SessionId,
    pub(crate) scope: RequestScope,
    pub(crate) entry: SubmissionEntry,
}

impl CheckTicket {
    #[must_use]
    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    #[must_use]
    pub fn entry(&self) -> &SubmissionEntry {
        &self.entry
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.entry.question_id
    }
}

/// Issued by `begin_submit`; owns the payload to forward to the grader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    pub(crate) generation: u64,
    pub(crate) session: SessionId,
    pub(crate) scope: RequestScope,
    pub(crate) payload: Vec<SubmissionEntry>,
    pub(crate) ended_early: bool,
}

impl SubmitTicket {
    #[must_use]
    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    #[must_use]
    pub fn payload(&self) -> &[SubmissionEntry] {
        &self.payload
    }

    #[must_use]
    pub fn ended_early(&self) -> bool {
        self.ended_early
    }
}

//
// ─── COMPLETION ────────────────────────────────────────────────────────────────
//

/// Why a collaborator response was dropped without touching the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// A newer request of the same kind was issued, or the request was cancelled.
    Superseded,
    /// The response echoes a different dataset or subject than was requested.
    ScopeMismatch,
    /// The active dataset changed while the request was in flight.
    SelectionChanged,
    /// The answer was edited after it was sent for checking.
    AnswerChanged,
    /// The session the request belonged to no longer exists.
    SessionGone,
    /// The session is being submitted and no longer takes feedback.
    SessionClosed,
}

/// Outcome of feeding a response back into the controller.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Completion<T> {
    Applied(T),
    Discarded(DiscardReason),
}

impl<T> Completion<T> {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Discarded(_) => None,
        }
    }
}
