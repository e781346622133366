use chrono::{DateTime, Utc};
use std::collections::HashSet;

use quiz_core::model::{
    AnswerSheet, Feedback, FeedbackCache, Question, QuestionId, SessionId, SubmissionEntry,
};
use quiz_core::{SubmissionPolicy, build_payload};

use crate::collaborators::RequestScope;
use crate::error::{LoadError, ValidationError};
use super::progress::SessionProgress;

/// Cursor movement requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz attempt: a fixed question order, a cursor, and what the user has
/// entered so far.
///
/// Answer and feedback keys are always ids of questions in this session.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: SessionId,
    scope: RequestScope,
    questions: Vec<Question>,
    cursor: usize,
    answers: AnswerSheet,
    feedback: FeedbackCache,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    /// Start a session over `questions` in the given order.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        scope: RequestScope,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, LoadError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(LoadError::DuplicateQuestion(question.id()));
            }
        }

        Ok(Self {
            id: SessionId::new_random(),
            scope,
            questions,
            cursor: 0,
            answers: AnswerSheet::new(),
            feedback: FeedbackCache::new(),
            started_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Dataset and subject this session was loaded under.
    #[must_use]
    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, id: QuestionId) -> Option<&str> {
        self.answers.get(id)
    }

    #[must_use]
    pub fn feedback(&self, id: QuestionId) -> Option<&Feedback> {
        self.feedback.get(id)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let position = if self.questions.is_empty() {
            0
        } else {
            self.cursor + 1
        };
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.len(),
            checked: self.feedback.count(),
            position,
        }
    }

    /// Store `text` as the answer to `id` and drop any feedback for it.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownQuestion` for ids outside the session and
    /// `ValidationError::NotAnOption` when a multiple-choice answer is not one of
    /// the listed options.
    pub fn record_answer(
        &mut self,
        id: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let text = text.into();
        let question = self
            .question(id)
            .ok_or(ValidationError::UnknownQuestion(id))?;
        if !question.accepts(&text) {
            return Err(ValidationError::NotAnOption {
                question_id: id,
                text,
            });
        }

        self.answers.record(id, text);
        self.feedback.invalidate(id);
        Ok(())
    }

    /// Move the cursor one step. Returns `false` when already at the edge.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::Previous if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Direction::Next if self.cursor + 1 < self.questions.len() => {
                self.cursor += 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn store_feedback(&mut self, id: QuestionId, feedback: Feedback) {
        self.feedback.store(id, feedback);
    }

    /// Assemble the grading payload under `policy`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Incomplete` when `policy` requires every
    /// question to be answered and some are missing.
    pub fn build_payload(
        &self,
        policy: SubmissionPolicy,
    ) -> Result<Vec<SubmissionEntry>, ValidationError> {
        Ok(build_payload(&self.questions, &self.answers, policy)?)
    }
}
