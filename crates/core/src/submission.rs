//! Builds the `(question id, answer)` list sent for grading.

use thiserror::Error;

use crate::model::{AnswerSheet, Question, SubmissionEntry};

/// How unanswered questions are treated when assembling a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPolicy {
    /// Every question must have an entry; blanks recorded by the user count.
    RequireComplete,
    /// Questions without an entry are submitted as the empty string.
    PadMissing,
}

impl SubmissionPolicy {
    #[must_use]
    pub fn pads_missing(self) -> bool {
        matches!(self, Self::PadMissing)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("answered {answered} of {total} questions")]
    Incomplete { answered: usize, total: usize },
}

/// Produce one entry per question, in session order.
///
/// # Errors
///
/// Returns `SubmissionError::Incomplete` under `RequireComplete` when the
/// number of recorded answers differs from the number of questions.
pub fn build_payload(
    questions: &[Question],
    answers: &AnswerSheet,
    policy: SubmissionPolicy,
) -> Result<Vec<SubmissionEntry>, SubmissionError> {
    if !policy.pads_missing() && answers.len() != questions.len() {
        return Err(SubmissionError::Incomplete {
            answered: answers.len(),
            total: questions.len(),
        });
    }

    let mut payload = Vec::with_capacity(questions.len());
    for question in questions {
        let answer = match answers.get(question.id()) {
            Some(text) => text,
            None if policy.pads_missing() => "",
            None => {
                return Err(SubmissionError::Incomplete {
                    answered: answers.len(),
                    total: questions.len(),
                });
            }
        };
        payload.push(SubmissionEntry::new(question.id(), answer));
    }
    Ok(payload)
}
