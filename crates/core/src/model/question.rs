use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {0} is multiple choice but has no options")]
    MissingOptions(QuestionId),

    #[error("question {0} is not multiple choice but carries options")]
    UnexpectedOptions(QuestionId),

    #[error("unknown question type: {0}")]
    UnknownType(String),
}

//
// ─── QUESTION TYPE ────────────────────────────────────────────────────────────
//

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Pick exactly one of the listed options.
    MultipleChoice,
    ShortAnswer,
    Descriptive,
    Coding,
}

impl QuestionType {
    /// Parses the wire name (`multiple_choice`, `short_answer`, ...).
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownType` for any other value.
    pub fn parse(raw: &str) -> Result<Self, QuestionError> {
        match raw.trim() {
            "multiple_choice" => Ok(Self::MultipleChoice),
            "short_answer" => Ok(Self::ShortAnswer),
            "descriptive" => Ok(Self::Descriptive),
            "coding" => Ok(Self::Coding),
            other => Err(QuestionError::UnknownType(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::ShortAnswer => "short_answer",
            Self::Descriptive => "descriptive",
            Self::Coding => "coding",
        }
    }

    #[must_use]
    pub fn is_free_form(self) -> bool {
        !matches!(self, Self::MultipleChoice)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// Read-only question record owned by the question store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    subject: String,
    question_text: String,
    question_type: QuestionType,
    options: Vec<String>,
}

impl Question {
    /// Builds a question, checking that options are present exactly when the
    /// question is multiple choice.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::MissingOptions` or `QuestionError::UnexpectedOptions`.
    pub fn new(
        id: QuestionId,
        subject: impl Into<String>,
        question_text: impl Into<String>,
        question_type: QuestionType,
        options: Vec<String>,
    ) -> Result<Self, QuestionError> {
        match question_type {
            QuestionType::MultipleChoice if options.is_empty() => {
                return Err(QuestionError::MissingOptions(id));
            }
            t if t.is_free_form() && !options.is_empty() => {
                return Err(QuestionError::UnexpectedOptions(id));
            }
            _ => {}
        }

        Ok(Self {
            id,
            subject: subject.into(),
            question_text: question_text.into(),
            question_type,
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    /// Options in display order; empty unless multiple choice.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Whether `text` may be stored as the answer to this question.
    ///
    /// Multiple-choice answers must match an option verbatim; free-form
    /// questions accept any text, including the empty string.
    #[must_use]
    pub fn accepts(&self, text: &str) -> bool {
        match self.question_type {
            QuestionType::MultipleChoice => self.options.iter().any(|o| o == text),
            _ => true,
        }
    }
}
