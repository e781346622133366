//! JSON shapes exchanged with the quiz backend.

use serde::{Deserialize, Serialize};

use quiz_core::model::{Feedback, GradeResult, Question, QuestionId, QuestionType};

use crate::collaborators::KeyStatus;
use crate::error::CollaboratorError;

#[derive(Debug, Deserialize)]
pub(crate) struct SetItem {
    pub name: String,
}

/// Question as served by `/api/questions/{subject}`. Extra grading fields
/// (model answer, keywords) are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct QuestionRecord {
    pub id: u64,
    pub subject: String,
    pub question_text: String,
    pub question_type: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

impl QuestionRecord {
    /// Validate into a domain question. Free-form questions arrive with
    /// `options` either null or `[]`; both become an empty list.
    pub fn into_question(self) -> Result<Question, CollaboratorError> {
        let question_type = QuestionType::parse(&self.question_type)
            .map_err(|err| CollaboratorError::Malformed(err.to_string()))?;
        Question::new(
            QuestionId::new(self.id),
            self.subject,
            self.question_text,
            question_type,
            self.options.unwrap_or_default(),
        )
        .map_err(|err| CollaboratorError::Malformed(err.to_string()))
    }
}

/// `AnswerResult` from check and submit endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct AnswerResult {
    pub question_id: u64,
    pub is_correct: bool,
    pub score: f64,
    pub model_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl AnswerResult {
    pub fn into_feedback(self) -> Feedback {
        let feedback = Feedback::new(self.is_correct, self.model_answer);
        match self.explanation {
            Some(explanation) => feedback.with_explanation(explanation),
            None => feedback,
        }
    }

    pub fn into_grade_result(self) -> GradeResult {
        GradeResult {
            question_id: QuestionId::new(self.question_id),
            is_correct: self.is_correct,
            score: self.score,
            model_answer: self.model_answer,
            explanation: self.explanation,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyStatusRecord {
    pub gemini_key_set: bool,
}

impl From<KeyStatusRecord> for KeyStatus {
    fn from(record: KeyStatusRecord) -> Self {
        Self {
            ai_grading_enabled: record.gemini_key_set,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiKeyPayload<'a> {
    pub api_key: &'a str,
}
