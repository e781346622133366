use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::ids::QuestionId;

/// Verification result for a single in-progress answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub is_correct: bool,
    pub model_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Feedback {
    #[must_use]
    pub fn new(is_correct: bool, model_answer: impl Into<String>) -> Self {
        Self {
            is_correct,
            model_answer: model_answer.into(),
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Per-session store of check results.
///
/// Entries are written by successful checks and removed when the answer for
/// the same question is edited. Nothing expires on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackCache {
    entries: HashMap<QuestionId, Feedback>,
}

impl FeedbackCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Feedback> {
        self.entries.get(&id)
    }

    pub fn store(&mut self, id: QuestionId, feedback: Feedback) {
        self.entries.insert(id, feedback);
    }

    /// Drops the entry for `id`, returning whether one was present.
    pub fn invalidate(&mut self, id: QuestionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Number of questions with feedback on file.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_removes_only_that_question() {
        let mut cache = FeedbackCache::new();
        cache.store(QuestionId::new(1), Feedback::new(true, "A"));
        cache.store(QuestionId::new(2), Feedback::new(false, "B"));

        assert!(cache.invalidate(QuestionId::new(1)));
        assert!(cache.get(QuestionId::new(1)).is_none());
        assert!(cache.get(QuestionId::new(2)).is_some());
        assert!(!cache.invalidate(QuestionId::new(1)));
    }

    #[test]
    fn feedback_explanation_is_optional_on_the_wire() {
        let fb: Feedback =
            serde_json::from_str(r#"{"is_correct":true,"model_answer":"A"}"#).unwrap();
        assert_eq!(fb, Feedback::new(true, "A"));
    }
}
