use std::collections::HashMap;

use crate::model::ids::QuestionId;

/// Answers captured during one session, keyed by question.
///
/// An entry holding the empty string is an explicit blank: it counts as
/// answered for completeness checks but is not worth verifying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: HashMap<QuestionId, String>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `text` for `id`, returning the previous value if any.
    pub fn record(&mut self, id: QuestionId, text: impl Into<String>) -> Option<String> {
        self.answers.insert(id, text.into())
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&str> {
        self.answers.get(&id).map(String::as_str)
    }

    /// The stored answer when it is present and non-empty.
    #[must_use]
    pub fn non_blank(&self, id: QuestionId) -> Option<&str> {
        self.get(id).filter(|text| !text.is_empty())
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.answers.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_entries_count_but_are_not_non_blank() {
        let mut sheet = AnswerSheet::new();
        sheet.record(QuestionId::new(1), "");
        assert!(sheet.contains(QuestionId::new(1)));
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.non_blank(QuestionId::new(1)), None);
    }

    #[test]
    fn record_replaces_previous_answer() {
        let mut sheet = AnswerSheet::new();
        assert_eq!(sheet.record(QuestionId::new(1), "A"), None);
        assert_eq!(sheet.record(QuestionId::new(1), "B"), Some("A".to_string()));
        assert_eq!(sheet.get(QuestionId::new(1)), Some("B"));
    }
}
