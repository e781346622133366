use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{DatasetId, QuestionId, Subject};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("score {score} for question {question_id} is outside [0, 1]")]
    ScoreOutOfRange { question_id: QuestionId, score: f64 },

    #[error("graded question {0} is not part of the submission")]
    UnknownQuestion(QuestionId),

    #[error("question {0} was graded more than once")]
    DuplicateResult(QuestionId),

    #[error("finished_at is before started_at")]
    InvalidTimeRange,
}

//
// ─── WIRE SHAPES ──────────────────────────────────────────────────────────────
//

/// One `(question id, answer)` pair sent for grading or checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub question_id: QuestionId,
    pub answer: String,
}

impl SubmissionEntry {
    #[must_use]
    pub fn new(question_id: QuestionId, answer: impl Into<String>) -> Self {
        Self {
            question_id,
            answer: answer.into(),
        }
    }
}

/// Per-question outcome returned by the grading collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    /// Fractional credit in `[0, 1]`.
    pub score: f64,
    pub model_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

//
// ─── REPORT ───────────────────────────────────────────────────────────────────
//

/// Outcome of a finished attempt, ready for a results screen.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeReport {
    dataset: DatasetId,
    subject: Subject,
    ended_early: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    total_questions: usize,
    submitted: Vec<SubmissionEntry>,
    results: Vec<GradeResult>,
}

/// Descriptive fields of a report that do not come from the grader.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub dataset: DatasetId,
    pub subject: Subject,
    pub ended_early: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl GradeReport {
    /// Assemble a report from what was submitted and what the grader returned.
    ///
    /// # Errors
    ///
    /// Returns `GradeError` when a score is out of range, a result names a
    /// question that was not submitted or appears twice, or the timestamps
    /// are reversed.
    pub fn new(
        context: ReportContext,
        submitted: Vec<SubmissionEntry>,
        results: Vec<GradeResult>,
    ) -> Result<Self, GradeError> {
        if context.finished_at < context.started_at {
            return Err(GradeError::InvalidTimeRange);
        }

        let known: HashSet<QuestionId> = submitted.iter().map(|e| e.question_id).collect();
        let mut graded = HashSet::with_capacity(results.len());
        for result in &results {
            if !known.contains(&result.question_id) {
                return Err(GradeError::UnknownQuestion(result.question_id));
            }
            if !graded.insert(result.question_id) {
                return Err(GradeError::DuplicateResult(result.question_id));
            }
            if !(0.0..=1.0).contains(&result.score) {
                return Err(GradeError::ScoreOutOfRange {
                    question_id: result.question_id,
                    score: result.score,
                });
            }
        }

        Ok(Self {
            dataset: context.dataset,
            subject: context.subject,
            ended_early: context.ended_early,
            started_at: context.started_at,
            finished_at: context.finished_at,
            total_questions: submitted.len(),
            submitted,
            results,
        })
    }

    #[must_use]
    pub fn dataset(&self) -> &DatasetId {
        &self.dataset
    }

    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    #[must_use]
    pub fn ended_early(&self) -> bool {
        self.ended_early
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Results in the order the grader returned them.
    #[must_use]
    pub fn results(&self) -> &[GradeResult] {
        &self.results
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.results.iter().filter(|r| r.is_correct).count()
    }

    /// Share of correct answers over all submitted questions, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.correct() as f64 / self.total_questions as f64 * 100.0
    }

    #[must_use]
    pub fn total_score(&self) -> f64 {
        self.results.iter().map(|r| r.score).sum()
    }

    /// What the user submitted for `id` (empty for padded blanks).
    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> Option<&str> {
        self.submitted
            .iter()
            .find(|e| e.question_id == id)
            .map(|e| e.answer.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn context() -> ReportContext {
        ReportContext {
            dataset: DatasetId::parse("AI_prob.db").unwrap(),
            subject: Subject::all(),
            ended_early: false,
            started_at: fixed_now(),
            finished_at: fixed_now(),
        }
    }

    fn result(id: u64, is_correct: bool, score: f64) -> GradeResult {
        GradeResult {
            question_id: QuestionId::new(id),
            is_correct,
            score,
            model_answer: "m".into(),
            explanation: None,
        }
    }

    #[test]
    fn report_counts_correct_answers() {
        let submitted = vec![
            SubmissionEntry::new(QuestionId::new(1), "A"),
            SubmissionEntry::new(QuestionId::new(2), "hello"),
            SubmissionEntry::new(QuestionId::new(3), ""),
            SubmissionEntry::new(QuestionId::new(4), "x"),
        ];
        let results = vec![
            result(1, true, 1.0),
            result(2, false, 0.4),
            result(3, false, 0.0),
            result(4, true, 0.9),
        ];
        let report = GradeReport::new(context(), submitted, results).unwrap();

        assert_eq!(report.correct(), 2);
        assert_eq!(report.total_questions(), 4);
        assert!((report.percentage() - 50.0).abs() < f64::EPSILON);
        assert!((report.total_score() - 2.3).abs() < 1e-9);
        assert_eq!(report.answer_for(QuestionId::new(3)), Some(""));
    }

    #[test]
    fn report_rejects_out_of_range_scores() {
        let submitted = vec![SubmissionEntry::new(QuestionId::new(1), "A")];
        let err = GradeReport::new(context(), submitted, vec![result(1, true, 1.5)]).unwrap_err();
        assert!(matches!(err, GradeError::ScoreOutOfRange { .. }));
    }

    #[test]
    fn report_rejects_unknown_questions() {
        let submitted = vec![SubmissionEntry::new(QuestionId::new(1), "A")];
        let err = GradeReport::new(context(), submitted, vec![result(9, true, 1.0)]).unwrap_err();
        assert_eq!(err, GradeError::UnknownQuestion(QuestionId::new(9)));
    }

    #[test]
    fn report_rejects_questions_graded_twice() {
        let submitted = vec![
            SubmissionEntry::new(QuestionId::new(1), "A"),
            SubmissionEntry::new(QuestionId::new(2), "B"),
        ];
        let results = vec![result(1, true, 1.0), result(1, true, 1.0)];
        let err = GradeReport::new(context(), submitted, results).unwrap_err();
        assert_eq!(err, GradeError::DuplicateResult(QuestionId::new(1)));
    }

    #[test]
    fn empty_report_has_zero_percentage() {
        let report = GradeReport::new(context(), Vec::new(), Vec::new()).unwrap();
        assert_eq!(report.percentage(), 0.0);
    }
}
