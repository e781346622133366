use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{
    DEFAULT_CALL_TIMEOUT, Feedback, GradeReport, GradeResult, Question, QuestionId,
    ReportContext, Subject, SubmissionEntry,
};
use quiz_core::{Clock, SubmissionPolicy};

use crate::collaborators::{AnswerChecker, Grader, QuestionStore, Scoped, call_within};
use crate::dataset_selector::DataSetSelector;
use crate::error::{
    CheckError, CollaboratorError, LoadError, SessionError, SubmissionError, ValidationError,
};
use super::progress::SessionProgress;
use super::session::{Direction, QuizSession};
use super::shuffle::QuestionSetShuffler;
use super::state::{
    CheckTicket, Completion, DiscardReason, FailureKind, LoadTicket, Notice, Phase, SubmitTicket,
};

/// Quiz state machine.
///
/// Every network-backed operation is split into a `begin_*` step that
/// validates and returns a ticket, and a `complete_*` step that takes the
/// ticket back together with the collaborator's response. Responses that no
/// longer match the controller's state are discarded without side effects.
/// The async drivers (`load`, `check_answer`, `submit`, `end_session_early`)
/// run both steps around a timed collaborator call.
pub struct SessionController {
    selector: Arc<DataSetSelector>,
    questions: Arc<dyn QuestionStore>,
    checker: Arc<dyn AnswerChecker>,
    grader: Arc<dyn Grader>,
    clock: Clock,
    shuffler: QuestionSetShuffler,
    call_timeout: Duration,

    phase: Phase,
    session: Option<QuizSession>,
    generation: u64,
    pending_load: Option<u64>,
    pending_submit: Option<u64>,
    /// Outstanding checks per question.
    pending_checks: HashMap<QuestionId, u32>,
    notice: Option<Notice>,
    report: Option<GradeReport>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        selector: Arc<DataSetSelector>,
        questions: Arc<dyn QuestionStore>,
        checker: Arc<dyn AnswerChecker>,
        grader: Arc<dyn Grader>,
    ) -> Self {
        Self {
            selector,
            questions,
            checker,
            grader,
            clock: Clock::default(),
            shuffler: QuestionSetShuffler::from_entropy(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            phase: Phase::Idle,
            session: None,
            generation: 0,
            pending_load: None,
            pending_submit: None,
            pending_checks: HashMap::new(),
            notice: None,
            report: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_shuffler(mut self, shuffler: QuestionSetShuffler) -> Self {
        self.shuffler = shuffler;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = limit;
        self
    }

    // ─── Queries ──────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.session.as_ref().and_then(QuizSession::current)
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.session.as_ref().map(QuizSession::progress)
    }

    /// Message the host should display, if any.
    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Result of the last successful submission.
    #[must_use]
    pub fn report(&self) -> Option<&GradeReport> {
        self.report.as_ref()
    }

    /// Whether a check for `id` has been dispatched and not yet completed.
    #[must_use]
    pub fn is_check_pending(&self, id: QuestionId) -> bool {
        self.pending_checks.contains_key(&id)
    }

    // ─── Load ─────────────────────────────────────────────────────────────────

    /// Start loading questions for `subject` under the active dataset.
    ///
    /// Always starts afresh: any existing session, pending request or failure
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NoDatasetSelected` if nothing is selected.
    pub fn begin_load(&mut self, subject: Subject) -> Result<LoadTicket, SessionError> {
        self.generation += 1;
        self.session = None;
        self.report = None;
        self.pending_submit = None;
        self.pending_checks.clear();
        self.notice = None;

        let Some(scope) = self.selector.scope(subject) else {
            self.pending_load = None;
            self.phase = Phase::Failed(FailureKind::Load);
            self.notice = Some(Notice::error(Notice::NO_DATASET));
            return Err(LoadError::NoDatasetSelected.into());
        };

        tracing::info!(dataset = %scope.dataset, subject = %scope.subject, "loading questions");
        self.pending_load = Some(self.generation);
        self.phase = Phase::Loading;
        Ok(LoadTicket {
            generation: self.generation,
            scope,
        })
    }

    /// Apply the question store's response to a load.
    ///
    /// Returns the number of questions on success.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when the fetch failed or the questions
    /// repeat an id. The controller moves to `Failed(Load)`.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        outcome: Result<Scoped<Vec<Question>>, CollaboratorError>,
    ) -> Result<Completion<usize>, SessionError> {
        if self.pending_load != Some(ticket.generation) {
            tracing::debug!(dataset = %ticket.scope.dataset, "discarding superseded load");
            return Ok(Completion::Discarded(DiscardReason::Superseded));
        }

        let response = match outcome {
            Ok(response) => response,
            Err(err) => return Err(self.fail_load(LoadError::Fetch(err))),
        };
        if !response.answers(&ticket.scope) {
            tracing::warn!(
                requested = %ticket.scope.dataset,
                received = %response.scope.dataset,
                "discarding load response for another scope"
            );
            return Ok(Completion::Discarded(DiscardReason::ScopeMismatch));
        }
        if self.selector.active().as_ref() != Some(&ticket.scope.dataset) {
            tracing::warn!(dataset = %ticket.scope.dataset, "selection changed during load");
            return Ok(Completion::Discarded(DiscardReason::SelectionChanged));
        }

        let questions = self.shuffler.shuffle(response.value);
        let session = match QuizSession::new(ticket.scope, questions, self.clock.now()) {
            Ok(session) => session,
            Err(err) => return Err(self.fail_load(err)),
        };

        let count = session.len();
        tracing::info!(session = %session.id(), questions = count, "session ready");
        self.pending_load = None;
        self.session = Some(session);
        self.phase = Phase::Ready;
        Ok(Completion::Applied(count))
    }

    fn fail_load(&mut self, err: LoadError) -> SessionError {
        tracing::warn!(error = %err, "load failed");
        self.pending_load = None;
        self.session = None;
        self.phase = Phase::Failed(FailureKind::Load);
        self.notice = Some(Notice::error(Notice::LOAD_FAILED));
        err.into()
    }

    // ─── Answers and navigation ───────────────────────────────────────────────

    /// Record `text` for `id`, dropping any feedback it had.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside an editable phase and
    /// `SessionError::Validation` for unknown ids or non-option choices.
    pub fn record_answer(
        &mut self,
        id: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.notice = None;
        let session = self.editable_session("record an answer")?;
        session.record_answer(id, text)?;
        Ok(())
    }

    /// Move the cursor. Returns `false` at either end of the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside an editable phase.
    pub fn navigate(&mut self, direction: Direction) -> Result<bool, SessionError> {
        let session = self.editable_session("navigate")?;
        Ok(session.navigate(direction))
    }

    fn editable_session(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut QuizSession, SessionError> {
        let phase = self.phase;
        match self.session.as_mut() {
            Some(session) if phase.is_editable() => Ok(session),
            _ => Err(SessionError::InvalidState {
                operation,
                phase: phase.name(),
            }),
        }
    }

    // ─── Check ────────────────────────────────────────────────────────────────

    /// Prepare a check of the answer at the cursor.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NoAnswer` when the current answer is missing
    /// or empty, and `ValidationError::NoQuestions` for an empty session.
    pub fn begin_check(&mut self) -> Result<CheckTicket, SessionError> {
        let session = self.editable_session("check an answer")?;
        let Some(question) = session.current() else {
            return Err(ValidationError::NoQuestions.into());
        };
        let id = question.id();

        let Some(answer) = session.answers().non_blank(id) else {
            self.notice = Some(Notice::error(Notice::NO_ANSWER));
            return Err(ValidationError::NoAnswer(id).into());
        };
        let ticket = CheckTicket {
            session: session.id(),
            scope: session.scope().clone(),
            entry: SubmissionEntry::new(id, answer),
        };

        self.notice = None;
        *self.pending_checks.entry(id).or_insert(0) += 1;
        Ok(ticket)
    }

    /// Apply the checker's response.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Check` when the checker failed. Feedback stays
    /// unset and the session is otherwise untouched.
    pub fn complete_check(
        &mut self,
        ticket: CheckTicket,
        outcome: Result<Scoped<Feedback>, CollaboratorError>,
    ) -> Result<Completion<Feedback>, SessionError> {
        let id = ticket.question_id();
        let phase = self.phase;
        let Some(session) = self.session.as_mut().filter(|s| s.id() == ticket.session) else {
            return Ok(Completion::Discarded(DiscardReason::SessionGone));
        };
        if let Some(outstanding) = self.pending_checks.get_mut(&id) {
            *outstanding -= 1;
            if *outstanding == 0 {
                self.pending_checks.remove(&id);
            }
        }

        if phase == Phase::Submitting {
            return Ok(Completion::Discarded(DiscardReason::SessionClosed));
        }

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(question = %id, error = %err, "answer check failed");
                self.notice = Some(Notice::error(Notice::CHECK_FAILED));
                return Err(CheckError::from(err).into());
            }
        };
        if !response.answers(&ticket.scope) {
            tracing::warn!(question = %id, "discarding feedback for another scope");
            return Ok(Completion::Discarded(DiscardReason::ScopeMismatch));
        }
        if session.answer(id) != Some(ticket.entry.answer.as_str()) {
            tracing::debug!(question = %id, "answer edited while checking; feedback dropped");
            return Ok(Completion::Discarded(DiscardReason::AnswerChanged));
        }

        tracing::debug!(question = %id, correct = response.value.is_correct, "answer checked");
        session.store_feedback(id, response.value.clone());
        Ok(Completion::Applied(response.value))
    }

    // ─── Submit ───────────────────────────────────────────────────────────────

    /// Assemble the payload under `policy` and move to `Submitting`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Incomplete` when `RequireComplete` is not met
    /// and `ValidationError::NoQuestions` for an empty session. Neither
    /// changes the phase.
    pub fn begin_submit(&mut self, policy: SubmissionPolicy) -> Result<SubmitTicket, SessionError> {
        let session = self.editable_session("submit")?;
        if session.is_empty() {
            self.notice = Some(Notice::error(Notice::NO_QUESTIONS));
            return Err(ValidationError::NoQuestions.into());
        }
        let payload = match session.build_payload(policy) {
            Ok(payload) => payload,
            Err(err) => {
                self.notice = Some(Notice::error(Notice::INCOMPLETE));
                return Err(err.into());
            }
        };
        let session_id = session.id();
        let scope = session.scope().clone();

        self.generation += 1;
        self.pending_submit = Some(self.generation);
        self.phase = Phase::Submitting;
        self.notice = None;
        tracing::info!(
            session = %session_id,
            entries = payload.len(),
            ended_early = policy.pads_missing(),
            "submitting answers"
        );
        Ok(SubmitTicket {
            generation: self.generation,
            session: session_id,
            scope,
            payload,
            ended_early: policy.pads_missing(),
        })
    }

    /// Apply the grader's response.
    ///
    /// On success the session is closed and the report kept for display.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submission` when grading failed, answered for
    /// another scope, or returned invalid results. The session is kept in
    /// `Failed(Submission)` so it can be edited and resubmitted.
    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        outcome: Result<Scoped<Vec<GradeResult>>, CollaboratorError>,
    ) -> Result<Completion<GradeReport>, SessionError> {
        if self.pending_submit != Some(ticket.generation) {
            return Ok(Completion::Discarded(DiscardReason::Superseded));
        }
        let Some(session) = self.session.as_ref().filter(|s| s.id() == ticket.session) else {
            return Ok(Completion::Discarded(DiscardReason::SessionGone));
        };
        let started_at = session.started_at();
        self.pending_submit = None;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => return Err(self.fail_submission(err.into())),
        };
        if !response.answers(&ticket.scope) {
            return Err(self.fail_submission(SubmissionError::ScopeMismatch));
        }

        let context = ReportContext {
            dataset: ticket.scope.dataset,
            subject: ticket.scope.subject,
            ended_early: ticket.ended_early,
            started_at,
            finished_at: self.clock.now(),
        };
        let report = match GradeReport::new(context, ticket.payload, response.value) {
            Ok(report) => report,
            Err(err) => return Err(self.fail_submission(err.into())),
        };

        tracing::info!(
            correct = report.correct(),
            total = report.total_questions(),
            "submission graded"
        );
        self.session = None;
        self.pending_checks.clear();
        self.phase = Phase::Submitted;
        self.report = Some(report.clone());
        Ok(Completion::Applied(report))
    }

    fn fail_submission(&mut self, err: SubmissionError) -> SessionError {
        tracing::warn!(error = %err, "submission failed");
        self.phase = Phase::Failed(FailureKind::Submission);
        self.notice = Some(Notice::error(Notice::SUBMIT_FAILED));
        err.into()
    }

    // ─── Cancellation ─────────────────────────────────────────────────────────

    /// Abandon an outstanding load or submission.
    ///
    /// A cancelled load returns to `Idle`, a cancelled submission to `Ready`.
    /// Late responses to the abandoned request are discarded. Returns whether
    /// anything was cancelled.
    pub fn cancel_pending(&mut self) -> bool {
        match self.phase {
            Phase::Loading => {
                self.pending_load = None;
                self.phase = Phase::Idle;
            }
            Phase::Submitting => {
                self.pending_submit = None;
                self.phase = Phase::Ready;
            }
            _ => return false,
        }
        self.generation += 1;
        tracing::debug!("pending request cancelled");
        true
    }

    /// Discard the session and any pending work, e.g. when the user navigates away.
    pub fn leave(&mut self) {
        self.generation += 1;
        self.pending_load = None;
        self.pending_submit = None;
        self.pending_checks.clear();
        self.session = None;
        self.report = None;
        self.notice = None;
        self.phase = Phase::Idle;
    }

    // ─── Async drivers ────────────────────────────────────────────────────────

    /// Fetch, shuffle and start a session for `subject`.
    ///
    /// A response discarded as stale leaves the controller `Idle` with an
    /// informational notice.
    ///
    /// # Errors
    ///
    /// See `begin_load` and `complete_load`. A timeout is a load failure.
    pub async fn load(&mut self, subject: Subject) -> Result<Completion<usize>, SessionError> {
        let ticket = self.begin_load(subject)?;
        let generation = ticket.generation;
        let store = Arc::clone(&self.questions);
        let outcome = call_within(self.call_timeout, store.fetch(ticket.scope())).await;

        let completion = self.complete_load(ticket, outcome)?;
        if !completion.is_applied() && self.pending_load == Some(generation) {
            self.pending_load = None;
            self.phase = Phase::Idle;
            self.notice = Some(Notice::info(Notice::LOAD_SUPERSEDED));
        }
        Ok(completion)
    }

    /// Verify the answer at the cursor.
    ///
    /// # Errors
    ///
    /// See `begin_check` and `complete_check`.
    pub async fn check_answer(&mut self) -> Result<Completion<Feedback>, SessionError> {
        let ticket = self.begin_check()?;
        let checker = Arc::clone(&self.checker);
        let outcome =
            call_within(self.call_timeout, checker.check(ticket.scope(), ticket.entry())).await;
        self.complete_check(ticket, outcome)
    }

    /// Submit, requiring every question to have an entry.
    ///
    /// # Errors
    ///
    /// See `begin_submit` and `complete_submit`.
    pub async fn submit(&mut self) -> Result<Completion<GradeReport>, SessionError> {
        self.submit_with(SubmissionPolicy::RequireComplete).await
    }

    /// Submit now, sending an empty answer for every untouched question.
    ///
    /// # Errors
    ///
    /// See `complete_submit`.
    pub async fn end_session_early(&mut self) -> Result<Completion<GradeReport>, SessionError> {
        self.submit_with(SubmissionPolicy::PadMissing).await
    }

    async fn submit_with(
        &mut self,
        policy: SubmissionPolicy,
    ) -> Result<Completion<GradeReport>, SessionError> {
        let ticket = self.begin_submit(policy)?;
        let grader = Arc::clone(&self.grader);
        let outcome =
            call_within(self.call_timeout, grader.grade(ticket.scope(), ticket.payload())).await;
        self.complete_submit(ticket, outcome)
    }
}
