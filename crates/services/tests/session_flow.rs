use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quiz_core::Clock;
use quiz_core::model::{
    DatasetId, Feedback, GradeResult, Question, QuestionId, QuestionType, Subject,
    SubmissionEntry,
};
use quiz_core::time::fixed_now;
use services::{
    AnswerChecker, CollaboratorError, Completion, DataSetSelector, Direction, DiscardReason,
    FailureKind, Grader, Phase, QuestionSetShuffler, QuestionStore, RequestScope, Scoped,
    SessionController, SessionError, SetRegistry, SubmissionError, ValidationError,
};
use storage::repository::Storage;

// ─── Mocks ─────────────────────────────────────────────────────────────────────

struct StaticRegistry;

#[async_trait]
impl SetRegistry for StaticRegistry {
    async fn list(&self) -> Result<Vec<DatasetId>, CollaboratorError> {
        Ok(vec![dataset("setA.db"), dataset("setB.db")])
    }
}

/// Serves the three-question fixture, echoing whatever scope it is asked for.
#[derive(Default)]
struct FixtureStore {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

#[async_trait]
impl QuestionStore for FixtureStore {
    async fn fetch(
        &self,
        scope: &RequestScope,
    ) -> Result<Scoped<Vec<Question>>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Scoped::new(scope.clone(), fixture()))
    }
}

#[derive(Default)]
struct RecordingChecker {
    seen: Mutex<Vec<SubmissionEntry>>,
}

impl RecordingChecker {
    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl AnswerChecker for RecordingChecker {
    async fn check(
        &self,
        scope: &RequestScope,
        entry: &SubmissionEntry,
    ) -> Result<Scoped<Feedback>, CollaboratorError> {
        self.seen.lock().unwrap().push(entry.clone());
        Ok(Scoped::new(scope.clone(), Feedback::new(true, entry.answer.clone())))
    }
}

/// Grades everything as correct unless told to fail.
#[derive(Default)]
struct RecordingGrader {
    payloads: Mutex<Vec<Vec<SubmissionEntry>>>,
    fail: Mutex<bool>,
}

impl RecordingGrader {
    fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    fn last_payload(&self) -> Vec<SubmissionEntry> {
        self.payloads.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Grader for RecordingGrader {
    async fn grade(
        &self,
        scope: &RequestScope,
        entries: &[SubmissionEntry],
    ) -> Result<Scoped<Vec<GradeResult>>, CollaboratorError> {
        self.payloads.lock().unwrap().push(entries.to_vec());
        if *self.fail.lock().unwrap() {
            return Err(CollaboratorError::Unavailable("grader down".into()));
        }
        let results = entries
            .iter()
            .map(|e| GradeResult {
                question_id: e.question_id,
                is_correct: !e.answer.is_empty(),
                score: if e.answer.is_empty() { 0.0 } else { 1.0 },
                model_answer: "model".into(),
                explanation: None,
            })
            .collect();
        Ok(Scoped::new(scope.clone(), results))
    }
}

// ─── Harness ───────────────────────────────────────────────────────────────────

fn dataset(name: &str) -> DatasetId {
    DatasetId::parse(name).unwrap()
}

fn fixture() -> Vec<Question> {
    vec![
        Question::new(
            QuestionId::new(1),
            "EDA",
            "Which option?",
            QuestionType::MultipleChoice,
            vec!["A".into(), "B".into()],
        )
        .unwrap(),
        Question::new(QuestionId::new(2), "EDA", "Name it", QuestionType::ShortAnswer, vec![])
            .unwrap(),
        Question::new(QuestionId::new(3), "EDA", "Explain", QuestionType::Descriptive, vec![])
            .unwrap(),
    ]
}

struct Harness {
    controller: SessionController,
    selector: Arc<DataSetSelector>,
    store: Arc<FixtureStore>,
    checker: Arc<RecordingChecker>,
    grader: Arc<RecordingGrader>,
}

async fn harness_with(store: FixtureStore) -> Harness {
    let storage = Storage::in_memory();
    let selector = Arc::new(DataSetSelector::new(
        Arc::new(StaticRegistry),
        storage.client_state.clone(),
        Clock::fixed(fixed_now()),
    ));
    selector.select(dataset("setA.db")).await.unwrap();

    let store = Arc::new(store);
    let checker = Arc::new(RecordingChecker::default());
    let grader = Arc::new(RecordingGrader::default());
    let controller = SessionController::new(
        selector.clone(),
        store.clone(),
        checker.clone(),
        grader.clone(),
    )
    .with_clock(Clock::fixed(fixed_now()))
    .with_shuffler(QuestionSetShuffler::seeded(11));

    Harness {
        controller,
        selector,
        store,
        checker,
        grader,
    }
}

async fn harness() -> Harness {
    harness_with(FixtureStore::default()).await
}

async fn loaded() -> Harness {
    let mut h = harness().await;
    let done = h.controller.load(Subject::all()).await.unwrap();
    assert_eq!(done, Completion::Applied(3));
    h
}

fn focus(controller: &mut SessionController, id: QuestionId) {
    while controller.navigate(Direction::Previous).unwrap() {}
    while controller.current_question().unwrap().id() != id {
        assert!(controller.navigate(Direction::Next).unwrap());
    }
}

// ─── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_produces_a_permutation_of_the_fixture() {
    let h = loaded().await;
    let session = h.controller.session().unwrap();

    let mut ids: Vec<u64> = session.questions().iter().map(|q| q.id().value()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(session.cursor(), 0);
    assert!(session.answers().is_empty());
    assert_eq!(session.scope().dataset, dataset("setA.db"));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn check_then_edit_clears_feedback() {
    let mut h = loaded().await;
    let q1 = QuestionId::new(1);
    focus(&mut h.controller, q1);

    h.controller.record_answer(q1, "A").unwrap();
    let cursor = h.controller.session().unwrap().cursor();
    let feedback = h.controller.check_answer().await.unwrap().applied().unwrap();
    assert!(feedback.is_correct);
    assert_eq!(h.controller.session().unwrap().cursor(), cursor);
    assert_eq!(
        h.checker.seen.lock().unwrap().as_slice(),
        &[SubmissionEntry::new(q1, "A")]
    );

    let session = h.controller.session().unwrap();
    assert!(session.feedback(q1).unwrap().is_correct);

    h.controller.record_answer(q1, "B").unwrap();
    let session = h.controller.session().unwrap();
    assert!(session.feedback(q1).is_none());
    assert_eq!(session.cursor(), cursor);
}

#[tokio::test]
async fn check_without_answer_makes_no_call() {
    let mut h = loaded().await;
    let q2 = QuestionId::new(2);
    focus(&mut h.controller, q2);

    let err = h.controller.check_answer().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::NoAnswer(id)) if id == q2
    ));

    h.controller.record_answer(q2, "").unwrap();
    assert!(h.controller.check_answer().await.is_err());
    assert_eq!(h.checker.calls(), 0);
}

#[tokio::test]
async fn strict_submit_needs_every_answer() {
    let mut h = loaded().await;
    h.controller.record_answer(QuestionId::new(1), "A").unwrap();
    h.controller.record_answer(QuestionId::new(2), "hello").unwrap();

    let err = h.controller.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::Incomplete {
            answered: 2,
            total: 3
        })
    ));
    assert_eq!(h.grader.calls(), 0);
    assert_eq!(h.controller.phase(), Phase::Ready);

    // An explicit blank counts as answered.
    h.controller.record_answer(QuestionId::new(3), "").unwrap();
    let report = h.controller.submit().await.unwrap().applied().unwrap();
    assert_eq!(h.grader.last_payload().len(), 3);
    assert_eq!(report.total_questions(), 3);
    assert_eq!(report.correct(), 2);
    assert!(!report.ended_early());
    assert_eq!(h.controller.phase(), Phase::Submitted);
    assert!(h.controller.session().is_none());
}

#[tokio::test]
async fn ending_early_pads_missing_answers() {
    let mut h = loaded().await;
    h.controller.record_answer(QuestionId::new(1), "A").unwrap();
    h.controller.record_answer(QuestionId::new(2), "hello").unwrap();

    let report = h
        .controller
        .end_session_early()
        .await
        .unwrap()
        .applied()
        .unwrap();

    let mut payload = h.grader.last_payload();
    payload.sort_by_key(|e| e.question_id);
    assert_eq!(
        payload,
        vec![
            SubmissionEntry::new(QuestionId::new(1), "A"),
            SubmissionEntry::new(QuestionId::new(2), "hello"),
            SubmissionEntry::new(QuestionId::new(3), ""),
        ]
    );
    assert!(report.ended_early());
    assert_eq!(report.answer_for(QuestionId::new(3)), Some(""));
    assert!((report.percentage() - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn ending_early_with_nothing_answered_sends_every_question() {
    let mut h = loaded().await;
    let report = h.controller.end_session_early().await.unwrap().applied().unwrap();
    assert_eq!(report.correct(), 0);
    let payload = h.grader.last_payload();
    assert_eq!(payload.len(), 3);
    assert!(payload.iter().all(|e| e.answer.is_empty()));
}

#[tokio::test]
async fn navigation_is_clamped() {
    let mut h = loaded().await;
    assert!(!h.controller.navigate(Direction::Previous).unwrap());
    assert_eq!(h.controller.session().unwrap().cursor(), 0);

    assert!(h.controller.navigate(Direction::Next).unwrap());
    assert!(h.controller.navigate(Direction::Next).unwrap());
    assert!(!h.controller.navigate(Direction::Next).unwrap());
    assert_eq!(h.controller.session().unwrap().cursor(), 2);
    assert_eq!(h.controller.progress().unwrap().position, 3);
}

#[tokio::test]
async fn stale_load_from_previous_selection_is_discarded() {
    let mut h = harness().await;
    let stale = h.controller.begin_load(Subject::all()).unwrap();
    assert_eq!(stale.scope().dataset, dataset("setA.db"));

    h.selector.select(dataset("setB.db")).await.unwrap();
    let current = h.controller.begin_load(Subject::all()).unwrap();
    assert_eq!(current.scope().dataset, dataset("setB.db"));

    // setA's answer arrives late.
    let stale_scope = stale.scope().clone();
    let done = h
        .controller
        .complete_load(stale, Ok(Scoped::new(stale_scope.clone(), fixture())))
        .unwrap();
    assert_eq!(done, Completion::Discarded(DiscardReason::Superseded));
    assert!(h.controller.session().is_none());
    assert_eq!(h.controller.phase(), Phase::Loading);

    // A response tagged setA against the setB ticket is not accepted either.
    let done = h
        .controller
        .complete_load(current.clone(), Ok(Scoped::new(stale_scope, fixture())))
        .unwrap();
    assert_eq!(done, Completion::Discarded(DiscardReason::ScopeMismatch));
    assert!(h.controller.session().is_none());

    let scope = current.scope().clone();
    let done = h
        .controller
        .complete_load(current, Ok(Scoped::new(scope, fixture())))
        .unwrap();
    assert_eq!(done, Completion::Applied(3));
    assert_eq!(
        h.controller.session().unwrap().scope().dataset,
        dataset("setB.db")
    );
}

#[tokio::test]
async fn load_is_discarded_when_selection_changes_in_flight() {
    let mut h = harness().await;
    let ticket = h.controller.begin_load(Subject::all()).unwrap();
    h.selector.select(dataset("setB.db")).await.unwrap();

    let scope = ticket.scope().clone();
    let done = h
        .controller
        .complete_load(ticket, Ok(Scoped::new(scope, fixture())))
        .unwrap();
    assert_eq!(done, Completion::Discarded(DiscardReason::SelectionChanged));
    assert!(h.controller.session().is_none());
}

#[tokio::test]
async fn selecting_a_new_set_does_not_rescope_the_session() {
    let mut h = loaded().await;
    h.selector.select(dataset("setB.db")).await.unwrap();

    h.controller.record_answer(QuestionId::new(2), "x").unwrap();
    focus(&mut h.controller, QuestionId::new(2));
    let checked = h.controller.check_answer().await.unwrap();
    assert_eq!(checked, Completion::Applied(Feedback::new(true, "x")));
    assert!(h.controller.session().unwrap().feedback(QuestionId::new(2)).is_some());

    let ended = h.controller.end_session_early().await.unwrap();
    assert!(ended.is_applied());
    let report = h.controller.report().unwrap();
    assert_eq!(report.dataset(), &dataset("setA.db"));
}

#[tokio::test]
async fn failed_submission_keeps_answers_and_allows_retry() {
    let mut h = loaded().await;
    let q2 = QuestionId::new(2);
    focus(&mut h.controller, q2);
    h.controller.record_answer(q2, "hello").unwrap();
    assert!(h.controller.check_answer().await.unwrap().is_applied());
    *h.grader.fail.lock().unwrap() = true;

    let err = h.controller.end_session_early().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Submission(SubmissionError::Collaborator(_))
    ));
    assert_eq!(
        h.controller.phase(),
        Phase::Failed(FailureKind::Submission)
    );
    let session = h.controller.session().unwrap();
    assert_eq!(session.answer(q2), Some("hello"));
    assert!(session.feedback(q2).is_some());

    // Still editable, and a retry can succeed.
    h.controller.record_answer(QuestionId::new(3), "more").unwrap();
    *h.grader.fail.lock().unwrap() = false;
    let report = h
        .controller
        .end_session_early()
        .await
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(report.correct(), 2);
    assert_eq!(h.grader.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_as_a_load_failure() {
    let mut h = harness_with(FixtureStore {
        delay: Some(Duration::from_secs(60)),
        ..FixtureStore::default()
    })
    .await;
    h.controller = h.controller.with_call_timeout(Duration::from_secs(5));

    let err = h.controller.load(Subject::all()).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Load(services::LoadError::Fetch(CollaboratorError::Timeout(_)))
    ));
    assert_eq!(h.controller.phase(), Phase::Failed(FailureKind::Load));
}

#[tokio::test]
async fn leaving_mid_quiz_resets_to_idle() {
    let mut h = loaded().await;
    h.controller.record_answer(QuestionId::new(1), "A").unwrap();
    h.controller.leave();

    assert_eq!(h.controller.phase(), Phase::Idle);
    assert!(h.controller.session().is_none());
    assert!(h.controller.end_session_early().await.is_err());
    assert_eq!(h.grader.calls(), 0);
}
