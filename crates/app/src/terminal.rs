//! Line-oriented quiz driver.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use quiz_core::model::{GradeReport, Question, QuestionType, Subject};
use services::{
    Completion, CredentialPrompt, Direction, NoticeLevel, Phase, SessionController, SessionError,
};

/// Shared stdin reader. One buffer for the whole process so prompts and the
/// quiz loop never steal each other's input.
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }))
    }

    /// Print `label` and read one line. `None` on end of input.
    pub async fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        self.lines.next_line().await
    }

    /// Read an API key; blank input means "skip".
    pub async fn read_secret(&mut self) -> io::Result<Option<String>> {
        let line = self
            .ask("AI grading API key (leave blank to skip): ")
            .await?;
        Ok(line.filter(|key| !key.trim().is_empty()))
    }
}

/// Asks for the AI-grading key on the terminal.
pub struct TerminalPrompt {
    console: Arc<Mutex<Console>>,
}

impl TerminalPrompt {
    pub fn new(console: Arc<Mutex<Console>>) -> Self {
        Self { console }
    }
}

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn request_api_key(&self) -> Option<String> {
        println!("AI grading is not configured. Free-form answers are graded by keywords only.");
        match self.console.lock().await.read_secret().await {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(error = %err, "could not read API key");
                None
            }
        }
    }
}

// ─── Quiz loop ─────────────────────────────────────────────────────────────────

const HELP: &str = "\
commands:
  a <text>   answer the current question (a number picks a listed option)
  n / p      next / previous question
  c          check the current answer
  s          submit (every question must have an answer)
  e          end now; unanswered questions are submitted blank
  q          quit without submitting
  h          show this help";

/// Run one quiz to completion or until the user quits.
///
/// # Errors
///
/// Returns an error only when stdin or stdout fails; quiz failures are shown
/// inline and the loop continues.
pub async fn take_quiz(
    mut controller: SessionController,
    subject: Subject,
    console: Arc<Mutex<Console>>,
) -> io::Result<()> {
    if let Err(err) = controller.load(subject).await {
        report_error(&controller, &err);
        return Ok(());
    }
    if controller.phase() != Phase::Ready {
        show_notice(&controller);
        return Ok(());
    }
    if controller.session().is_some_and(|s| s.is_empty()) {
        println!("No questions found for this subject.");
        return Ok(());
    }

    println!("{HELP}");
    let mut console = console.lock().await;
    loop {
        render_current(&controller);
        let Some(line) = console.ask("> ").await? else {
            controller.leave();
            return Ok(());
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        let outcome = match command {
            "a" | "answer" => answer(&mut controller, rest.trim()),
            "n" | "next" => controller.navigate(Direction::Next).map(|_| ()),
            "p" | "prev" => controller.navigate(Direction::Previous).map(|_| ()),
            "c" | "check" => check(&mut controller).await,
            "s" | "submit" => controller.submit().await.map(|c| show_report(c.applied())),
            "e" | "end" => controller
                .end_session_early()
                .await
                .map(|c| show_report(c.applied())),
            "q" | "quit" => {
                controller.leave();
                return Ok(());
            }
            "h" | "help" | "" => {
                println!("{HELP}");
                Ok(())
            }
            other => {
                println!("unknown command: {other}");
                Ok(())
            }
        };

        if let Err(err) = outcome {
            report_error(&controller, &err);
        }
        if controller.phase() == Phase::Submitted {
            return Ok(());
        }
    }
}

fn answer(controller: &mut SessionController, text: &str) -> Result<(), SessionError> {
    let Some(question) = controller.current_question() else {
        return Ok(());
    };
    let id = question.id();
    let text = resolve_option(question, text);
    controller.record_answer(id, text)
}

/// Map `"2"` to the second option of a multiple-choice question.
fn resolve_option(question: &Question, text: &str) -> String {
    if question.question_type() == QuestionType::MultipleChoice {
        if let Some(option) = text
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| question.options().get(idx))
        {
            return option.clone();
        }
    }
    text.to_string()
}

async fn check(controller: &mut SessionController) -> Result<(), SessionError> {
    match controller.check_answer().await? {
        Completion::Applied(feedback) => {
            let verdict = if feedback.is_correct { "Correct" } else { "Incorrect" };
            println!("{verdict}. Model answer: {}", feedback.model_answer);
            if let Some(explanation) = feedback.explanation {
                println!("  {explanation}");
            }
        }
        Completion::Discarded(reason) => {
            tracing::debug!(?reason, "check result discarded");
        }
    }
    Ok(())
}

fn render_current(controller: &SessionController) {
    let (Some(session), Some(progress)) = (controller.session(), controller.progress()) else {
        return;
    };
    let Some(question) = session.current() else {
        return;
    };

    println!();
    println!(
        "Question {}/{}  [{}]  answered {}/{}",
        progress.position,
        progress.total,
        question.subject(),
        progress.answered,
        progress.total
    );
    println!("{}", question.question_text());
    for (idx, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", idx + 1);
    }
    if let Some(answer) = session.answer(question.id()) {
        println!("Your answer: {answer:?}");
    }
    if let Some(feedback) = session.feedback(question.id()) {
        let verdict = if feedback.is_correct { "correct" } else { "incorrect" };
        println!("Checked: {verdict}");
    }
}

/// Print the controller's notice. Returns `false` when there is none.
fn show_notice(controller: &SessionController) -> bool {
    match controller.notice() {
        Some(notice) if notice.level == NoticeLevel::Error => println!("{notice}"),
        Some(notice) => println!("note: {notice}"),
        None => return false,
    }
    true
}

fn report_error(controller: &SessionController, err: &SessionError) {
    if !show_notice(controller) {
        println!("{err}");
    }
    tracing::debug!(error = %err, "quiz action failed");
}

fn show_report(report: Option<GradeReport>) {
    let Some(report) = report else {
        return;
    };

    println!();
    if report.ended_early() {
        println!("Quiz ended early.");
    }
    println!(
        "Score: {}/{} ({:.1}%), total credit {:.2}",
        report.correct(),
        report.total_questions(),
        report.percentage(),
        report.total_score()
    );
    for result in report.results() {
        let answer = match report.answer_for(result.question_id) {
            Some("") | None => "(No answer provided)",
            Some(text) => text,
        };
        let mark = if result.is_correct { "+" } else { "-" };
        println!(
            "{mark} #{}  your answer: {answer}  model answer: {}",
            result.question_id, result.model_answer
        );
        if let Some(explanation) = &result.explanation {
            println!("    {explanation}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    #[test]
    fn numbers_pick_listed_options() {
        let question = Question::new(
            QuestionId::new(1),
            "EDA",
            "Pick",
            QuestionType::MultipleChoice,
            vec!["mean".into(), "median".into()],
        )
        .unwrap();
        assert_eq!(resolve_option(&question, "2"), "median");
        assert_eq!(resolve_option(&question, "3"), "3");
        assert_eq!(resolve_option(&question, "mean"), "mean");
    }

    #[test]
    fn free_form_numbers_stay_literal() {
        let question =
            Question::new(QuestionId::new(2), "EDA", "Count", QuestionType::ShortAnswer, vec![])
                .unwrap();
        assert_eq!(resolve_option(&question, "2"), "2");
    }
}
