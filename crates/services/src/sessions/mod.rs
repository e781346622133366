mod controller;
mod progress;
mod session;
mod shuffle;
mod state;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::SessionController;
pub use progress::SessionProgress;
pub use session::{Direction, QuizSession};
pub use shuffle::QuestionSetShuffler;
pub use state::{
    CheckTicket, Completion, DiscardReason, FailureKind, LoadTicket, Notice, NoticeLevel, Phase,
    SubmitTicket,
};
