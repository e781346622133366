use thiserror::Error;

use crate::model::{ApiSettingsError, GradeError, ParseIdError, QuestionError};
use crate::submission::SubmissionError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Grade(#[from] GradeError),
    #[error(transparent)]
    Settings(#[from] ApiSettingsError),
}
