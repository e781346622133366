mod answers;
mod api_settings;
mod feedback;
mod grading;
mod ids;
mod question;

pub use ids::{DatasetId, ParseIdError, QuestionId, SessionId, Subject};

pub use answers::AnswerSheet;
pub use api_settings::{ApiSettings, ApiSettingsDraft, ApiSettingsError, DEFAULT_CALL_TIMEOUT};
pub use feedback::{Feedback, FeedbackCache};
pub use grading::{GradeError, GradeReport, GradeResult, ReportContext, SubmissionEntry};
pub use question::{Question, QuestionError, QuestionType};
