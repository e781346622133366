#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod submission;
pub mod time;

pub use error::Error;
pub use submission::{SubmissionPolicy, build_payload};
pub use time::Clock;
