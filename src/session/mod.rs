//! Practice session
//!
//! Drives one learner through the queue: present, answer, reveal, submit,
//! advance. Notices surface background failures without blocking progress.

pub mod controller;
pub mod notice;
pub mod state;

use thiserror::Error;

pub use controller::{SessionController, SessionEvent, SessionSnapshot};
pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use state::{ActiveQuestion, Feedback, QuestionPhase, SubmissionStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No question is being shown")]
    NoActiveQuestion,

    #[error("Cannot {action} a question that is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
