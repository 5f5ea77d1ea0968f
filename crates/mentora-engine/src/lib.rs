//! Exam logic: section extraction at upload, the live session orchestrator
//! with its bounded context window and time budget, and post-session
//! grading.

pub mod admission;
pub mod clock;
pub mod demo;
pub mod error;
pub mod extract;
pub mod grading;
pub mod session;
pub mod upload;
pub mod window;

pub use admission::admit;
pub use clock::{Clock, ManualClock, SessionClock, SystemClock, TimeBudget};
pub use error::{AdmissionError, EngineError, UploadError};
pub use extract::{extract_section, extract_sections, extract_title};
pub use grading::{grade_session, ScoreOutcome};
pub use session::{Collaborators, EndReason, ExamMode, ExamSession, SessionConfig, SessionState};
pub use upload::{ingest, prepare_proposal, DecodedDocument, DecodedPage, PageImage, UploadSummary};
pub use window::ContextWindow;
