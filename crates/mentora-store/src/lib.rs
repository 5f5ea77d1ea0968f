//! SQLite persistence for uploaded proposals, their exam sessions, and the
//! scores recorded when a session is graded.

pub mod database;
pub mod error;
pub mod schema;
pub mod sessions;

pub use database::Database;
pub use error::StoreError;
pub use sessions::{ExamSessionRepo, ExamSessionRow, HistoryEntry};
