//! Boundary contracts for identity and session ownership. Both are checked
//! before a live session is admitted.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ids::{SessionId, UserId};
use crate::sections::ProposalContext;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("credential missing")]
    Missing,
    #[error("credential expired")]
    Expired,
    #[error("credential invalid: {0}")]
    Invalid(String),
}

/// Resolves a bearer credential to the user it was issued for.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<UserId, IdentityError>;
}

/// A stored exam session, loaded on behalf of its owner.
#[derive(Clone, Debug)]
pub struct OwnedSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub title: String,
    /// Start of the session's time budget.
    pub started_at: DateTime<Utc>,
    pub proposal: Arc<ProposalContext>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No such session, or it belongs to another user.
    #[error("session not found or not owned")]
    NotFound,
    #[error("session lookup failed: {0}")]
    Backend(String),
}

/// Looks up sessions by id, scoped to their owner.
pub trait SessionDirectory: Send + Sync {
    fn open_owned(&self, session_id: &SessionId, owner: &UserId) -> Result<OwnedSession, LookupError>;
}
