use mentora_core::errors::CollaboratorError;
use mentora_core::identity::IdentityError;
use mentora_core::protocol::{close_code, CloseReason};
use mentora_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("{0}")]
    Internal(String),
}

/// Rejection of an uploaded document.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("no abstract or methodology could be extracted")]
    NothingExtracted,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a live session was refused before the greeting.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("identity rejected: {0}")]
    Identity(#[from] IdentityError),

    #[error("session not found or not owned")]
    NotOwned,

    #[error("session lookup failed: {0}")]
    Lookup(String),
}

impl AdmissionError {
    pub fn close_code(&self) -> u16 {
        match self {
            Self::Identity(_) => close_code::INVALID_CREDENTIAL,
            Self::NotOwned => close_code::SESSION_NOT_OWNED,
            Self::Lookup(_) => close_code::INTERNAL_ERROR,
        }
    }

    /// Close frame sent to the client. The reason never carries backend detail.
    pub fn close_reason(&self) -> CloseReason {
        let reason = match self {
            Self::Identity(IdentityError::Expired) => "Token expired",
            Self::Identity(_) => "Invalid token",
            Self::NotOwned => "Session not found or access denied",
            Self::Lookup(_) => "Internal error",
        };
        CloseReason::new(self.close_code(), reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_close_codes() {
        assert_eq!(AdmissionError::Identity(IdentityError::Missing).close_code(), 4001);
        assert_eq!(AdmissionError::Identity(IdentityError::Expired).close_code(), 4001);
        assert_eq!(AdmissionError::NotOwned.close_code(), 1008);
        assert_eq!(AdmissionError::Lookup("db down".into()).close_code(), 1011);
    }

    #[test]
    fn close_reason_hides_backend_detail() {
        let reason = AdmissionError::Lookup("disk I/O error at /var/db".into()).close_reason();
        assert_eq!(reason.code, 1011);
        assert!(!reason.reason.contains("disk"));
        assert_eq!(
            AdmissionError::Identity(IdentityError::Expired).close_reason().reason,
            "Token expired"
        );
    }

    #[test]
    fn engine_error_from_collaborator() {
        let err: EngineError = CollaboratorError::RateLimited.into();
        assert!(err.to_string().contains("rate limited"));
    }
}
