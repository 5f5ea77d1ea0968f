use tracing::{info, warn};

use mentora_core::identity::{IdentityError, IdentityVerifier, LookupError, OwnedSession, SessionDirectory};
use mentora_core::ids::SessionId;

use crate::error::AdmissionError;

/// Check the caller's credential, then that they own the session. Both must
/// pass before a session is greeted.
pub fn admit(
    verifier: &dyn IdentityVerifier,
    directory: &dyn SessionDirectory,
    credential: Option<&str>,
    session_id: &SessionId,
) -> Result<OwnedSession, AdmissionError> {
    let credential = credential
        .filter(|c| !c.trim().is_empty())
        .ok_or(IdentityError::Missing)?;
    let user_id = verifier.verify(credential)?;

    match directory.open_owned(session_id, &user_id) {
        Ok(session) => {
            info!(session_id = %session_id, user_id = %user_id, "session admitted");
            Ok(session)
        }
        Err(LookupError::NotFound) => Err(AdmissionError::NotOwned),
        Err(LookupError::Backend(e)) => {
            warn!(session_id = %session_id, error = %e, "session lookup failed");
            Err(AdmissionError::Lookup(e))
        }
    }
}
