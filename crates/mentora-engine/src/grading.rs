use serde::Serialize;
use tracing::{info, instrument, warn};

use mentora_core::ids::{SessionId, UserId};
use mentora_core::provider::{render_transcript, ScoreBreakdown, Scorer, TranscriptLine};
use mentora_store::{ExamSessionRepo, StoreError};

use crate::error::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub final_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Grade a finished session from its transcript and persist the result.
/// The caller must own the session; the scorer is not consulted otherwise.
#[instrument(skip_all, fields(session_id = %session_id, user_id = %owner, lines = transcript.len()))]
pub async fn grade_session(
    repo: &ExamSessionRepo,
    scorer: &dyn Scorer,
    owner: &UserId,
    session_id: &SessionId,
    transcript: &[TranscriptLine],
) -> Result<ScoreOutcome, EngineError> {
    repo.get_owned(session_id, owner).map_err(|e| match e {
        StoreError::NotFound(what) => EngineError::SessionNotFound(what),
        other => EngineError::Store(other),
    })?;

    let breakdown = scorer
        .score(&render_transcript(transcript))
        .await
        .inspect_err(|e| warn!(error_kind = e.error_kind(), error = %e, "scoring failed"))?
        .clamped();
    let final_score = repo.record_score(session_id, owner, &breakdown)?;

    info!(final_score, "session graded");
    Ok(ScoreOutcome {
        final_score,
        breakdown,
    })
}
