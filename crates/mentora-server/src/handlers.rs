use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use mentora_core::ids::{SessionId, UserId};
use mentora_core::identity::IdentityError;
use mentora_core::provider::TranscriptLine;
use mentora_core::voice::Voice;
use mentora_engine::{grade_session, ingest, DecodedDocument, UploadSummary};

use crate::auth::bearer_token;
use crate::error::ApiError;
use crate::server::AppState;

const HISTORY_LIMIT: u32 = 50;

/// The authenticated caller of an HTTP endpoint.
pub struct Caller(pub UserId);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(IdentityError::Missing)?;
        Ok(Self(state.verifier.verify(token)?))
    }
}

pub async fn upload(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(doc): Json<DecodedDocument>,
) -> Result<Json<UploadSummary>, ApiError> {
    Ok(Json(ingest(&state.repo, &user, &doc)?))
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub full_transcript: Vec<TranscriptLine>,
}

#[derive(Debug, Serialize)]
pub struct RubricScores {
    pub relevance: u32,
    pub clarity: u32,
    pub mastery: u32,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub status: &'static str,
    pub final_score: f64,
    pub feedback: String,
    pub breakdown: RubricScores,
    /// Reports are not rendered, so there is never a link.
    pub download_url: Option<String>,
}

pub async fn score(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let outcome = grade_session(
        &state.repo,
        state.scorer.as_ref(),
        &user,
        &req.session_id,
        &req.full_transcript,
    )
    .await?;

    let b = outcome.breakdown;
    Ok(Json(ScoreResponse {
        status: "success",
        final_score: outcome.final_score,
        feedback: b.feedback,
        breakdown: RubricScores {
            relevance: b.relevance,
            clarity: b.clarity,
            mastery: b.mastery,
        },
        download_url: None,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub session_id: SessionId,
    pub title: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub final_score: Option<f64>,
    pub feedback: Option<String>,
    pub download_url: Option<String>,
}

pub async fn history(State(state): State<AppState>, Caller(user): Caller) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let items = state
        .repo
        .list_completed(&user, HISTORY_LIMIT)?
        .into_iter()
        .map(|e| HistoryItem {
            session_id: e.id,
            title: e.title,
            filename: e.filename,
            created_at: e.created_at,
            final_score: e.final_score,
            feedback: e.feedback,
            download_url: None,
        })
        .collect();
    Ok(Json(items))
}

pub async fn speakers() -> Json<Value> {
    let labels: Vec<&str> = Voice::ALL.iter().map(Voice::label).collect();
    Json(json!({ "speakers": labels }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "live_sessions": state.live.count(),
    }))
}
