use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mentora_core::identity::{LookupError, OwnedSession, SessionDirectory};
use mentora_core::ids::{SessionId, UserId};
use mentora_core::provider::ScoreBreakdown;
use mentora_core::sections::ProposalContext;

use crate::database::Database;
use crate::error::StoreError;

const SELECT_ROW: &str = "SELECT id, user_id, title, filename, context, created_at, final_score, feedback, is_completed
                          FROM exam_sessions";

/// A stored exam session with its extracted proposal.
#[derive(Clone, Debug)]
pub struct ExamSessionRow {
    pub id: SessionId,
    pub user_id: UserId,
    pub title: String,
    pub filename: String,
    pub proposal: ProposalContext,
    pub created_at: DateTime<Utc>,
    pub final_score: Option<f64>,
    pub feedback: Option<String>,
    pub is_completed: bool,
}

impl ExamSessionRow {
    pub fn into_owned(self) -> OwnedSession {
        OwnedSession {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            started_at: self.created_at,
            proposal: Arc::new(self.proposal),
        }
    }
}

/// A graded session as listed in the caller's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: SessionId,
    pub title: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub final_score: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Clone)]
pub struct ExamSessionRepo {
    db: Database,
}

impl ExamSessionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a freshly uploaded proposal. The session's time budget starts now.
    #[instrument(skip(self, proposal), fields(user_id = %user_id))]
    pub fn create(
        &self,
        user_id: &UserId,
        filename: &str,
        proposal: &ProposalContext,
    ) -> Result<ExamSessionRow, StoreError> {
        self.create_at(user_id, filename, proposal, Utc::now())
    }

    fn create_at(
        &self,
        user_id: &UserId,
        filename: &str,
        proposal: &ProposalContext,
        created_at: DateTime<Utc>,
    ) -> Result<ExamSessionRow, StoreError> {
        let id = SessionId::new();
        let context = serde_json::to_string(proposal)?;
        // Whole seconds, so a reloaded row compares equal to the one returned here.
        let created_at = DateTime::from_timestamp(created_at.timestamp(), 0).unwrap_or(created_at);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO exam_sessions (id, user_id, title, filename, context, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.as_str(),
                    user_id.as_str(),
                    proposal.sections.title,
                    filename,
                    context,
                    format_time(&created_at),
                ],
            )?;
            Ok(())
        })?;

        Ok(ExamSessionRow {
            id,
            user_id: user_id.clone(),
            title: proposal.sections.title.clone(),
            filename: filename.to_string(),
            proposal: proposal.clone(),
            created_at,
            final_score: None,
            feedback: None,
            is_completed: false,
        })
    }

    /// Load a session only if `owner` owns it. Another user's session is
    /// indistinguishable from a missing one.
    #[instrument(skip(self), fields(session_id = %id, user_id = %owner))]
    pub fn get_owned(&self, id: &SessionId, owner: &UserId) -> Result<ExamSessionRow, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!("{SELECT_ROW} WHERE id = ?1 AND user_id = ?2");
            conn.query_row(&sql, [id.as_str(), owner.as_str()], read_row)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?
        })
    }

    /// Completed sessions of `owner`, newest first.
    #[instrument(skip(self), fields(user_id = %owner))]
    pub fn list_completed(&self, owner: &UserId, limit: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, filename, created_at, final_score, feedback
                 FROM exam_sessions
                 WHERE user_id = ?1 AND is_completed = 1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(rusqlite::params![owner.as_str(), limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?;

            let mut entries = Vec::new();
            for row in rows {
                let (id, title, filename, created_at, final_score, feedback) = row?;
                entries.push(HistoryEntry {
                    id: SessionId::from_raw(id),
                    title,
                    filename,
                    created_at: parse_time(&created_at)?,
                    final_score,
                    feedback,
                });
            }
            Ok(entries)
        })
    }

    /// Persist the grading of a session and mark it completed. Returns the
    /// final score. Scoring again overwrites the previous result.
    #[instrument(skip(self, score), fields(session_id = %id, user_id = %owner))]
    pub fn record_score(
        &self,
        id: &SessionId,
        owner: &UserId,
        score: &ScoreBreakdown,
    ) -> Result<f64, StoreError> {
        let final_score = score.final_score();
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE exam_sessions
                 SET final_score = ?1, feedback = ?2, is_completed = 1
                 WHERE id = ?3 AND user_id = ?4",
                rusqlite::params![final_score, score.feedback, id.as_str(), owner.as_str()],
            )?)
        })?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("session {id}")));
        }
        Ok(final_score)
    }
}

impl SessionDirectory for ExamSessionRepo {
    fn open_owned(&self, session_id: &SessionId, owner: &UserId) -> Result<OwnedSession, LookupError> {
        match self.get_owned(session_id, owner) {
            Ok(row) => Ok(row.into_owned()),
            Err(StoreError::NotFound(_)) => Err(LookupError::NotFound),
            Err(e) => Err(LookupError::Backend(e.to_string())),
        }
    }
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("bad timestamp {s:?}: {e}")))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<ExamSessionRow, StoreError>> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let title: String = row.get(2)?;
    let filename: String = row.get(3)?;
    let context: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let final_score: Option<f64> = row.get(6)?;
    let feedback: Option<String> = row.get(7)?;
    let is_completed: bool = row.get(8)?;

    Ok(decode_row(RawRow {
        id,
        user_id,
        title,
        filename,
        context,
        created_at,
        final_score,
        feedback,
        is_completed,
    }))
}

struct RawRow {
    id: String,
    user_id: String,
    title: String,
    filename: String,
    context: String,
    created_at: String,
    final_score: Option<f64>,
    feedback: Option<String>,
    is_completed: bool,
}

fn decode_row(raw: RawRow) -> Result<ExamSessionRow, StoreError> {
    Ok(ExamSessionRow {
        id: SessionId::from_raw(raw.id),
        user_id: UserId::from_raw(raw.user_id),
        title: raw.title,
        filename: raw.filename,
        proposal: serde_json::from_str(&raw.context)?,
        created_at: parse_time(&raw.created_at)?,
        final_score: raw.final_score,
        feedback: raw.feedback,
        is_completed: raw.is_completed,
    })
}
