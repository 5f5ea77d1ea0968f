use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::span;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const LOG_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    level TEXT NOT NULL,
    target TEXT NOT NULL,
    message TEXT NOT NULL,
    fields TEXT,
    session_id TEXT,
    user_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level);
CREATE INDEX IF NOT EXISTS idx_logs_session ON logs(session_id);
CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);
";

/// A persisted log line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    /// Remaining event fields as a JSON object.
    pub fields: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// Filters for [`SqliteLogSink::query`]. Unset filters match everything.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    pub level: Option<String>,
    /// Substring match on the event target.
    pub target: Option<String>,
    pub session_id: Option<String>,
    /// RFC 3339 lower bound on the timestamp.
    pub since: Option<String>,
    /// Defaults to 100.
    pub limit: Option<u32>,
}

pub struct SqliteLogSink {
    conn: Mutex<Connection>,
}

impl SqliteLogSink {
    pub fn open(db_path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(LOG_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn insert(&self, entry: &LogEntry) {
        let conn = self.conn.lock();
        // A failed log write has nowhere to be reported.
        let _ = conn.execute(
            "INSERT INTO logs (timestamp, level, target, message, fields, session_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                entry.timestamp,
                entry.level,
                entry.target,
                entry.message,
                entry.fields,
                entry.session_id,
                entry.user_id,
            ],
        );
    }

    /// Newest first.
    pub fn query(&self, q: &LogQuery) -> Result<Vec<LogRecord>, rusqlite::Error> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        let mut push = |clause: &str, value: String| {
            params.push(Box::new(value));
            clauses.push(format!("{clause} ?{}", params.len()));
        };

        if let Some(level) = &q.level {
            push("level =", level.to_uppercase());
        }
        if let Some(target) = &q.target {
            push("target LIKE", format!("%{target}%"));
        }
        if let Some(session_id) = &q.session_id {
            push("session_id =", session_id.clone());
        }
        if let Some(since) = &q.since {
            push("timestamp >=", since.clone());
        }

        let mut sql = String::from(
            "SELECT id, timestamp, level, target, message, fields, session_id, user_id FROM logs",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY id DESC LIMIT {}", q.limit.unwrap_or(100)));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(refs.as_slice(), |row| {
            Ok(LogRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                level: row.get(2)?,
                target: row.get(3)?,
                message: row.get(4)?,
                fields: row.get(5)?,
                session_id: row.get(6)?,
                user_id: row.get(7)?,
            })
        })?;
        rows.collect()
    }

    pub fn count(&self) -> Result<i64, rusqlite::Error> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
    }
}

struct LogEntry {
    timestamp: String,
    level: String,
    target: String,
    message: String,
    fields: Option<String>,
    session_id: Option<String>,
    user_id: Option<String>,
}

/// Writes warn+ events to a [`SqliteLogSink`]. `session_id` and `user_id`
/// are taken from the event itself or the nearest enclosing span that
/// carries them.
pub struct SqliteLogLayer {
    sink: Arc<SqliteLogSink>,
}

impl SqliteLogLayer {
    pub fn new(sink: Arc<SqliteLogSink>) -> Self {
        Self { sink }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
    session_id: Option<String>,
    user_id: Option<String>,
}

impl FieldVisitor {
    fn put_string(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = Some(value),
            "session_id" => self.session_id = Some(value),
            "user_id" => self.user_id = Some(value),
            other => {
                let _ = self.fields.insert(other.to_string(), value.into());
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        self.put_string(field.name(), rendered.trim_matches('"').to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put_string(field.name(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        let _ = self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let _ = self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            let _ = self.fields.insert(field.name().to_string(), n.into());
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        let _ = self.fields.insert(field.name().to_string(), value.into());
    }
}

/// Correlation ids captured from a span's attributes.
struct SpanIds {
    session_id: Option<String>,
    user_id: Option<String>,
}

impl<S> Layer<S> for SqliteLogLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        if visitor.session_id.is_none() && visitor.user_id.is_none() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanIds {
                session_id: visitor.session_id,
                user_id: visitor.user_id,
            });
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > tracing::Level::WARN {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if visitor.session_id.is_some() && visitor.user_id.is_some() {
                    break;
                }
                let extensions = span.extensions();
                if let Some(ids) = extensions.get::<SpanIds>() {
                    if visitor.session_id.is_none() {
                        visitor.session_id.clone_from(&ids.session_id);
                    }
                    if visitor.user_id.is_none() {
                        visitor.user_id.clone_from(&ids.user_id);
                    }
                }
            }
        }

        let fields = (!visitor.fields.is_empty())
            .then(|| serde_json::to_string(&visitor.fields).unwrap_or_default());

        self.sink.insert(&LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string().to_uppercase(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields,
            session_id: visitor.session_id,
            user_id: visitor.user_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn entry(timestamp: &str, level: &str, target: &str, message: &str, session: Option<&str>) -> LogEntry {
        LogEntry {
            timestamp: timestamp.into(),
            level: level.into(),
            target: target.into(),
            message: message.into(),
            fields: None,
            session_id: session.map(String::from),
            user_id: None,
        }
    }

    fn capture(f: impl FnOnce()) -> Arc<SqliteLogSink> {
        let sink = Arc::new(SqliteLogSink::in_memory().unwrap());
        let subscriber = tracing_subscriber::registry().with(SqliteLogLayer::new(sink.clone()));
        tracing::subscriber::with_default(subscriber, f);
        sink
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!("mentora-logs-{}", uuid::Uuid::now_v7()));
        let path = dir.join("nested").join("logs.db");
        let sink = SqliteLogSink::open(&path).unwrap();
        assert_eq!(sink.count().unwrap(), 0);
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn query_filters_combine() {
        let sink = SqliteLogSink::in_memory().unwrap();
        sink.insert(&entry("2026-10-01T10:00:00Z", "WARN", "mentora_llm::gemini", "slow", Some("sess_a")));
        sink.insert(&entry("2026-10-01T11:00:00Z", "ERROR", "mentora_llm::tts", "tts down", Some("sess_a")));
        sink.insert(&entry("2026-10-01T12:00:00Z", "ERROR", "mentora_store", "locked", Some("sess_b")));

        let by_session = sink
            .query(&LogQuery {
                session_id: Some("sess_a".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_session.len(), 2);
        assert_eq!(by_session[0].message, "tts down");

        let errors_in_llm = sink
            .query(&LogQuery {
                level: Some("error".into()),
                target: Some("mentora_llm".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(errors_in_llm.len(), 1);
        assert_eq!(errors_in_llm[0].target, "mentora_llm::tts");

        let recent = sink
            .query(&LogQuery {
                since: Some("2026-10-01T10:30:00Z".into()),
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "locked");
    }

    #[test]
    fn layer_keeps_only_warn_and_above() {
        let sink = capture(|| {
            tracing::info!("connected");
            tracing::debug!("noise");
            tracing::warn!(attempt = 2u64, "reply timed out");
            tracing::error!("store failure");
        });
        assert_eq!(sink.count().unwrap(), 2);

        let warn = sink
            .query(&LogQuery {
                level: Some("WARN".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(warn[0].message, "reply timed out");
        assert_eq!(warn[0].fields.as_deref(), Some(r#"{"attempt":2}"#));
    }

    #[test]
    fn layer_inherits_ids_from_enclosing_span() {
        let sink = capture(|| {
            let outer = tracing::info_span!("ws", user_id = "user_1");
            let _outer = outer.enter();
            let inner = tracing::info_span!("exam", session_id = %"sess_9");
            let _inner = inner.enter();
            tracing::warn!("speech synthesis failed");
        });

        let records = sink.query(&LogQuery::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id.as_deref(), Some("sess_9"));
        assert_eq!(records[0].user_id.as_deref(), Some("user_1"));
    }

    #[test]
    fn event_field_wins_over_span() {
        let sink = capture(|| {
            let span = tracing::info_span!("exam", session_id = "sess_span");
            let _g = span.enter();
            tracing::error!(session_id = "sess_event", "explicit");
        });
        let records = sink.query(&LogQuery::default()).unwrap();
        assert_eq!(records[0].session_id.as_deref(), Some("sess_event"));
    }
}
