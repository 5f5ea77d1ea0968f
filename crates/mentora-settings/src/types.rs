//! Settings tree. Every group deserializes with `default`, so a partial
//! settings file only needs the keys it changes.

use std::path::PathBuf;
use std::time::Duration;

use mentora_core::turns::EvictionPolicy;
use mentora_core::voice::Voice;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root of the configuration. Built once at startup and shared read-only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MentoraSettings {
    pub server: ServerSettings,
    pub session: SessionSettings,
    pub llm: LlmSettings,
    pub speech: SpeechSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl MentoraSettings {
    /// Reject combinations that would make a session unusable.
    pub fn validate(&self) -> Result<()> {
        if self.session.context_cap == 0 {
            return Err(SettingsError::InvalidValue("session.contextCap must be at least 1".into()));
        }
        if self.session.duration_secs <= self.session.warning_secs {
            return Err(SettingsError::InvalidValue(format!(
                "session.durationSecs ({}) must exceed session.warningSecs ({})",
                self.session.duration_secs, self.session.warning_secs
            )));
        }
        if self.session.reply_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue("session.replyTimeoutSecs must be positive".into()));
        }
        Ok(())
    }
}

/// HTTP/WebSocket listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Capacity of each session's outbound frame channel.
    pub max_send_queue: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_send_queue: 64,
        }
    }
}

/// Live exam session behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Total time budget of one exam.
    pub duration_secs: u64,
    /// Remaining time at or below which the session wraps up.
    pub warning_secs: u64,
    /// Maximum number of turns kept as conversational memory.
    pub context_cap: usize,
    pub eviction: EvictionPolicy,
    /// Upper bound on one reply-generation call.
    pub reply_timeout_secs: u64,
    pub default_voice: Voice,
}

impl SessionSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn warning(&self) -> Duration {
        Duration::from_secs(self.warning_secs)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            duration_secs: 30 * 60,
            warning_secs: 30,
            context_cap: 20,
            eviction: EvictionPolicy::default(),
            reply_timeout_secs: 60,
            default_voice: Voice::default(),
        }
    }
}

/// Language model used for examiner replies and scoring.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub reply_model: String,
    pub scoring_model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            reply_model: "gemini-2.0-flash".to_string(),
            scoring_model: "gemini-2.5-flash".to_string(),
            request_timeout_secs: 90,
        }
    }
}

/// Text-to-speech settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub language_code: String,
    pub sample_rate_hertz: u32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://texttospeech.googleapis.com/v1".to_string(),
            language_code: "id-ID".to_string(),
            sample_rate_hertz: 24_000,
        }
    }
}

/// Bearer token verification.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HS256 secret shared with the identity service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: mentora_dir().join("database").join("mentora.db"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level; `RUST_LOG` wins when set.
    pub level: String,
    /// Persist warn+ events to SQLite.
    pub log_to_sqlite: bool,
    pub log_db_path: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_sqlite: true,
            log_db_path: mentora_dir().join("database").join("logs.db"),
        }
    }
}

/// `~/.mentora`, or `/tmp/.mentora` when `HOME` is unset.
pub fn mentora_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".mentora")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_exam_rules() {
        let s = MentoraSettings::default();
        assert_eq!(s.session.duration(), Duration::from_secs(1800));
        assert_eq!(s.session.warning(), Duration::from_secs(30));
        assert_eq!(s.session.context_cap, 20);
        assert_eq!(s.session.eviction, EvictionPolicy::PreserveInitialContext);
        assert_eq!(s.session.default_voice, Voice::Achird);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn camel_case_keys() {
        let json = serde_json::to_value(MentoraSettings::default()).unwrap();
        assert!(json["session"]["durationSecs"].is_u64());
        assert_eq!(json["session"]["eviction"], "preserve_initial_context");
        assert_eq!(json["server"]["maxSendQueue"], 64);
        assert!(json["llm"].get("apiKey").is_none());
    }

    #[test]
    fn validate_rejects_zero_cap() {
        let mut s = MentoraSettings::default();
        s.session.context_cap = 0;
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn validate_rejects_warning_beyond_duration() {
        let mut s = MentoraSettings::default();
        s.session.duration_secs = 30;
        s.session.warning_secs = 30;
        assert!(s.validate().is_err());
    }

    #[test]
    fn partial_group_keeps_other_defaults() {
        let s: SessionSettings = serde_json::from_str(r#"{"contextCap": 8}"#).unwrap();
        assert_eq!(s.context_cap, 8);
        assert_eq!(s.duration_secs, 1800);
    }
}
