//! Settings loading with deep merge and environment overrides.
//!
//! Deep merge: objects merge per key, arrays and primitives are replaced,
//! nulls in the user file are skipped.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{mentora_dir, MentoraSettings};

/// `~/.mentora/settings.json`.
pub fn settings_path() -> PathBuf {
    mentora_dir().join("settings.json")
}

/// Load from the default path, apply process env overrides, validate.
pub fn load_settings() -> Result<MentoraSettings> {
    load_settings_from_path(&settings_path())
}

/// Load from `path` (defaults when it does not exist), apply process env
/// overrides, validate.
pub fn load_settings_from_path(path: &Path) -> Result<MentoraSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

fn load_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<MentoraSettings> {
    let defaults = serde_json::to_value(MentoraSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MentoraSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides read through `env`. Unparseable values are
/// logged and ignored.
pub fn apply_overrides(settings: &mut MentoraSettings, env: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup: env };

    if let Some(v) = env.string("MENTORA_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u64("MENTORA_PORT", 0, u64::from(u16::MAX)) {
        settings.server.port = v as u16;
    }
    if let Some(v) = env.string("MENTORA_DATABASE") {
        settings.storage.database_path = PathBuf::from(v);
    }

    if let Some(v) = env.u64("MENTORA_SESSION_MINUTES", 1, 24 * 60) {
        settings.session.duration_secs = v * 60;
    }
    if let Some(v) = env.u64("MENTORA_WARNING_SECONDS", 0, 3600) {
        settings.session.warning_secs = v;
    }
    if let Some(v) = env.u64("MENTORA_CONTEXT_CAP", 1, 1000) {
        settings.session.context_cap = v as usize;
    }
    if let Some(v) = env.u64("MENTORA_REPLY_TIMEOUT_SECS", 1, 600) {
        settings.session.reply_timeout_secs = v;
    }

    if let Some(v) = env.string("GEMINI_API_KEY") {
        settings.llm.api_key = Some(v);
    }
    if let Some(v) = env.string("GOOGLE_TTS_API_KEY") {
        settings.speech.api_key = Some(v);
    }
    if let Some(v) = env.string("MENTORA_JWT_SECRET") {
        settings.auth.jwt_secret = Some(v);
    }

    if let Some(v) = env.string("MENTORA_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("MENTORA_LOG_TO_SQLITE") {
        settings.logging.log_to_sqlite = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Accepts (case-insensitive) `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, min, max, "invalid integer env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::errors::SettingsError;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mentora-settings-{}-{name}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn deep_merge_nested_objects() {
        let target = json!({"a": {"b": 1, "c": 2}, "d": [1, 2]});
        let source = json!({"a": {"c": 3}, "d": [9], "e": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged, json!({"a": {"b": 1, "c": 3}, "d": [9]}));
    }

    #[test]
    fn deep_merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let s = load_with_env(&temp_path("missing.json"), env_of(&[])).unwrap();
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.session.context_cap, 20);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let path = temp_path("settings.json");
        std::fs::write(
            &path,
            r#"{"session": {"contextCap": 10, "eviction": "strict_cap"}, "server": {"port": 9100}}"#,
        )
        .unwrap();
        let s = load_with_env(&path, env_of(&[])).unwrap();
        assert_eq!(s.session.context_cap, 10);
        assert_eq!(s.session.eviction, mentora_core::turns::EvictionPolicy::StrictCap);
        assert_eq!(s.session.warning_secs, 30);
        assert_eq!(s.server.port, 9100);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let path = temp_path("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_with_env(&path, env_of(&[])).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn env_overrides_file() {
        let path = temp_path("env.json");
        std::fs::write(&path, r#"{"server": {"port": 9100}}"#).unwrap();
        let env = env_of(&[
            ("MENTORA_PORT", "9200"),
            ("MENTORA_SESSION_MINUTES", "10"),
            ("GEMINI_API_KEY", "gk"),
            ("MENTORA_JWT_SECRET", "secret"),
            ("MENTORA_LOG_TO_SQLITE", "off"),
        ]);
        let s = load_with_env(&path, env).unwrap();
        assert_eq!(s.server.port, 9200);
        assert_eq!(s.session.duration_secs, 600);
        assert_eq!(s.llm.api_key.as_deref(), Some("gk"));
        assert_eq!(s.auth.jwt_secret.as_deref(), Some("secret"));
        assert!(!s.logging.log_to_sqlite);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut s = MentoraSettings::default();
        apply_overrides(
            &mut s,
            env_of(&[
                ("MENTORA_PORT", "not-a-port"),
                ("MENTORA_CONTEXT_CAP", "0"),
                ("MENTORA_LOG_TO_SQLITE", "maybe"),
                ("GEMINI_API_KEY", ""),
            ]),
        );
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.session.context_cap, 20);
        assert!(s.logging.log_to_sqlite);
        assert!(s.llm.api_key.is_none());
    }

    #[test]
    fn validation_runs_after_merge() {
        let path = temp_path("invalid.json");
        std::fs::write(&path, r#"{"session": {"durationSecs": 20, "warningSecs": 30}}"#).unwrap();
        let err = load_with_env(&path, env_of(&[])).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("2"), None);
        assert_eq!(parse_u64_range("15", 1, 20), Some(15));
        assert_eq!(parse_u64_range("25", 1, 20), None);
        assert_eq!(parse_u64_range("-1", 0, 20), None);
    }
}
