//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MaintixSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `MAINTIX_*` environment overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{LogFormat, MaintixSettings};

/// Resolve the settings file path.
///
/// `$MAINTIX_HOME/settings.json` when set, else `~/.maintix/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(dir) = std::env::var_os("MAINTIX_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir).join("settings.json");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".maintix").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MaintixSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or values that fail
/// [`MaintixSettings::validate`] are errors.
pub fn load_settings_from_path(path: &Path) -> Result<MaintixSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<MaintixSettings> {
    let defaults = serde_json::to_value(MaintixSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut MaintixSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are logged and ignored (file/default value wins).
/// `SERVER_HOST` / `SERVER_PORT` are honored as fallbacks for deployments
/// configured with the older variable names.
pub fn apply_overrides_from(
    settings: &mut MaintixSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("MAINTIX_HOST").or_else(|| env.string("SERVER_HOST")) {
        settings.server.host = v;
    }
    if let Some(v) = env
        .u16("MAINTIX_PORT", 1, 65535)
        .or_else(|| env.u16("SERVER_PORT", 1, 65535))
    {
        settings.server.port = v;
    }
    if let Some(v) = env.usize("MAINTIX_MAX_CONNECTIONS", 1, 1_000_000) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.usize("MAINTIX_MAX_MESSAGE_SIZE", 1024, 64 * 1024 * 1024) {
        settings.server.max_message_size = v;
    }
    if let Some(v) = env.string("MAINTIX_ALLOWED_ORIGINS") {
        settings.server.allowed_origins = parse_list(&v);
    }

    // ── Hub ─────────────────────────────────────────────────────────
    if let Some(v) = env.usize("MAINTIX_HUB_MAILBOX", 1, 1_000_000) {
        settings.hub.mailbox_capacity = v;
    }
    if let Some(v) = env.usize("MAINTIX_OUTBOUND_QUEUE", 1, 1_000_000) {
        settings.hub.outbound_queue_capacity = v;
    }

    // ── Heartbeat ───────────────────────────────────────────────────
    if let Some(v) = env.u64("MAINTIX_HEARTBEAT_INTERVAL_SECS", 1, 3600) {
        settings.heartbeat.interval_secs = v;
    }
    if let Some(v) = env.u64("MAINTIX_HEARTBEAT_TIMEOUT_SECS", 1, 7200) {
        settings.heartbeat.timeout_secs = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("MAINTIX_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("MAINTIX_LOG_FORMAT") {
        match LogFormat::parse(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "MAINTIX_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Split a comma-separated list, trimming whitespace and dropping empties.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = self.string(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;

    fn overrides(pairs: &[(&str, &str)]) -> MaintixSettings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut settings = MaintixSettings::default();
        apply_overrides_from(&mut settings, |name| vars.get(name).cloned());
        settings
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"hub": {"mailboxCapacity": 1024, "outboundQueueCapacity": 64}});
        let source = serde_json::json!({"hub": {"outboundQueueCapacity": 8}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["hub"]["outboundQueueCapacity"], 8);
        assert_eq!(merged["hub"]["mailboxCapacity"], 1024);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"allowedOrigins": ["a", "b"]});
        let source = serde_json::json!({"allowedOrigins": ["c"]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["allowedOrigins"], serde_json::json!(["c"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, MaintixSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9090}, "hub": {"outboundQueueCapacity": 16}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.hub.outbound_queue_capacity, 16);
        assert_eq!(settings.hub.mailbox_capacity, 1024);
    }

    #[test]
    fn invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_file_layer(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"hub": {"mailboxCapacity": 0}}"#).unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::InvalidValue(_)));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_server() {
        let s = overrides(&[
            ("MAINTIX_HOST", "127.0.0.1"),
            ("MAINTIX_PORT", "9000"),
            ("MAINTIX_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]);
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.server.port, 9000);
        assert_eq!(
            s.server.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn legacy_names_are_fallbacks() {
        let s = overrides(&[("SERVER_PORT", "7070"), ("SERVER_HOST", "10.0.0.1")]);
        assert_eq!(s.server.port, 7070);
        assert_eq!(s.server.host, "10.0.0.1");

        let s = overrides(&[("SERVER_PORT", "7070"), ("MAINTIX_PORT", "9000")]);
        assert_eq!(s.server.port, 9000);
    }

    #[test]
    fn env_overrides_hub_and_heartbeat() {
        let s = overrides(&[
            ("MAINTIX_HUB_MAILBOX", "32"),
            ("MAINTIX_OUTBOUND_QUEUE", "4"),
            ("MAINTIX_HEARTBEAT_INTERVAL_SECS", "5"),
            ("MAINTIX_HEARTBEAT_TIMEOUT_SECS", "15"),
        ]);
        assert_eq!(s.hub.mailbox_capacity, 32);
        assert_eq!(s.hub.outbound_queue_capacity, 4);
        assert_eq!(s.heartbeat.interval_secs, 5);
        assert_eq!(s.heartbeat.timeout_secs, 15);
    }

    #[test]
    fn invalid_env_values_ignored() {
        let s = overrides(&[
            ("MAINTIX_PORT", "0"),
            ("MAINTIX_OUTBOUND_QUEUE", "lots"),
            ("MAINTIX_LOG_FORMAT", "xml"),
        ]);
        let defaults = MaintixSettings::default();
        assert_eq!(s.server.port, defaults.server.port);
        assert_eq!(s.hub.outbound_queue_capacity, defaults.hub.outbound_queue_capacity);
        assert_eq!(s.logging.format, defaults.logging.format);
    }

    #[test]
    fn env_overrides_logging() {
        let s = overrides(&[
            ("MAINTIX_LOG_LEVEL", "maintix_server=debug"),
            ("MAINTIX_LOG_FORMAT", "json"),
        ]);
        assert_eq!(s.logging.level, "maintix_server=debug");
        assert_eq!(s.logging.format, LogFormat::Json);
    }

    #[test]
    fn empty_env_value_ignored() {
        let s = overrides(&[("MAINTIX_HOST", "")]);
        assert_eq!(s.server.host, "0.0.0.0");
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u64_range("30", 1, 3600), Some(30));
        assert_eq!(parse_usize_range("-1", 1, 10), None);
    }

    #[test]
    fn parse_list_trims() {
        assert_eq!(parse_list(" a ,b,, c"), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
    }
}
