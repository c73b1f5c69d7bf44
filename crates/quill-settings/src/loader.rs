//! Layered settings loading.
//!
//! Three layers, lowest priority first: compiled defaults, the user file
//! (`~/.quill/settings.json`, deep-merged), and `QUILL_*` environment
//! variables. A missing user file is not an error; a malformed one is.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{ConfirmationPolicy, Settings};

/// Location of the user settings file.
#[must_use]
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    Path::new(&home).join(".quill").join("settings.json")
}

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge key-wise; any other value in the overlay replaces the base
/// value outright.
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides.
pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file path with env overrides.
///
/// A missing file yields defaults plus env overrides.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = match std::fs::read_to_string(path) {
        Ok(raw) => {
            let user: Value = serde_json::from_str(&raw)?;
            deep_merge(defaults, user)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "no settings file, using defaults");
            defaults
        }
        Err(e) => return Err(e.into()),
    };

    let mut settings: Settings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Apply `QUILL_*` environment overrides (highest priority).
fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(model) = std::env::var("QUILL_MODEL") {
        settings.model = model;
    }
    if let Ok(url) = std::env::var("QUILL_BASE_URL") {
        settings.base_url = Some(url);
    }
    if let Ok(name) = std::env::var("QUILL_API_KEY_ENV") {
        settings.api_key_env = name;
    }
    if let Ok(lang) = std::env::var("QUILL_REPLY_LANGUAGE") {
        settings.reply_language = lang;
    }
    if let Ok(ms) = std::env::var("QUILL_THROTTLE_MS") {
        if let Ok(parsed) = ms.parse() {
            settings.engine.throttle_ms = parsed;
        }
    }
    if let Ok(flag) = std::env::var("QUILL_AWAIT_SHELL") {
        settings.engine.await_shell = matches!(flag.as_str(), "1" | "true");
    }
    if let Ok(policy) = std::env::var("QUILL_CONFIRMATION") {
        match policy.as_str() {
            "always_ask" => settings.engine.confirmation = ConfirmationPolicy::AlwaysAsk,
            "auto_approve" => settings.engine.confirmation = ConfirmationPolicy::AutoApprove,
            other => debug!(value = other, "ignoring unknown QUILL_CONFIRMATION"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
