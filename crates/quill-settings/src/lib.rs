//! # quill-settings
//!
//! Configuration management with layered sources for the Quill agent.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`Settings::default()`]
//! 2. **User file** — `~/.quill/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `QUILL_*` overrides (highest priority)
//!
//! The process-wide snapshot is reloadable: [`reload_settings_from_path`]
//! swaps the cached value so subsequent [`get_settings`] calls return fresh
//! data.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

/// Process-wide settings snapshot.
///
/// `RwLock<Option<Arc<Settings>>>` instead of `OnceLock` so the cached value
/// can be swapped on reload. Reads are cheap (shared lock + `Arc::clone`);
/// writes only happen on the rare reload.
static SETTINGS: RwLock<Option<Arc<Settings>>> = RwLock::new(None);

/// Get the process-wide settings snapshot.
///
/// On first call, loads from `~/.quill/settings.json` with env overrides.
/// On subsequent calls, returns the cached value. If loading fails, returns
/// compiled defaults.
pub fn get_settings() -> Arc<Settings> {
    // Fast path: read lock
    {
        if let Some(ref s) = *SETTINGS.read() {
            return Arc::clone(s);
        }
    }

    // Slow path: first access, take write lock
    let mut guard = SETTINGS.write();
    // Double-check after acquiring the write lock
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialize the process-wide settings with a specific value.
///
/// Replaces any previously cached settings. Useful for tests and for startup
/// paths where the settings are already known.
pub fn init_settings(settings: Settings) {
    let mut guard = SETTINGS.write();
    *guard = Some(Arc::new(settings));
}

/// Reload settings from a specific file path and swap the cached snapshot.
pub fn reload_settings_from_path(path: &Path) {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, ?path, "failed to reload settings, falling back to defaults");
            Settings::default()
        }
    });
    let mut guard = SETTINGS.write();
    *guard = Some(new);
    tracing::info!(?path, "settings reloaded from disk");
}

/// Reset the cached snapshot (test-only).
#[cfg(test)]
pub(crate) fn reset_settings() {
    let mut guard = SETTINGS.write();
    *guard = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
