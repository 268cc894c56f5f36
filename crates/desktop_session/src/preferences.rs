//! Durable user preferences with documented defaults.
//!
//! All values live in one JSON object stored under a single key of a
//! [`PrefsStore`](platform_host::PrefsStore). Writes flush the whole object synchronously, so a
//! fresh [`Preferences::load`] over the same store observes the last written value.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use platform_host::{load_pref_with, save_pref_with, PrefsStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::SessionError;

pub const DEFAULT_PREFERENCES_KEY: &str = "desktop.preferences.v1";

pub const THEME: &str = "theme";
pub const DOCK_POSITION: &str = "dockPosition";
pub const SOUND_ENABLED: &str = "soundEnabled";
pub const SOUND_VOLUME: &str = "soundVolume";

const DEFAULT_SOUND_VOLUME: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DockPosition {
    #[default]
    Bottom,
    Left,
    Right,
}

/// Returns the documented default for a known preference key.
pub fn default_value(key: &str) -> Option<Value> {
    match key {
        THEME => Some(json!("dark")),
        DOCK_POSITION => Some(json!("bottom")),
        SOUND_ENABLED => Some(json!(true)),
        SOUND_VOLUME => Some(json!(DEFAULT_SOUND_VOLUME)),
        _ => None,
    }
}

pub struct Preferences {
    store: Rc<dyn PrefsStore>,
    key: String,
    values: BTreeMap<String, Value>,
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences")
            .field("key", &self.key)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl Preferences {
    /// Loads preferences stored under `key`.
    ///
    /// A missing entry yields defaults. An unreadable entry is logged and also yields defaults;
    /// boot never fails on bad preference data.
    pub fn load(store: Rc<dyn PrefsStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let values = match load_pref_with::<_, BTreeMap<String, Value>>(store.as_ref(), &key) {
            Ok(Some(values)) => values,
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!("preferences load failed: {err}");
                BTreeMap::new()
            }
        };
        debug!(key = %key, stored = values.len(), "preferences loaded");
        Self { store, key, values }
    }

    /// Returns the stored value for `key`, falling back to its documented default.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned().or_else(|| default_value(key))
    }

    /// Replaces the value for `key` and flushes all preferences to the store.
    ///
    /// Unknown keys are stored verbatim. When the flush fails the new value stays in effect for
    /// this session only.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] when the store rejects the write.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), SessionError> {
        self.values.insert(key.into(), value);
        save_pref_with(self.store.as_ref(), &self.key, &self.values).map_err(SessionError::Storage)
    }

    /// Keys explicitly written by the user, in sorted order.
    pub fn stored_keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn theme(&self) -> Theme {
        self.typed(THEME)
    }

    pub fn dock_position(&self) -> DockPosition {
        self.typed(DOCK_POSITION)
    }

    pub fn sound_enabled(&self) -> bool {
        self.get(SOUND_ENABLED)
            .and_then(|value| value.as_bool())
            .unwrap_or(true)
    }

    pub fn sound_volume(&self) -> f64 {
        self.get(SOUND_VOLUME)
            .and_then(|value| value.as_f64())
            .filter(|volume| volume.is_finite())
            .map(|volume| volume.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_SOUND_VOLUME)
    }

    fn typed<T: for<'de> Deserialize<'de> + Default>(&self, key: &str) -> T {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }
}
