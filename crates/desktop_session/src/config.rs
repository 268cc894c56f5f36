//! Desktop configuration, with a default for every field.
//!
//! Hosts usually embed a small TOML document:
//!
//! ```toml
//! error_policy = "lenient"
//! default_directory = "/home/guest"
//!
//! [viewport]
//! width = 1440
//! height = 900
//! ```

use serde::{Deserialize, Serialize};

use crate::achievements::DEFAULT_ACHIEVEMENTS_KEY;
use crate::context_menu::MenuMetrics;
use crate::error::ErrorPolicy;
use crate::model::{Viewport, DEFAULT_DIRECTORY};
use crate::preferences::DEFAULT_PREFERENCES_KEY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub viewport: Viewport,
    pub error_policy: ErrorPolicy,
    pub preferences_key: String,
    pub achievements_key: String,
    pub default_directory: String,
    pub toast_ttl_ms: u64,
    pub max_visible_toasts: usize,
    pub menu: MenuMetrics,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            error_policy: ErrorPolicy::default(),
            preferences_key: DEFAULT_PREFERENCES_KEY.to_string(),
            achievements_key: DEFAULT_ACHIEVEMENTS_KEY.to_string(),
            default_directory: DEFAULT_DIRECTORY.to_string(),
            toast_ttl_ms: 4_000,
            max_visible_toasts: 3,
            menu: MenuMetrics::default(),
        }
    }
}

impl DesktopConfig {
    /// Parses a TOML document; omitted fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parser's message when `raw` is not valid TOML for this shape.
    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|err| format!("invalid desktop config: {err}"))
    }
}
