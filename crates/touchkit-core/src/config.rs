//! Persistent configuration for touchkit.
//!
//! Stores user settings in `~/.touchkit/config.json`: gesture sampling rate,
//! tap hold time, the injection timeout, and defaults for the command
//! surface. Missing fields take their defaults, so a partial file is valid.
//!
//! # Example
//!
//! ```no_run
//! use touchkit_core::config::TouchkitConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = TouchkitConfig::load();
//! println!("sampling every {}s", config.frame_interval_secs);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gesture::{DEFAULT_FRAME_INTERVAL, MIN_GESTURE_DURATION};
use crate::resolver::Narrowing;

const CONFIG_FILENAME: &str = "config.json";

/// Returns the touchkit data directory (`~/.touchkit/`).
///
/// Creates the directory if it doesn't exist. Falls back to the system
/// temp directory when no home directory can be determined.
pub fn touchkit_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".touchkit");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn default_frame_interval() -> f64 {
    DEFAULT_FRAME_INTERVAL
}

fn default_tap_duration() -> f64 {
    MIN_GESTURE_DURATION
}

/// Persistent touchkit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchkitConfig {
    /// Spacing between `Moved` samples, in seconds.
    #[serde(default = "default_frame_interval")]
    pub frame_interval_secs: f64,

    /// How long a tap holds before release, in seconds.
    #[serde(default = "default_tap_duration")]
    pub tap_duration_secs: f64,

    /// Upper bound on a single injection. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_timeout_ms: Option<u64>,

    /// Bundle ID targeted when a command names no application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_application: Option<String>,

    /// Narrowing applied by the CLI when `--button` is not given.
    #[serde(default)]
    pub default_narrowing: Narrowing,
}

impl Default for TouchkitConfig {
    fn default() -> Self {
        Self {
            frame_interval_secs: DEFAULT_FRAME_INTERVAL,
            tap_duration_secs: MIN_GESTURE_DURATION,
            injection_timeout_ms: None,
            default_application: None,
            default_narrowing: Narrowing::None,
        }
    }
}

impl TouchkitConfig {
    /// Path of the config file (`~/.touchkit/config.json`).
    pub fn path() -> PathBuf {
        touchkit_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.touchkit/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from an explicit path, with the same fallback as [`load`](Self::load).
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.touchkit/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to an explicit path as pretty-printed JSON.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// The injection timeout as a [`Duration`].
    pub fn injection_timeout(&self) -> Option<Duration> {
        self.injection_timeout_ms.map(Duration::from_millis)
    }
}
