use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::player::SessionOptions;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the video service; the API lives under `/api/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout for catalog and manifest requests
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Start playback as soon as the session is ready
    #[serde(default = "default_true")]
    pub autoplay: bool,

    /// Take the sink's native HLS path even when the engine is available
    #[serde(default)]
    pub prefer_native: bool,

    /// Bandwidth the engine assumes when choosing a level automatically
    #[serde(default = "default_bandwidth_estimate")]
    pub bandwidth_estimate_bps: u64,

    /// Quality applied once the ladder is known: `auto`, `level-N`, `N` or a
    /// label such as `720p`
    #[serde(default = "default_initial_quality")]
    pub initial_quality: String,

    /// Quiet period that ends a headless run
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_bandwidth_estimate() -> u64 {
    5_000_000
}
fn default_initial_quality() -> String {
    "auto".to_string()
}
fn default_settle_ms() -> u64 {
    200
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: default_true(),
            prefer_native: false,
            bandwidth_estimate_bps: default_bandwidth_estimate(),
            initial_quality: default_initial_quality(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl PlaybackConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Session knobs for this configuration, with an optional override of
    /// the initial quality.
    pub fn session_options(&self, quality: Option<&str>) -> SessionOptions {
        SessionOptions {
            autoplay: self.autoplay,
            prefer_native: self.prefer_native,
            initial_quality: Some(quality.unwrap_or(&self.initial_quality).to_string()),
        }
    }
}
