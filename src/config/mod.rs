mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use url::Url;
use vodplay_hls::QualitySelection;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./vodplay.toml",
        "~/.config/vodplay/config.toml",
        "/etc/vodplay/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let base = Url::parse(&config.api.base_url)
        .with_context(|| format!("Invalid API base URL: {}", config.api.base_url))?;
    if base.cannot_be_a_base() {
        anyhow::bail!("API base URL cannot carry a path: {}", config.api.base_url);
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("API timeout cannot be 0");
    }

    if !is_quality_form(&config.playback.initial_quality) {
        anyhow::bail!(
            "Unknown initial quality '{}' (expected auto, level-N, N or a label like 720p)",
            config.playback.initial_quality
        );
    }

    if config.playback.bandwidth_estimate_bps == 0 {
        tracing::warn!("Bandwidth estimate is 0, automatic selection will pick the lowest level");
    }

    Ok(())
}

/// Whether `value` can name a quality before any manifest is known.
fn is_quality_form(value: &str) -> bool {
    if value.parse::<QualitySelection>().is_ok() {
        return true;
    }
    value
        .trim()
        .strip_suffix('p')
        .is_some_and(|h| !h.is_empty() && h.chars().all(|c| c.is_ascii_digit()))
}
