use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
const CONFIG_FILE: &str = "bridge.json";

/// Error types for loading and saving the bridge configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No platform config directory available")]
    NoConfigDir,
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Bridge configuration (selectors and timing)
///
/// The hosted page is not ours, so every selector is data rather than code:
/// when the page's markup shifts, the host can ship a new `bridge.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    // === Readiness ===
    /// Region whose appearance means the player has rendered
    pub player_region_selector: String,

    /// The media element
    pub media_selector: String,

    /// Element carrying the page's player API
    pub player_api_selector: String,

    // === Track Info ===
    pub title_selectors: Vec<String>,
    pub artist_selectors: Vec<String>,

    // === Controls (tried in order, first match wins) ===
    pub next_selectors: Vec<String>,
    pub previous_selectors: Vec<String>,

    // === Timing ===
    /// Backstop poll period for changes the observer missed
    pub poll_interval_ms: u64,

    /// Drop a queued command once it is this old. `None` keeps it until the page is ready.
    pub pending_command_ttl_ms: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            player_region_selector: "ytmusic-player-bar".to_string(),
            media_selector: "video".to_string(),
            player_api_selector: "#movie_player".to_string(),

            title_selectors: vec![
                ".title.ytmusic-player-bar, .content-info-wrapper .title".to_string(),
            ],
            artist_selectors: vec![
                ".byline.ytmusic-player-bar a, .content-info-wrapper .byline a, .subtitle .byline a"
                    .to_string(),
            ],

            // Player bar class, then accessible label, then the embedded player's chrome
            next_selectors: vec![
                ".next-button, .ytmusic-player-bar .next-button, tp-yt-paper-icon-button.next-button"
                    .to_string(),
                r#"[aria-label="Next"]"#.to_string(),
                ".ytp-next-button".to_string(),
            ],
            previous_selectors: vec![
                ".previous-button, .ytmusic-player-bar .previous-button, tp-yt-paper-icon-button.previous-button"
                    .to_string(),
                r#"[aria-label="Previous"]"#.to_string(),
                ".ytp-prev-button".to_string(),
            ],

            poll_interval_ms: 2000,
            pending_command_ttl_ms: None,
        }
    }
}

impl BridgeConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would spin the driver
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn pending_command_ttl(&self) -> Option<Duration> {
        self.pending_command_ttl_ms.map(Duration::from_millis)
    }

    /// Parse a config handed over by the host. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl BridgeConfig {
    /// Location of `bridge.json` in the platform config dir
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("com", "TuneBar", "TuneBar")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from disk, falling back to defaults. Never fails.
    pub fn load() -> Self {
        match Self::path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                tracing::warn!("[Config] {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[Config] No config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("[Config] Failed to read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_json(&raw) {
            Ok(config) => {
                tracing::info!("[Config] Loaded {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("[Config] Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_player_bar() {
        let config = BridgeConfig::default();
        assert_eq!(config.player_region_selector, "ytmusic-player-bar");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.pending_command_ttl(), None);
        assert_eq!(config.next_selectors.len(), 3);
        assert_eq!(config.previous_selectors[2], ".ytp-prev-button");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json(r#"{ "poll_interval_ms": 500, "pending_command_ttl_ms": 10000 }"#)
            .unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.pending_command_ttl(), Some(Duration::from_secs(10)));
        assert_eq!(config.media_selector, "video");
    }

    #[test]
    fn test_poll_interval_floor() {
        let config = BridgeConfig { poll_interval_ms: 0, ..Default::default() };
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(BridgeConfig::from_json("{ nope"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("tunebar-config-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);

        let config = BridgeConfig { poll_interval_ms: 750, ..Default::default() };
        config.save_to(&path).unwrap();
        assert_eq!(BridgeConfig::load_from(&path), config);

        // Garbage on disk falls back to defaults
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(BridgeConfig::load_from(&path), BridgeConfig::default());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("tunebar-definitely-missing").join(CONFIG_FILE);
        assert_eq!(BridgeConfig::load_from(&path), BridgeConfig::default());
    }
}
