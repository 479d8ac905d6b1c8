use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};
use crate::types::{PropertyId, SenderType, ThreadStatus};

/// Top-level configuration for Parley.
///
/// Loaded from `~/.parley/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ParleyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Messaging gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Upper bound on a single gateway call, in milliseconds.
    pub request_timeout_ms: u64,
    /// Property whose roster and threads are loaded.
    pub property_id: i64,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn property(&self) -> PropertyId {
        PropertyId(self.property_id)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            property_id: 1,
        }
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum message length in characters, after trimming.
    pub max_message_length: usize,
    /// Thread status to list: "active", "archived", "closed" or "all".
    pub status_filter: String,
    /// Role the portal user sends messages as.
    pub sender_type: SenderType,
}

impl ChatConfig {
    /// Parsed status filter. `None` means every status is listed.
    ///
    /// Unrecognised values fall back to `active`.
    pub fn status(&self) -> Option<ThreadStatus> {
        match self.status_filter.trim().to_ascii_lowercase().as_str() {
            "all" | "" => None,
            "archived" => Some(ThreadStatus::Archived),
            "closed" => Some(ThreadStatus::Closed),
            "active" => Some(ThreadStatus::Active),
            other => {
                warn!(status_filter = other, "Unknown status filter, using active");
                Some(ThreadStatus::Active)
            }
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 5_000,
            status_filter: "active".to_string(),
            sender_type: SenderType::PropertyManager,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ParleyConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.gateway.request_timeout_ms, 10_000);
        assert_eq!(config.gateway.property(), PropertyId(1));
        assert_eq!(config.chat.max_message_length, 5_000);
        assert_eq!(config.chat.sender_type, SenderType::PropertyManager);
        assert_eq!(config.chat.status(), Some(ThreadStatus::Active));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[gateway]
request_timeout_ms = 2500
property_id = 12

[chat]
max_message_length = 280
status_filter = "all"
sender_type = "staff"
"#;
        let file = create_temp_config(content);
        let config = ParleyConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.gateway.request_timeout(), Duration::from_millis(2500));
        assert_eq!(config.gateway.property(), PropertyId(12));
        assert_eq!(config.chat.max_message_length, 280);
        assert_eq!(config.chat.status(), None);
        assert_eq!(config.chat.sender_type, SenderType::Staff);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[gateway]\nproperty_id = 3\n");
        let config = ParleyConfig::load(file.path()).unwrap();
        assert_eq!(config.gateway.property_id, 3);
        // Remaining fields use defaults
        assert_eq!(config.gateway.request_timeout_ms, 10_000);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.chat.status_filter, "active");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is [not valid toml");
        let err = ParleyConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ParleyError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ParleyConfig::load_or_default(Path::new("/nonexistent/parley.toml"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ParleyConfig::default();
        config.chat.max_message_length = 42;
        config.save(&path).unwrap();

        let reloaded = ParleyConfig::load(&path).unwrap();
        assert_eq!(reloaded.chat.max_message_length, 42);
        assert_eq!(reloaded.chat.sender_type, config.chat.sender_type);
    }

    #[test]
    fn test_status_filter_parsing() {
        let mut chat = ChatConfig::default();
        chat.status_filter = "Archived".into();
        assert_eq!(chat.status(), Some(ThreadStatus::Archived));
        chat.status_filter = "closed".into();
        assert_eq!(chat.status(), Some(ThreadStatus::Closed));
        chat.status_filter = "bogus".into();
        assert_eq!(chat.status(), Some(ThreadStatus::Active));
        chat.status_filter = String::new();
        assert_eq!(chat.status(), None);
    }
}
