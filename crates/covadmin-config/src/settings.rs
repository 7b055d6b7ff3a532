use std::path::Path;

use covadmin_types::{DEFAULT_DOMAIN, DEFAULT_PAGE_SIZE, MANDATORY_ROLE};
use serde::{Deserialize, Serialize};

use crate::paths::get_settings_path;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            use_tls: default_use_tls(),
            request_timeout: default_request_timeout(),
            accept_invalid_certs: false,
        }
    }
}

fn default_use_tls() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_domain")]
    pub default_domain: String,
    #[serde(default = "default_mandatory_role")]
    pub mandatory_role: String,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_domain: default_domain(),
            mandatory_role: default_mandatory_role(),
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_mandatory_role() -> String {
    MANDATORY_ROLE.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Optional client-side tuning. Every field has a default, so a missing file
/// is the same as an empty one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub directory: DirectorySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            connection: ConnectionSettings::default(),
            directory: DirectorySettings::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&get_settings_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&content)?;
        if settings.directory.page_size == 0 {
            tracing::warn!(
                "page_size of 0 in {} ignored, using {}",
                path.display(),
                DEFAULT_PAGE_SIZE
            );
            settings.directory.page_size = DEFAULT_PAGE_SIZE;
        }
        Ok(settings)
    }
}
