use crate::error::ConfigError;
use crate::utils::normalize_url;
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_MEDIA_URL: &str = "https://api.cloudinary.com/v1_1";

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_firestore_url() -> String {
    DEFAULT_FIRESTORE_URL.to_string()
}

fn default_media_url() -> String {
    DEFAULT_MEDIA_URL.to_string()
}

fn default_poll_interval() -> u64 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Account {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub upload_preset: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
    #[serde(default = "default_media_url")]
    pub media_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            cloud_name: String::new(),
            upload_preset: String::new(),
            auth_url: default_auth_url(),
            firestore_url: default_firestore_url(),
            media_url: default_media_url(),
            poll_interval_secs: default_poll_interval(),
            account: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }
    // TOML is the primary format; a legacy JSON state file is converted to TOML on first load
    pub fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("ichat.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("com", "example", "iChat")?;
        Some(proj.config_dir().join("state.json"))
    }

    /// Load from the default locations, falling back to defaults when nothing usable exists.
    pub fn load() -> Self {
        Self::load_with(Self::toml_path(), Self::legacy_json_path())
    }

    /// Prefer `toml`; otherwise migrate a readable `legacy` JSON file into `toml`.
    pub fn load_with(toml: Option<PathBuf>, legacy: Option<PathBuf>) -> Self {
        if let Some(path) = toml.as_deref() {
            match Self::load_from(path) {
                Ok(cfg) => return cfg,
                Err(ConfigError::Io(_)) => {}
                Err(e) => log::warn!("ignoring {}: {e}", path.display()),
            }
        }

        if let Some(legacy) = legacy {
            if let Ok(bytes) = fs::read(&legacy) {
                if let Ok(cfg) = serde_json::from_slice::<AppConfig>(&bytes) {
                    let cfg = cfg.normalized();
                    log::info!("migrating {} to TOML", legacy.display());
                    match toml.as_deref() {
                        Some(path) => {
                            if let Err(e) = cfg.save_to(path) {
                                log::warn!("could not write migrated config: {e}");
                            }
                        }
                        None => log::warn!("no config dir to migrate into"),
                    }
                    return cfg;
                }
            }
        }

        Self::new()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let cfg = toml::from_str::<AppConfig>(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(cfg.normalized())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, toml)?;
        Ok(())
    }

    fn normalized(mut self) -> Self {
        for (url, fallback) in [
            (&mut self.auth_url, DEFAULT_AUTH_URL),
            (&mut self.firestore_url, DEFAULT_FIRESTORE_URL),
            (&mut self.media_url, DEFAULT_MEDIA_URL),
        ] {
            *url = normalize_url(url);
            if url.is_empty() {
                *url = fallback.to_string();
            }
        }
        self
    }

    /// Fail on the first required setting that is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("api_key", &self.api_key),
            ("project_id", &self.project_id),
            ("cloud_name", &self.cloud_name),
            ("upload_preset", &self.upload_preset),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingSetting(name));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
