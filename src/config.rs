use std::{env, fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REMOTE_URL: &str = "https://solar-storage-backend.onrender.com";

/// Which of the two configured backends every request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Local,
    Remote,
}

impl FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" | "hosted" => Ok(Self::Remote),
            other => Err(anyhow!("BACKEND_MODE must be local|remote (got {other})")),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

// Values are trimmed; an empty value counts as unset.
struct EnvSource<F: Fn(&str) -> Option<String>> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvSource<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
        }
    }

    fn get_u16(&self, key: &str, default: u16) -> Result<u16> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => Ok(v
                .parse::<u16>()
                .map_err(|e| anyhow!("{key} invalid port: {e}"))?),
        }
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Backend
    pub backend_mode: BackendMode,
    pub local_base_url: String,
    pub remote_base_url: String,

    // Dashboard
    pub dashboard_host: String,
    pub dashboard_port: u16,
    pub dashboard_open_browser: bool,
    pub dashboard_title: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same as [`Settings::load`] but reads variables through `lookup`.
    /// Values are parsed here; [`Settings::validate`] runs once CLI overrides are applied.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let src = EnvSource { lookup };

        let backend_mode = src.get_string("BACKEND_MODE", "local").parse::<BackendMode>()?;

        Ok(Self {
            backend_mode,
            local_base_url: src.get_string("BACKEND_LOCAL_URL", DEFAULT_LOCAL_URL),
            remote_base_url: src.get_string("BACKEND_REMOTE_URL", DEFAULT_REMOTE_URL),
            dashboard_host: src.get_string("DASHBOARD_HOST", "127.0.0.1"),
            dashboard_port: src.get_u16("DASHBOARD_PORT", 8501)?,
            dashboard_open_browser: src.get_bool("DASHBOARD_OPEN_BROWSER", false),
            dashboard_title: src.get_string("DASHBOARD_TITLE", "Chainfly"),
        })
    }

    /// Base URL for the selected mode, without a trailing slash.
    pub fn backend_base_url(&self) -> &str {
        let url = match self.backend_mode {
            BackendMode::Local => &self.local_base_url,
            BackendMode::Remote => &self.remote_base_url,
        };
        url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        for (key, url) in [
            ("BACKEND_LOCAL_URL", &self.local_base_url),
            ("BACKEND_REMOTE_URL", &self.remote_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("{key} must start with http:// or https:// (got {url})"));
            }
        }
        if self.dashboard_port == 0 {
            return Err(anyhow!("DASHBOARD_PORT must be > 0"));
        }
        if self.dashboard_host.is_empty() {
            return Err(anyhow!("DASHBOARD_HOST must not be empty"));
        }
        Ok(())
    }
}
