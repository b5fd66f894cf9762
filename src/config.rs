use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the news provider credential.
pub const API_KEY_ENV: &str = "GNEWS_API_KEY";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "MERPATI_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "merpati.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Upstream request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Provider credential. Never read from the file, only from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_max")]
    pub max: u32,
}

fn default_base_url() -> String {
    "https://gnews.io/api/v4".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_max() -> u32 {
    12
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            lang: default_lang(),
            country: default_country(),
            max: default_max(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout: default_request_timeout(),
            upstream: UpstreamConfig::default(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Build the process configuration: the config file if one exists,
    /// defaults otherwise, plus the credential from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let config = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };

        Ok(config.with_api_key(std::env::var(API_KEY_ENV).ok()))
    }

    /// Attach the provider credential. Blank values count as missing.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
