// Configuration Storage Service
// Reads the optional config file and layers environment overrides on top

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_DETECTOR_MODEL: &str = "Hello-SimpleAI/roberta-large-openai-detector";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub refinement: RefinementConfig,
    #[serde(default)]
    pub provenance: ProvenanceConfig,
    #[serde(default)]
    pub oracles: OracleConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementConfig {
    /// A candidate whose blended AI probability is at or below this is accepted.
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,
    /// Regeneration rounds after the first candidate.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chat_model")]
    pub generator_model: String,
    #[serde(default = "default_chat_model")]
    pub judge_model: String,
    #[serde(default = "default_detector_model")]
    pub detector_model: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            generator_model: default_chat_model(),
            judge_model: default_chat_model(),
            detector_model: default_detector_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Endpoint override, e.g. a local proxy.
    pub base_url: Option<String>,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 4000 }
fn default_accept_threshold() -> f64 { 0.12 }
fn default_max_retries() -> u32 { 5 }
fn default_capacity() -> usize { 10_000 }
fn default_ttl_secs() -> u64 { 24 * 60 * 60 }
fn default_similarity_threshold() -> f64 { 0.92 }
fn default_timeout_secs() -> u64 { 30 }
fn default_chat_model() -> String { DEFAULT_CHAT_MODEL.to_string() }
fn default_detector_model() -> String { DEFAULT_DETECTOR_MODEL.to_string() }

impl AppConfig {
    /// Apply process environment on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(model) = lookup("DETECTOR_MODEL_HF").filter(|m| !m.trim().is_empty()) {
            self.oracles.detector_model = model.trim().to_string();
        }
    }

    pub fn provider_url(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.base_url.as_deref())
    }
}

pub struct ConfigStore {
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.json"),
        }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        if let Ok(dir) = env::var("HUMANIZER_CONFIG_DIR") {
            if !dir.trim().is_empty() {
                return Some(PathBuf::from(dir));
            }
        }
        dirs::config_dir().map(|p| p.join("humanizeAI"))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Get provider API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }
}
