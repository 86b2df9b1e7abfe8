use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    #[serde(default = "default_log_config")]
    pub log: LogConfig,
    #[serde(default = "default_predictor_config")]
    pub predictor: PredictorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL this deployment is served from.
    /// Telegram is pointed at `{public_url}/webhook`.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Model behind the /llama pages.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Model behind the /deepseek pages and Telegram replies.
    #[serde(default = "default_reasoner_model")]
    pub reasoner_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictorConfig {
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,
}

fn default_port() -> u16 {
    5000
}

fn default_public_url() -> String {
    "https://botdeck.onrender.com".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_chat_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_reasoner_model() -> String {
    "deepseek-r1-distill-llama-70b".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_db_path() -> PathBuf {
    PathBuf::from("user.db")
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("dbs.json")
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        port: default_port(),
        public_url: default_public_url(),
    }
}

fn default_log_config() -> LogConfig {
    LogConfig {
        database_path: default_db_path(),
    }
}

fn default_predictor_config() -> PredictorConfig {
    PredictorConfig {
        artifact_path: default_artifact_path(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Callback URL registered with Telegram for webhook deliveries.
    pub fn callback_url(&self) -> String {
        format!("{}/webhook", self.server.public_url.trim_end_matches('/'))
    }
}
