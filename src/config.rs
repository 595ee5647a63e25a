//! Configuration loader
//!
//! Infrastructure settings only: credentials, endpoints, and the loop's
//! timing knobs. There are no strategy parameters to configure - the
//! strategy lives on the other side of the completion API.
//!
//! Secrets can be left blank in config.toml and supplied through the
//! environment instead (ROBINHOOD_USERNAME, OPENAI_API_KEY, ...).

use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub broker: BrokerConfig,
    pub advisor: AdvisorConfig,
    pub news: NewsConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub trading: TradingConfig,
}

#[derive(Debug, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// One-time MFA code for the login call. Whoever owns the credentials
    /// generates it; we only pass it through.
    #[serde(default)]
    pub mfa_code: Option<String>,
    #[serde(default = "default_broker_url")]
    pub base_url: String,
}

fn default_broker_url() -> String {
    "https://api.robinhood.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_advisor_url")]
    pub base_url: String,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_advisor_url() -> String {
    "https://api.openai.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_news_url")]
    pub base_url: String,
}

fn default_news_url() -> String {
    "https://newsapi.org".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Seconds between cycles. The prompt tells the model how often it is
    /// called, so this also feeds the cadence line.
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
    /// Safety pause between parsing a command and placing a live order.
    #[serde(default = "default_execute_delay")]
    pub execute_delay_secs: u64,
    /// Pause before asking for a fresh decision after a malformed reply.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// How many fresh decisions to request before giving up on the cycle.
    #[serde(default = "default_max_retries")]
    pub max_decision_retries: u32,
    /// Sampling temperature for the completion call. Low on purpose - we
    /// want the same snapshot to produce the same command.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_cycle_interval() -> u64 {
    1800
}

fn default_execute_delay() -> u64 {
    5
}

fn default_retry_delay() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_temperature() -> f64 {
    0.2
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval(),
            execute_delay_secs: default_execute_delay(),
            retry_delay_secs: default_retry_delay(),
            max_decision_retries: default_max_retries(),
            temperature: default_temperature(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment wins over the file for secrets, so config.toml can be
    /// committed with the secret fields left blank.
    fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.broker.username, "ROBINHOOD_USERNAME");
        override_from_env(&mut self.broker.password, "ROBINHOOD_PASSWORD");
        if let Ok(code) = env::var("ROBINHOOD_MFA_CODE") {
            if !code.is_empty() {
                self.broker.mfa_code = Some(code);
            }
        }
        override_from_env(&mut self.advisor.api_key, "OPENAI_API_KEY");
        override_from_env(&mut self.news.api_key, "NEWSAPI_KEY");
        override_from_env(&mut self.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        override_from_env(&mut self.telegram.chat_id, "TELEGRAM_CHAT_ID");
    }
}

fn override_from_env(value: &mut String, key: &str) {
    if let Ok(v) = env::var(key) {
        if !v.is_empty() {
            *value = v;
        }
    }
}
