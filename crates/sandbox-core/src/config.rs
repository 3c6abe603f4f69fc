//! Runtime configuration, loaded from TOML with environment-variable
//! overrides. Grounded on `search_config.rs`'s `from_toml`/
//! `with_env_overrides` split: a config struct is first decoded from disk,
//! then each field gets a chance to be overridden from the process
//! environment, matching the precedence operators expect from a CLI tool.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_db_path() -> String {
    "~/.sandbox-pipeline/state.db".to_string()
}

fn default_monitor_poll_interval_secs() -> u64 {
    5
}

fn default_log_buffer_lines() -> usize {
    500
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8088
}

fn default_memory_limit() -> String {
    "2g".to_string()
}

fn default_cpu_limit() -> String {
    "2".to_string()
}

/// Top-level configuration for every subsystem in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub llm: LlmConfig,
    pub docker: DockerConfig,
    pub monitor: MonitorConfig,
    pub gateway: GatewayConfig,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            docker: DockerConfig::default(),
            monitor: MonitorConfig::default(),
            gateway: GatewayConfig::default(),
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(with = "duration_secs", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(default_request_timeout_secs())
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: String,
    pub search_proxy_port: Option<u16>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            memory_limit: default_memory_limit(),
            cpu_limit: default_cpu_limit(),
            search_proxy_port: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    #[serde(with = "duration_secs", default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde(default = "default_log_buffer_lines")]
    pub log_buffer_lines: usize,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(default_monitor_poll_interval_secs())
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            log_buffer_lines: default_log_buffer_lines(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

impl SandboxConfig {
    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: SandboxConfig = toml::from_str(content)?;
        Ok(config.with_env_overrides())
    }

    /// Override fields from environment variables, following the precedence
    /// file-config < env-config that operator-facing tools expect.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("SANDBOX_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("SANDBOX_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(key) = std::env::var("SANDBOX_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        } else if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if self.llm.provider == "anthropic" {
                self.llm.api_key = Some(key);
            }
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.llm.provider == "openai" {
                self.llm.api_key = Some(key);
            }
        }
        if let Ok(db_path) = std::env::var("SANDBOX_DB_PATH") {
            self.db_path = db_path;
        }
        if let Ok(host) = std::env::var("SANDBOX_GATEWAY_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = std::env::var("SANDBOX_GATEWAY_PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.port = port;
            }
        }
        self
    }

    /// Expand `~` in the configured db path into the user's home directory.
    pub fn expanded_db_path(&self) -> String {
        shellexpand::tilde(&self.db_path).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = SandboxConfig::default();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.monitor.poll_interval, Duration::from_secs(5));
        assert_eq!(config.monitor.log_buffer_lines, 500);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: SandboxConfig = toml::from_str("[llm]\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.docker.memory_limit, "2g");
    }
}
