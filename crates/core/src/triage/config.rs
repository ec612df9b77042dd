//! Triage backend configuration types.

use serde::{Deserialize, Serialize};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// OpenAI chat completions (or any compatible server via `api_base`).
    #[default]
    OpenAi,
    /// Anthropic Claude API.
    Anthropic,
    /// Local Ollama instance.
    Ollama,
}

impl LlmProvider {
    /// Whether requests need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }
}

/// LLM client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name/identifier.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            api_key: None,
            api_base: None,
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Triage configuration. Without an `llm` section every attempt fails with
/// "LLM not configured".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

impl TriageConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let Some(llm) = &self.llm else {
            return Ok(());
        };

        if llm.model.trim().is_empty() {
            return Err("LLM model name cannot be empty".to_string());
        }
        if llm.provider.requires_api_key()
            && llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(format!("LLM provider {:?} requires api_key", llm.provider));
        }
        if llm.timeout_secs == 0 {
            return Err("LLM timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                llm.temperature
            ));
        }

        Ok(())
    }
}
