//! Triage - classify a ticket and draft a first reply.
//!
//! The scheduler only sees the [`Triager`] trait. The production backend is
//! [`LlmTriager`], which sends the ticket to a chat model and parses the
//! reply strictly:
//!
//! ```text
//! TriageInput ──► LlmTriager ──► LlmClient (openai | anthropic | ollama)
//!                     │
//!                     └──► parse_triage_result ──► TriageResult
//! ```
//!
//! When no LLM is configured, [`UnconfiguredTriager`] is used and every
//! attempt fails with "LLM not configured".

mod config;
mod llm;
mod llm_triager;
mod parse;
mod traits;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

// LLM client types
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage,
    OllamaClient, OpenAiClient,
};

pub use config::{LlmConfig, LlmProvider, TriageConfig};
pub use llm_triager::LlmTriager;
pub use parse::parse_triage_result;
pub use traits::{TriageError, TriageInput, Triager, UnconfiguredTriager};

/// Build the LLM client described by `config`.
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, TriageError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let api_key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(TriageError::NotConfigured)
    };

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::OpenAi => {
            let mut client = OpenAiClient::new(api_key()?, &config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(client)
        }
        LlmProvider::Anthropic => {
            let mut client =
                AnthropicClient::new(api_key()?, &config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(client)
        }
        LlmProvider::Ollama => {
            let mut client = OllamaClient::new(&config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(client)
        }
    };

    Ok(client)
}

/// Build the triager for the given configuration.
///
/// Without an `llm` section this returns [`UnconfiguredTriager`].
pub fn create_triager(config: &TriageConfig) -> Result<Arc<dyn Triager>, TriageError> {
    match &config.llm {
        Some(llm) => {
            let client = create_llm_client(llm)?;
            info!(provider = client.provider(), model = client.model(), "LLM triage enabled");
            Ok(Arc::new(
                LlmTriager::new(client)
                    .with_max_tokens(llm.max_tokens)
                    .with_temperature(llm.temperature),
            ))
        }
        None => {
            warn!("No LLM configured, triage attempts will fail");
            Ok(Arc::new(UnconfiguredTriager))
        }
    }
}
