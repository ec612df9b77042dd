//! LLM-backed triager.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::llm::{CompletionRequest, LlmClient};
use super::parse::parse_triage_result;
use super::traits::{TriageError, TriageInput, Triager};
use crate::metrics;
use crate::ticket::TriageResult;

const SYSTEM_PROMPT: &str = "You are an AI support triage engine. Return JSON only with keys: \
category (BILLING|TECHNICAL|FEATURE_REQUEST), sentimentScore (1-10), urgency (HIGH|MEDIUM|LOW), \
draftResponse (polite, concise reply).";

/// Triager that asks an LLM to classify the ticket and draft a reply.
pub struct LlmTriager {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmTriager {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: 1024,
            temperature: 0.2,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request(&self, input: &TriageInput) -> Result<CompletionRequest, TriageError> {
        let prompt = serde_json::to_string(input)
            .map_err(|e| TriageError::Failed(format!("failed to encode ticket: {}", e)))?;

        Ok(CompletionRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_json_mode())
    }
}

#[async_trait]
impl Triager for LlmTriager {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn triage(&self, input: &TriageInput) -> Result<TriageResult, TriageError> {
        let request = self.build_request(input)?;
        let response = self.client.complete(request).await?;

        let provider = self.client.provider();
        metrics::LLM_TOKENS
            .with_label_values(&[provider, "input"])
            .inc_by(response.usage.input_tokens as u64);
        metrics::LLM_TOKENS
            .with_label_values(&[provider, "output"])
            .inc_by(response.usage.output_tokens as u64);

        debug!(
            provider,
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Triage completion received"
        );

        parse_triage_result(&response.text)
    }
}
