//! Card generation through an LLM provider.
//!
//! Prompt wording lives in [`crate::prompts`] and response clean-up in
//! [`super::response`]; this module only drives the call.
//!
//! ## Retry Strategy
//!
//! Transient provider errors (429, 503, timeouts) are retried with
//! exponential backoff: `retry_backoff_ms * 2^(attempt-1)`. An answer that
//! arrives but cannot be parsed is retried too, since a second sample often
//! complies with the output format.

use crate::config::{CardStyle, StudioConfig};
use crate::error::{ServiceError, StudioError};
use crate::gallery::GeneratedCard;
use crate::prompts::{card_request, system_prompt, CARD_DESIGNER_PROMPT};
use crate::services::response::parse_cards;
use crate::services::CardGenerator;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// [`CardGenerator`] backed by an [`LLMProvider`].
pub struct LlmCardGenerator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    styles: Vec<CardStyle>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl LlmCardGenerator {
    /// Build a generator, resolving the provider from the config or the
    /// environment.
    pub fn from_config(config: &StudioConfig) -> Result<Self, StudioError> {
        let provider = resolve_provider(config)?;
        Ok(Self::with_provider(provider, config))
    }

    /// Build a generator around an already constructed provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &StudioConfig) -> Self {
        let template = config
            .system_prompt
            .as_deref()
            .unwrap_or(CARD_DESIGNER_PROMPT);
        Self {
            provider,
            system_prompt: system_prompt(template, &config.canvas),
            styles: config.card_styles.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    async fn attempt(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Vec<GeneratedCard>, ServiceError> {
        let call = self.provider.chat(messages, Some(options));
        let response = timeout(Duration::from_secs(self.api_timeout_secs), call)
            .await
            .map_err(|_| ServiceError::Timeout {
                secs: self.api_timeout_secs,
            })?
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        parse_cards(&response.content)
    }
}

#[async_trait]
impl CardGenerator for LlmCardGenerator {
    async fn generate(&self, source: &str) -> Result<Vec<GeneratedCard>, ServiceError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(card_request(source, &self.styles)),
        ];
        let options = build_options(self.temperature, self.max_tokens);

        let mut last_err = ServiceError::Transport("no attempt made".into());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Card generation: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.attempt(&messages, &options).await {
                Ok(cards) => {
                    info!(
                        "Generated {} cards in {:?} ({} retries)",
                        cards.len(),
                        start.elapsed(),
                        attempt
                    );
                    return Ok(cards);
                }
                Err(e) => {
                    warn!("Card generation: attempt {} failed — {}", attempt + 1, e);
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StudioError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StudioError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. a pre-built provider in the config
/// 2. a named provider (`config.provider_name`) with the configured model
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is present
/// 5. whatever [`ProviderFactory::from_env`] detects
fn resolve_provider(config: &StudioConfig) -> Result<Arc<dyn LLMProvider>, StudioError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StudioError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_uses_card_defaults() {
        let config = StudioConfig::default();
        let opts = build_options(config.temperature, config.max_tokens);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(2000));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 4), 4000);
        assert_eq!(backoff_ms(500, 64), u64::MAX);
        assert_eq!(backoff_ms(500, 200), u64::MAX);
    }
}
