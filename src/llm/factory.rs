//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::error::{EvalError, Result};
use crate::llm::{
    AnthropicClient, AnthropicConfig, LlmClient, LlmProvider, MockLlmClient, OpenAiClient,
    OpenAiConfig,
};

/// Per-client request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Requests per completion for clients that retry transient failures.
    pub max_attempts: u32,
}

/// Creates an LLM client for the given provider.
///
/// If `api_key` is provided, it takes precedence over environment variables.
/// For providers that require an API key the key is resolved in order:
/// 1. Provided `api_key` parameter
/// 2. Environment variable (`ANTHROPIC_API_KEY` or `OPENAI_API_KEY`)
pub fn create_client(
    provider: LlmProvider,
    api_key: Option<String>,
    options: &ClientOptions,
) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::Anthropic => {
            let key = resolve_key(api_key, "ANTHROPIC_API_KEY")?;
            let config = AnthropicConfig::new(key, options.model.clone())
                .with_timeout(options.timeout_secs)
                .with_max_tokens(options.max_tokens);
            Ok(Box::new(AnthropicClient::new(config)?))
        }
        LlmProvider::OpenAi => {
            let key = resolve_key(api_key, "OPENAI_API_KEY")?;
            let config = OpenAiConfig::new(key, options.model.clone())
                .with_timeout(options.timeout_secs)
                .with_max_tokens(options.max_tokens)
                .with_max_attempts(options.max_attempts);
            Ok(Box::new(OpenAiClient::new(config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

fn resolve_key(api_key: Option<String>, env_var: &str) -> Result<String> {
    api_key
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| EvalError::config(format!("No API key configured. Set {env_var}.")))
}
