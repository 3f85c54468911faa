//! Configuration management for nl2sql-eval.
//!
//! Loads run settings from a TOML file. Every field has a default, so a
//! missing file or a partial one is fine; command-line flags override the
//! file afterwards.

use crate::error::{EvalError, Result};
use crate::eval::{EvalSettings, DEFAULT_MAX_JUDGE_ROWS, DEFAULT_NUMERIC_TOLERANCE};
use crate::llm::openai::MAX_RETRY_ATTEMPTS;
use crate::llm::{ClientOptions, LlmProvider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Oracle settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pipeline settings.
    #[serde(default)]
    pub eval: EvalConfig,
}

/// LLM provider configuration, shared by the generator and the judge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// LLM provider: "anthropic", "openai" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Generator model. Falls back to the provider's default.
    #[serde(default)]
    pub model: Option<String>,

    /// Judge model. Falls back to `model`.
    #[serde(default)]
    pub judge_model: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_generation_max_tokens")]
    pub generation_max_tokens: u32,

    #[serde(default = "default_judge_max_tokens")]
    pub judge_max_tokens: u32,
}

fn default_provider() -> String {
    LlmProvider::default().as_str().to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_generation_max_tokens() -> u32 {
    1000
}

fn default_judge_max_tokens() -> u32 {
    50
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            judge_model: None,
            timeout_secs: default_llm_timeout(),
            generation_max_tokens: default_generation_max_tokens(),
            judge_max_tokens: default_judge_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// Parses the configured provider.
    pub fn provider(&self) -> Result<LlmProvider> {
        self.provider.parse().map_err(EvalError::config)
    }

    /// Model used to generate SQL.
    pub fn generation_model(&self) -> Result<String> {
        match &self.model {
            Some(model) => Ok(model.clone()),
            None => Ok(self.provider()?.default_model().to_string()),
        }
    }

    /// Model used to judge equivalence.
    pub fn judge_model(&self) -> Result<String> {
        match &self.judge_model {
            Some(model) => Ok(model.clone()),
            None => self.generation_model(),
        }
    }

    /// Client options for the generator.
    pub fn generation_options(&self) -> Result<ClientOptions> {
        Ok(ClientOptions {
            model: self.generation_model()?,
            timeout_secs: self.timeout_secs,
            max_tokens: self.generation_max_tokens,
            max_attempts: MAX_RETRY_ATTEMPTS,
        })
    }

    /// Client options for the judge. Each mismatch gets exactly one request.
    pub fn judge_options(&self) -> Result<ClientOptions> {
        Ok(ClientOptions {
            model: self.judge_model()?,
            timeout_secs: self.timeout_secs,
            max_tokens: self.judge_max_tokens,
            max_attempts: 1,
        })
    }
}

/// Evaluation pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalConfig {
    /// Results with more rows than this are never judged.
    #[serde(default = "default_max_judge_rows")]
    pub max_judge_rows: usize,

    /// Numbers closer than this are equal for the judge.
    #[serde(default = "default_numeric_tolerance")]
    pub numeric_tolerance: f64,

    /// Per-query timeout in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

fn default_max_judge_rows() -> usize {
    DEFAULT_MAX_JUDGE_ROWS
}

fn default_numeric_tolerance() -> f64 {
    DEFAULT_NUMERIC_TOLERANCE
}

fn default_query_timeout() -> u64 {
    30
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_judge_rows: default_max_judge_rows(),
            numeric_tolerance: default_numeric_tolerance(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nl2sql-eval")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| EvalError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            EvalError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.llm.provider()?;
        if self.llm.timeout_secs == 0 || self.eval.query_timeout_secs == 0 {
            return Err(EvalError::config("Timeouts must be at least one second"));
        }
        if !self.eval.numeric_tolerance.is_finite() || self.eval.numeric_tolerance < 0.0 {
            return Err(EvalError::config(format!(
                "Invalid numeric_tolerance: {}",
                self.eval.numeric_tolerance
            )));
        }
        Ok(())
    }

    /// Pipeline settings for a run.
    pub fn eval_settings(&self, skip_judge: bool) -> EvalSettings {
        EvalSettings {
            max_judge_rows: self.eval.max_judge_rows,
            oracle_timeout: Duration::from_secs(self.llm.timeout_secs),
            skip_judge,
        }
    }

    /// Per-query timeout for the executor.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.eval.query_timeout_secs)
    }
}
