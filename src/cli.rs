//! Command-line argument parsing for nl2sql-eval.

use crate::config::Config;
use crate::error::Result;
use crate::llm::LlmProvider;
use clap::Parser;
use std::path::PathBuf;

/// Scores an NL-to-SQL generator against a labeled dataset.
#[derive(Parser, Debug)]
#[command(name = "nl2sql-eval")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite database the queries run against
    #[arg(short = 'd', long, value_name = "PATH")]
    pub database: PathBuf,

    /// JSON dataset of questions with ground-truth SQL
    #[arg(short = 's', long, value_name = "PATH")]
    pub dataset: PathBuf,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// LLM provider (anthropic, openai, mock)
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<LlmProvider>,

    /// Model used to generate SQL
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Model used to judge equivalence (defaults to --model)
    #[arg(long, value_name = "MODEL")]
    pub judge_model: Option<String>,

    /// Report strict accuracy only, without semantic judging
    #[arg(long)]
    pub strict_only: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(provider) = self.provider {
            if provider.as_str() != config.llm.provider {
                // a model configured for another provider no longer applies
                config.llm.model = None;
                config.llm.judge_model = None;
            }
            config.llm.provider = provider.as_str().to_string();
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(model) = &self.judge_model {
            config.llm.judge_model = Some(model.clone());
        }
        config.validate()
    }
}
