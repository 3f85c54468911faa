//! Query generation.
//!
//! The generator oracle is consumed through the [`QueryGenerator`] trait;
//! [`LlmQueryGenerator`] backs it with any [`LlmClient`].

use async_trait::async_trait;
use tracing::debug;

use crate::db::Schema;
use crate::error::Result;
use crate::llm::{build_generation_messages, extract_sql, LlmClient};

/// Translates a natural-language question into one line of SQL.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    /// Generates SQL for `question` given the full `schema`.
    ///
    /// Errors are transport failures, timeouts, or
    /// [`crate::error::EvalError::OracleProtocol`] when no SQL could be read
    /// from the response.
    async fn generate(&self, question: &str, schema: &Schema) -> Result<String>;
}

/// A [`QueryGenerator`] that prompts an LLM with the schema and worked examples.
pub struct LlmQueryGenerator {
    client: Box<dyn LlmClient>,
}

impl LlmQueryGenerator {
    /// Wraps an LLM client.
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryGenerator for LlmQueryGenerator {
    async fn generate(&self, question: &str, schema: &Schema) -> Result<String> {
        let messages = build_generation_messages(schema, question);
        let response = self.client.complete(&messages).await?;
        let sql = extract_sql(&response)?;
        debug!("Generated SQL for {:?}: {}", question, sql);
        Ok(sql)
    }
}
