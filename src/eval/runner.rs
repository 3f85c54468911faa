//! Evaluation runner.
//!
//! For every labeled example: generate SQL, execute the ground truth and the
//! generated query, and keep both outcomes side by side. Examples are
//! processed strictly one after another, in input order.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::{ExecutionOutcome, Schema};
use crate::error::{EvalError, Result};
use crate::eval::{with_timeout, EvalContext, LabeledExample};

/// Why a record has no generated query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StageFailure {
    /// The generator could not be reached or did not answer in time.
    Transport(String),
    /// The generator answered with something that is not SQL.
    Protocol(String),
}

impl StageFailure {
    fn from_error(error: &EvalError) -> Self {
        match error {
            EvalError::OracleProtocol(msg) => Self::Protocol(msg.clone()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Paired outcomes for one example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    /// The natural-language question.
    pub text: String,
    /// Ground-truth SQL.
    pub true_query: String,
    /// Outcome of the ground-truth SQL.
    pub true_result: ExecutionOutcome,
    /// Generated SQL (empty when generation failed).
    pub generated_query: String,
    /// Outcome of the generated SQL.
    pub generated_result: ExecutionOutcome,
    /// Set when no generated query could be obtained.
    pub generation_failure: Option<StageFailure>,
}

/// Runs every example through the generator and the executor.
pub struct EvaluationRunner<'a> {
    ctx: &'a EvalContext,
}

impl<'a> EvaluationRunner<'a> {
    /// Creates a runner over the given context.
    pub fn new(ctx: &'a EvalContext) -> Self {
        Self { ctx }
    }

    /// Produces one record per example, in input order.
    ///
    /// Fails only when the schema cannot be read or the generator raises an
    /// error that is not scoped to a single record.
    pub async fn run_all(
        &self,
        database: &str,
        examples: &[LabeledExample],
    ) -> Result<Vec<EvaluationRecord>> {
        let schema = self.ctx.executor.introspect_schema(database).await?;
        info!(
            "Loaded schema with {} tables from {}",
            schema.tables.len(),
            database
        );

        let mut records = Vec::with_capacity(examples.len());
        for (i, example) in examples.iter().enumerate() {
            info!(
                "evaluating [{}/{}] {}",
                i + 1,
                examples.len(),
                example.natural_language
            );
            records.push(self.run_one(database, &schema, example).await?);
        }

        Ok(records)
    }

    /// Produces the record for a single example.
    pub async fn run_one(
        &self,
        database: &str,
        schema: &Schema,
        example: &LabeledExample,
    ) -> Result<EvaluationRecord> {
        let generated = with_timeout(
            self.ctx.settings.oracle_timeout,
            "query generation",
            self.ctx.generator.generate(&example.natural_language, schema),
        )
        .await;

        let executor = &self.ctx.executor;
        let true_result = executor.execute(database, &example.sql).await;

        let record = match generated {
            Ok(sql) => {
                let generated_result = executor.execute(database, &sql).await;
                EvaluationRecord {
                    text: example.natural_language.clone(),
                    true_query: example.sql.clone(),
                    true_result,
                    generated_query: sql,
                    generated_result,
                    generation_failure: None,
                }
            }
            Err(e) if e.is_record_scoped() => {
                warn!(
                    "Generation failed for {:?}: {}",
                    example.natural_language, e
                );
                EvaluationRecord {
                    text: example.natural_language.clone(),
                    true_query: example.sql.clone(),
                    true_result,
                    generated_query: String::new(),
                    generated_result: ExecutionOutcome::failed(e.to_string()),
                    generation_failure: Some(StageFailure::from_error(&e)),
                }
            }
            Err(e) => return Err(e),
        };

        Ok(record)
    }
}
