//! The evaluation pipeline.
//!
//! Runner → fast classifier → (mismatches only) semantic judge → aggregate
//! report. Every collaborator is injected through [`EvalContext`], so the
//! whole pipeline runs against fakes in tests.

pub mod classifier;
pub mod dataset;
pub mod generator;
pub mod judge;
pub mod runner;
pub mod scorer;

pub use classifier::{classify, quick_evaluate, Classification, ClassificationSummary};
pub use dataset::{load_dataset, parse_dataset, LabeledExample};
pub use generator::{LlmQueryGenerator, QueryGenerator};
pub use judge::{
    parse_verdict, EquivalenceOracle, EquivalenceVerdict, JudgeOutcome, LlmEquivalenceOracle,
    SemanticJudge, DEFAULT_MAX_JUDGE_ROWS, DEFAULT_NUMERIC_TOLERANCE,
};
pub use runner::{EvaluationRecord, EvaluationRunner, StageFailure};
pub use scorer::{evaluate_performance, Report};

use std::future::Future;
use std::time::Duration;

use crate::db::QueryExecutor;
use crate::error::{EvalError, Result};

/// Default per-call deadline for oracle requests.
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 60;

/// Tunables for one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSettings {
    /// Results with more rows than this are never sent to the judge.
    pub max_judge_rows: usize,
    /// Deadline for each generator or judge call.
    pub oracle_timeout: Duration,
    /// Report strict accuracy only, without judging mismatches.
    pub skip_judge: bool,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            max_judge_rows: DEFAULT_MAX_JUDGE_ROWS,
            oracle_timeout: Duration::from_secs(DEFAULT_ORACLE_TIMEOUT_SECS),
            skip_judge: false,
        }
    }
}

/// Handles to every external collaborator of a run.
pub struct EvalContext {
    /// Executes ground-truth and generated queries.
    pub executor: Box<dyn QueryExecutor>,
    /// Turns questions into SQL.
    pub generator: Box<dyn QueryGenerator>,
    /// Decides equivalence for mismatched results.
    pub oracle: Box<dyn EquivalenceOracle>,
    /// Run tunables.
    pub settings: EvalSettings,
}

impl EvalContext {
    /// Creates a context with default settings.
    pub fn new(
        executor: Box<dyn QueryExecutor>,
        generator: Box<dyn QueryGenerator>,
        oracle: Box<dyn EquivalenceOracle>,
    ) -> Self {
        Self {
            executor,
            generator,
            oracle,
            settings: EvalSettings::default(),
        }
    }

    /// Replaces the run settings.
    pub fn with_settings(mut self, settings: EvalSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Runs the full pipeline over `examples` against `database`.
pub async fn evaluate(
    ctx: &EvalContext,
    database: &str,
    examples: &[LabeledExample],
) -> Result<Report> {
    if examples.is_empty() {
        return Err(EvalError::EmptyDataset);
    }

    let records = EvaluationRunner::new(ctx).run_all(database, examples).await?;

    let judge = (!ctx.settings.skip_judge).then(|| {
        SemanticJudge::new(ctx.oracle.as_ref())
            .with_max_rows(ctx.settings.max_judge_rows)
            .with_timeout(ctx.settings.oracle_timeout)
    });

    evaluate_performance(&records, examples.len(), judge.as_ref()).await
}

/// Awaits `future`, turning an elapsed deadline into [`EvalError::Timeout`].
pub(crate) async fn with_timeout<T, F>(deadline: Duration, what: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| EvalError::timeout(format!("{what} exceeded {deadline:?}")))?
}
