//! Semantic equivalence judging for mismatched records.
//!
//! Strict comparison rejects results that differ only in column order,
//! rounding or extra columns. The judge asks a second oracle whether such a
//! near miss still answers the question, after a hard size cutoff.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::db::ExecutionOutcome;
use crate::error::{EvalError, Result};
use crate::eval::{with_timeout, EvaluationRecord, DEFAULT_ORACLE_TIMEOUT_SECS};
use crate::llm::{build_judge_messages, LlmClient};

/// Results with more rows than this are never judged.
pub const DEFAULT_MAX_JUDGE_ROWS: usize = 1000;

/// Numbers closer than this count as equal for the judge.
pub const DEFAULT_NUMERIC_TOLERANCE: f64 = 1.0;

/// The judge's decision for one mismatched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EquivalenceVerdict {
    Correct,
    Incorrect,
}

impl fmt::Display for EquivalenceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => write!(f, "Correct"),
            Self::Incorrect => write!(f, "Incorrect"),
        }
    }
}

impl FromStr for EquivalenceVerdict {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        parse_verdict(s)
    }
}

/// Normalizes an oracle reply to a verdict.
///
/// Surrounding whitespace, quotes and trailing punctuation are ignored and
/// case does not matter; any other reply is a protocol violation.
pub fn parse_verdict(reply: &str) -> Result<EquivalenceVerdict> {
    let token = reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim_end_matches(['.', '!'])
        .trim();

    if token.eq_ignore_ascii_case("correct") {
        Ok(EquivalenceVerdict::Correct)
    } else if token.eq_ignore_ascii_case("incorrect") {
        Ok(EquivalenceVerdict::Incorrect)
    } else {
        Err(EvalError::protocol(format!(
            "expected Correct or Incorrect, got {:?}",
            reply.trim()
        )))
    }
}

/// Decides whether a generated result answers the question as well as the
/// ground-truth result does.
#[async_trait]
pub trait EquivalenceOracle: Send + Sync {
    /// Judges one pair of results. Callers apply the size guard first.
    async fn judge(
        &self,
        question: &str,
        true_result: &ExecutionOutcome,
        generated_result: &ExecutionOutcome,
    ) -> Result<EquivalenceVerdict>;
}

/// An [`EquivalenceOracle`] backed by an LLM.
pub struct LlmEquivalenceOracle {
    client: Box<dyn LlmClient>,
    numeric_tolerance: f64,
}

impl LlmEquivalenceOracle {
    /// Wraps an LLM client with the default numeric tolerance.
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client,
            numeric_tolerance: DEFAULT_NUMERIC_TOLERANCE,
        }
    }

    /// Sets the numeric tolerance stated in the instructions.
    pub fn with_numeric_tolerance(mut self, tolerance: f64) -> Self {
        self.numeric_tolerance = tolerance;
        self
    }
}

#[async_trait]
impl EquivalenceOracle for LlmEquivalenceOracle {
    async fn judge(
        &self,
        question: &str,
        true_result: &ExecutionOutcome,
        generated_result: &ExecutionOutcome,
    ) -> Result<EquivalenceVerdict> {
        let messages =
            build_judge_messages(question, true_result, generated_result, self.numeric_tolerance);
        let reply = self.client.complete(&messages).await?;
        parse_verdict(&reply)
    }
}

/// What the judge did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeOutcome {
    /// The oracle was consulted.
    Judged(EquivalenceVerdict),
    /// Too large to judge; counts as `Incorrect`.
    SizeGuarded,
    /// The ground truth failed, so there is nothing to compare against;
    /// counts as `Incorrect`.
    NoReference,
}

impl JudgeOutcome {
    /// The effective verdict.
    pub fn verdict(&self) -> EquivalenceVerdict {
        match self {
            Self::Judged(verdict) => *verdict,
            Self::SizeGuarded | Self::NoReference => EquivalenceVerdict::Incorrect,
        }
    }
}

/// Applies the size guard and the per-call deadline around an oracle.
pub struct SemanticJudge<'a> {
    oracle: &'a dyn EquivalenceOracle,
    max_rows: usize,
    timeout: Duration,
}

impl<'a> SemanticJudge<'a> {
    /// Creates a judge with the default row threshold and timeout.
    pub fn new(oracle: &'a dyn EquivalenceOracle) -> Self {
        Self {
            oracle,
            max_rows: DEFAULT_MAX_JUDGE_ROWS,
            timeout: Duration::from_secs(DEFAULT_ORACLE_TIMEOUT_SECS),
        }
    }

    /// Sets the row threshold.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Sets the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True if either result is over the row threshold.
    pub fn exceeds_size_guard(&self, record: &EvaluationRecord) -> bool {
        record.true_result.row_count() > self.max_rows
            || record.generated_result.row_count() > self.max_rows
    }

    /// Judges one mismatched record. Records without a ground-truth result
    /// and oversized records never reach the oracle.
    pub async fn judge(&self, record: &EvaluationRecord) -> Result<JudgeOutcome> {
        if record.true_result.is_failed() {
            debug!("Skipping judge for {:?}: ground truth failed", record.text);
            return Ok(JudgeOutcome::NoReference);
        }

        if self.exceeds_size_guard(record) {
            debug!(
                "Skipping judge for {:?}: {} vs {} rows exceeds {}",
                record.text,
                record.true_result.row_count(),
                record.generated_result.row_count(),
                self.max_rows
            );
            return Ok(JudgeOutcome::SizeGuarded);
        }

        let verdict = with_timeout(
            self.timeout,
            "equivalence judging",
            self.oracle
                .judge(&record.text, &record.true_result, &record.generated_result),
        )
        .await?;

        debug!("Judge verdict for {:?}: {}", record.text, verdict);
        Ok(JudgeOutcome::Judged(verdict))
    }
}
