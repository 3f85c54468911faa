//! Aggregate scoring.
//!
//! Combines the strict classification with the semantic judge's verdicts on
//! mismatches into the final [`Report`].

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::error::{EvalError, Result};
use crate::eval::classifier::percentage;
use crate::eval::{quick_evaluate, EquivalenceVerdict, EvaluationRecord, JudgeOutcome, SemanticJudge};

/// Final accuracy report for one run.
///
/// `total == correct + errors + incorrect + generation_failures` and
/// `pseudo_correct <= incorrect` always hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total: usize,
    pub correct: usize,
    /// Mismatches the judge accepted as equivalent.
    pub pseudo_correct: usize,
    pub errors: usize,
    /// Mismatches under strict comparison, pseudo-correct ones included.
    pub incorrect: usize,
    pub generation_failures: usize,
    /// Mismatches whose judge call failed in transport or timed out.
    pub judge_failures: usize,
    /// Mismatches whose judge reply was neither Correct nor Incorrect.
    pub judge_protocol_violations: usize,
    /// Mismatches skipped by the size guard.
    pub size_guarded: usize,
    /// Mismatches skipped because the ground-truth query failed.
    pub truth_failures: usize,
    /// `correct / total * 100`.
    pub strict_accuracy: f64,
    /// `(correct + pseudo_correct) / total * 100`.
    pub adjusted_accuracy: f64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total questions: {}", self.total)?;
        writeln!(f, "Correct: {}", self.correct)?;
        writeln!(f, "Pseudo-correct: {}", self.pseudo_correct)?;
        writeln!(f, "Errors: {}", self.errors)?;
        writeln!(f, "Incorrect: {}", self.incorrect)?;
        if self.generation_failures > 0 {
            writeln!(f, "Generation failures: {}", self.generation_failures)?;
        }
        if self.judge_failures > 0 || self.judge_protocol_violations > 0 {
            writeln!(
                f,
                "Unjudged mismatches: {} transport, {} protocol",
                self.judge_failures, self.judge_protocol_violations
            )?;
        }
        if self.size_guarded > 0 {
            writeln!(f, "Too large to judge: {}", self.size_guarded)?;
        }
        if self.truth_failures > 0 {
            writeln!(f, "Ground truth failed: {}", self.truth_failures)?;
        }
        writeln!(f, "Strict accuracy: {:.2}%", self.strict_accuracy)?;
        write!(f, "Accuracy: {:.2}%", self.adjusted_accuracy)
    }
}

/// Classifies `records`, judges the mismatches and builds the report.
///
/// With no `judge`, mismatches stay incorrect and the adjusted accuracy
/// equals the strict one.
pub async fn evaluate_performance(
    records: &[EvaluationRecord],
    total_examples: usize,
    judge: Option<&SemanticJudge<'_>>,
) -> Result<Report> {
    let summary = quick_evaluate(records, total_examples)?;
    info!(
        "Strict pass: {} correct, {} errors, {} mismatches of {}",
        summary.correct, summary.errors, summary.incorrect, summary.total
    );

    let mut pseudo_correct = 0;
    let mut judge_failures = 0;
    let mut judge_protocol_violations = 0;
    let mut size_guarded = 0;
    let mut truth_failures = 0;

    if let Some(judge) = judge {
        for &idx in &summary.mismatch_indices {
            let record = &records[idx];
            match judge.judge(record).await {
                Ok(JudgeOutcome::Judged(EquivalenceVerdict::Correct)) => pseudo_correct += 1,
                Ok(JudgeOutcome::Judged(EquivalenceVerdict::Incorrect)) => {}
                Ok(JudgeOutcome::SizeGuarded) => size_guarded += 1,
                Ok(JudgeOutcome::NoReference) => {
                    warn!("Ground truth failed for {:?}; not judged", record.text);
                    truth_failures += 1;
                }
                Err(EvalError::OracleProtocol(msg)) => {
                    warn!("Judge protocol violation for {:?}: {}", record.text, msg);
                    judge_protocol_violations += 1;
                }
                Err(e) if e.is_record_scoped() => {
                    warn!("Judge failed for {:?}: {}", record.text, e);
                    judge_failures += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(Report {
        total: summary.total,
        correct: summary.correct,
        pseudo_correct,
        errors: summary.errors,
        incorrect: summary.incorrect,
        generation_failures: summary.generation_failures,
        judge_failures,
        judge_protocol_violations,
        size_guarded,
        truth_failures,
        strict_accuracy: summary.strict_accuracy(),
        adjusted_accuracy: percentage(summary.correct + pseudo_correct, summary.total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ExecutionOutcome, Value};
    use crate::eval::EquivalenceOracle;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Accepts single-value results whose numbers are within `tolerance`.
    struct ToleranceOracle {
        tolerance: f64,
        calls: AtomicUsize,
    }

    impl ToleranceOracle {
        fn new() -> Self {
            Self {
                tolerance: 1.0,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EquivalenceOracle for ToleranceOracle {
        async fn judge(
            &self,
            _question: &str,
            true_result: &ExecutionOutcome,
            generated_result: &ExecutionOutcome,
        ) -> Result<EquivalenceVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let first = |o: &ExecutionOutcome| {
                o.rows()
                    .and_then(|rows| rows.first())
                    .and_then(|row| row.first())
                    .and_then(Value::as_f64)
            };
            match (first(true_result), first(generated_result)) {
                (Some(a), Some(b)) if (a - b).abs() <= self.tolerance => {
                    Ok(EquivalenceVerdict::Correct)
                }
                _ => Ok(EquivalenceVerdict::Incorrect),
            }
        }
    }

    struct FixedOracle(fn() -> Result<EquivalenceVerdict>);

    #[async_trait]
    impl EquivalenceOracle for FixedOracle {
        async fn judge(
            &self,
            _question: &str,
            _true_result: &ExecutionOutcome,
            _generated_result: &ExecutionOutcome,
        ) -> Result<EquivalenceVerdict> {
            (self.0)()
        }
    }

    fn single(value: Value) -> ExecutionOutcome {
        ExecutionOutcome::Rows(vec![vec![value]])
    }

    fn many(n: usize) -> ExecutionOutcome {
        ExecutionOutcome::Rows((0..n as i64).map(|i| vec![Value::Int(i)]).collect())
    }

    fn record(true_result: ExecutionOutcome, generated_result: ExecutionOutcome) -> EvaluationRecord {
        EvaluationRecord {
            text: "What is the average points per game?".to_string(),
            true_query: "SELECT AVG(pts) FROM game".to_string(),
            true_result,
            generated_query: "SELECT ROUND(AVG(pts)) FROM game;".to_string(),
            generated_result,
            generation_failure: None,
        }
    }

    #[tokio::test]
    async fn test_three_correct_one_error_is_seventy_five_percent() {
        let oracle = ToleranceOracle::new();
        let judge = SemanticJudge::new(&oracle);
        let records = vec![
            record(single(Value::Int(30)), single(Value::Int(30))),
            record(many(3), many(3)),
            record(single("Spain".into()), single("Spain".into())),
            record(single(Value::Int(1)), ExecutionOutcome::failed("no such table: games")),
        ];

        let report = evaluate_performance(&records, 4, Some(&judge)).await.unwrap();

        assert_eq!(report.correct, 3);
        assert_eq!(report.errors, 1);
        assert_eq!(report.incorrect, 0);
        assert_eq!(report.pseudo_correct, 0);
        assert_eq!(report.adjusted_accuracy, 75.0);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_near_numeric_mismatch_is_pseudo_correct() {
        let oracle = ToleranceOracle::new();
        let judge = SemanticJudge::new(&oracle);
        let records = vec![
            record(single(Value::Float(29.5)), single(Value::Float(30.0))),
            record(single(Value::Int(1)), single(Value::Int(1))),
        ];

        let report = evaluate_performance(&records, 2, Some(&judge)).await.unwrap();

        assert_eq!(report.incorrect, 1);
        assert_eq!(report.pseudo_correct, 1);
        assert_eq!(report.strict_accuracy, 50.0);
        assert_eq!(report.adjusted_accuracy, 100.0);
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_oversized_mismatch_never_reaches_oracle() {
        let oracle = ToleranceOracle::new();
        let judge = SemanticJudge::new(&oracle);
        let records = vec![record(many(1200), many(1199))];

        let report = evaluate_performance(&records, 1, Some(&judge)).await.unwrap();

        assert_eq!(report.incorrect, 1);
        assert_eq!(report.pseudo_correct, 0);
        assert_eq!(report.size_guarded, 1);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_judge_called_once_per_mismatch_only() {
        let oracle = ToleranceOracle::new();
        let judge = SemanticJudge::new(&oracle);
        let records = vec![
            record(single(Value::Int(1)), single(Value::Int(1))),
            record(single(Value::Int(1)), single(Value::Int(5))),
            record(single(Value::Int(1)), ExecutionOutcome::failed("syntax error")),
            record(single(Value::Int(2)), single(Value::Float(2.5))),
            record(many(2), many(3)),
        ];

        let report = evaluate_performance(&records, 5, Some(&judge)).await.unwrap();

        assert_eq!(oracle.calls(), 3);
        assert_eq!(report.incorrect, 3);
        assert_eq!(report.pseudo_correct, 2);
        assert!(report.pseudo_correct <= report.incorrect);
        assert_eq!(
            report.total,
            report.correct + report.errors + report.incorrect + report.generation_failures
        );
    }

    #[tokio::test]
    async fn test_without_judge_adjusted_equals_strict() {
        let records = vec![
            record(single(Value::Float(29.5)), single(Value::Float(30.0))),
            record(single(Value::Int(1)), single(Value::Int(1))),
            record(single(Value::Int(1)), single(Value::Int(1))),
        ];

        let report = evaluate_performance(&records, 3, None).await.unwrap();

        assert_eq!(report.pseudo_correct, 0);
        assert_eq!(report.adjusted_accuracy, report.strict_accuracy);
    }

    #[tokio::test]
    async fn test_judge_protocol_violation_is_counted_not_credited() {
        let oracle = FixedOracle(|| Err(EvalError::protocol("Maybe")));
        let judge = SemanticJudge::new(&oracle);
        let records = vec![record(single(Value::Int(1)), single(Value::Int(2)))];

        let report = evaluate_performance(&records, 1, Some(&judge)).await.unwrap();

        assert_eq!(report.judge_protocol_violations, 1);
        assert_eq!(report.judge_failures, 0);
        assert_eq!(report.pseudo_correct, 0);
        assert_eq!(report.incorrect, 1);
    }

    #[tokio::test]
    async fn test_judge_transport_failure_is_counted() {
        let oracle = FixedOracle(|| Err(EvalError::llm("connection reset")));
        let judge = SemanticJudge::new(&oracle);
        let records = vec![record(single(Value::Int(1)), single(Value::Int(2)))];

        let report = evaluate_performance(&records, 1, Some(&judge)).await.unwrap();

        assert_eq!(report.judge_failures, 1);
        assert_eq!(report.pseudo_correct, 0);
    }

    #[tokio::test]
    async fn test_run_scoped_judge_error_aborts() {
        let oracle = FixedOracle(|| Err(EvalError::config("No API key configured.")));
        let judge = SemanticJudge::new(&oracle);
        let records = vec![record(single(Value::Int(1)), single(Value::Int(2)))];

        let result = evaluate_performance(&records, 1, Some(&judge)).await;
        assert!(matches!(result, Err(EvalError::Config(_))));
    }

    /// Accepts everything, after an optional delay.
    struct AcceptingOracle {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl AcceptingOracle {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EquivalenceOracle for AcceptingOracle {
        async fn judge(
            &self,
            _question: &str,
            _true_result: &ExecutionOutcome,
            _generated_result: &ExecutionOutcome,
        ) -> Result<EquivalenceVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(EquivalenceVerdict::Correct)
        }
    }

    #[tokio::test]
    async fn test_failed_ground_truth_earns_no_credit() {
        let oracle = AcceptingOracle::new(Duration::ZERO);
        let judge = SemanticJudge::new(&oracle);
        let records = vec![record(
            ExecutionOutcome::failed("no such column: bad"),
            single(Value::Int(1)),
        )];

        let report = evaluate_performance(&records, 1, Some(&judge)).await.unwrap();

        assert_eq!(report.incorrect, 1);
        assert_eq!(report.truth_failures, 1);
        assert_eq!(report.pseudo_correct, 0);
        assert_eq!(report.adjusted_accuracy, 0.0);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_judge_is_scoped_to_record() {
        let oracle = AcceptingOracle::new(Duration::from_secs(5));
        let judge = SemanticJudge::new(&oracle).with_timeout(Duration::from_millis(50));
        let records = vec![
            record(single(Value::Int(1)), single(Value::Int(2))),
            record(single(Value::Int(3)), single(Value::Int(3))),
        ];

        let report = evaluate_performance(&records, 2, Some(&judge)).await.unwrap();

        assert_eq!(report.judge_failures, 1);
        assert_eq!(report.pseudo_correct, 0);
        assert_eq!(report.correct, 1);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_report_display() {
        let report = Report {
            total: 4,
            correct: 3,
            pseudo_correct: 0,
            errors: 1,
            incorrect: 0,
            generation_failures: 0,
            judge_failures: 0,
            judge_protocol_violations: 0,
            size_guarded: 0,
            truth_failures: 0,
            strict_accuracy: 75.0,
            adjusted_accuracy: 75.0,
        };

        assert_eq!(
            report.to_string(),
            "Total questions: 4\nCorrect: 3\nPseudo-correct: 0\nErrors: 1\nIncorrect: 0\n\
             Strict accuracy: 75.00%\nAccuracy: 75.00%"
        );
    }
}
