//! Fast classification of evaluation records.
//!
//! Pure and oracle-free: partitions records by strict result equality and
//! computes the strict accuracy.

use serde::Serialize;

use crate::error::{EvalError, Result};
use crate::eval::EvaluationRecord;

/// Outcome of the fast, strict comparison of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// Results are structurally identical.
    Correct,
    /// The generated query failed to execute.
    ExecutionError,
    /// Both ran, results differ; a candidate for semantic judging.
    Mismatch,
    /// No generated query could be obtained from the generator.
    GenerationFailed,
}

/// Classifies a single record.
///
/// Priority: generation failure, then execution failure of the generated
/// query, then strict equality. A failed generated query is an
/// `ExecutionError` even when the ground truth failed too.
pub fn classify(record: &EvaluationRecord) -> Classification {
    if record.generation_failure.is_some() {
        Classification::GenerationFailed
    } else if record.generated_result.is_failed() {
        Classification::ExecutionError
    } else if record.true_result.same_rows(&record.generated_result) {
        Classification::Correct
    } else {
        Classification::Mismatch
    }
}

/// Counts produced by [`quick_evaluate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    /// Number of examples in the run.
    pub total: usize,
    pub correct: usize,
    pub errors: usize,
    /// Number of mismatches.
    pub incorrect: usize,
    pub generation_failures: usize,
    /// Indices of mismatched records, ascending.
    pub mismatch_indices: Vec<usize>,
}

impl ClassificationSummary {
    /// `correct / total * 100`.
    pub fn strict_accuracy(&self) -> f64 {
        percentage(self.correct, self.total)
    }
}

/// Classifies every record and computes the strict counts.
///
/// `total_examples` is the size of the original dataset and must match the
/// number of records; zero examples is an error rather than a 0% score.
pub fn quick_evaluate(
    records: &[EvaluationRecord],
    total_examples: usize,
) -> Result<ClassificationSummary> {
    if total_examples == 0 {
        return Err(EvalError::EmptyDataset);
    }
    if records.len() != total_examples {
        return Err(EvalError::internal(format!(
            "{} records for {} examples",
            records.len(),
            total_examples
        )));
    }

    let mut summary = ClassificationSummary {
        total: total_examples,
        ..Default::default()
    };

    for (idx, record) in records.iter().enumerate() {
        match classify(record) {
            Classification::Correct => summary.correct += 1,
            Classification::ExecutionError => summary.errors += 1,
            Classification::GenerationFailed => summary.generation_failures += 1,
            Classification::Mismatch => {
                summary.incorrect += 1;
                summary.mismatch_indices.push(idx);
            }
        }
    }

    Ok(summary)
}

pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    part as f64 / total as f64 * 100.0
}
