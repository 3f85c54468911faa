//! Ground-truth datasets.
//!
//! A dataset is a JSON array of `{ "natural_language": ..., "sql": ... }`
//! objects. Extra fields (such as a `"type"` tag) are ignored.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EvalError, Result};

/// One question paired with its hand-written SQL answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// The question in natural language.
    pub natural_language: String,
    /// Trusted ground-truth SQL.
    pub sql: String,
}

impl LabeledExample {
    /// Creates a new labeled example.
    pub fn new(natural_language: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            natural_language: natural_language.into(),
            sql: sql.into(),
        }
    }
}

/// Loads a dataset from a JSON file.
pub fn load_dataset(path: &Path) -> Result<Vec<LabeledExample>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        EvalError::dataset(format!("Failed to read {}: {e}", path.display()))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| EvalError::dataset(format!("Invalid dataset {}: {e}", path.display())))
}

/// Parses a dataset from a JSON string.
pub fn parse_dataset(content: &str) -> Result<Vec<LabeledExample>> {
    serde_json::from_str(content).map_err(|e| EvalError::dataset(format!("Invalid dataset: {e}")))
}
