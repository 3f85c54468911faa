//! Query result types for nl2sql-eval.
//!
//! Defines the structures used to represent the outcome of executing a query.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of data from a query result, in select-list order.
pub type Row = Vec<Value>;

/// A single value from a SQLite result set, tagged by storage class.
///
/// Equality is strict: `Int(30)` and `Float(30.0)` are different values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Signed integer.
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value.
    Text(String),

    /// Binary data.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the numeric value, if this is an integer or a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Literal-style rendering used when results are shown to an oracle.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            // Debug keeps the trailing ".0" so floats stay recognisable as floats
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

/// Outcome of running one query against a database.
///
/// Produced once per execution and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// The query ran; rows are in the order the database returned them.
    Rows(Vec<Row>),
    /// The query could not be executed. The diagnostic is for logs only.
    ExecutionFailed { diagnostic: String },
}

impl ExecutionOutcome {
    /// Creates a failed outcome with the given diagnostic.
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            diagnostic: diagnostic.into(),
        }
    }

    /// Returns true if the query failed to execute.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::ExecutionFailed { .. })
    }

    /// Returns the rows, if the query executed.
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::ExecutionFailed { .. } => None,
        }
    }

    /// Number of rows produced. A failed execution has size zero.
    pub fn row_count(&self) -> usize {
        self.rows().map_or(0, <[Row]>::len)
    }

    /// Strict structural comparison: same length, same rows in the same
    /// order, same values and types. Failed outcomes never match anything.
    pub fn same_rows(&self, other: &ExecutionOutcome) -> bool {
        match (self, other) {
            (Self::Rows(a), Self::Rows(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    /// Renders rows as a list of tuples, e.g. `[(29.5,), ('Spain', 3)]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = match self {
            Self::Rows(rows) => rows,
            Self::ExecutionFailed { .. } => return write!(f, "<execution failed>"),
        };

        write!(f, "[")?;
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "(")?;
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{value}")?;
            }
            if row.len() == 1 {
                write!(f, ",")?;
            }
            write!(f, ")")?;
        }
        write!(f, "]")
    }
}
