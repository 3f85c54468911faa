//! Database schema types for nl2sql-eval.
//!
//! The generator only needs table names and their ordered column names, so
//! that is all the schema records.

use serde::{Deserialize, Serialize};

/// The schema of a database: every user table with its columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    /// All tables in the schema, ordered by name.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns true if the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    ///
    /// One block per table, columns listed in declaration order.
    pub fn format_for_llm(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(|table| {
                let column_lines = table
                    .columns
                    .iter()
                    .map(|column| format!("  - {column}\n"))
                    .collect::<String>();
                format!("Table: {}\n{}\n", table.name, column_lines)
            })
            .collect::<String>();

        format!("Database Schema:\n\n{tables_text}")
    }
}

/// A database table and its column names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column names in declaration order.
    pub columns: Vec<String>,
}

impl Table {
    /// Creates a new table with the given name and columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}
