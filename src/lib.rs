//! nl2sql-eval - accuracy evaluation for natural-language-to-SQL generators.
//!
//! This library exposes the pipeline modules for the binary and for
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod eval;
pub mod llm;
pub mod logging;
