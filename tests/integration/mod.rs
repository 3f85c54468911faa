//! Integration tests for nl2sql-eval.

pub mod pipeline_test;
