//! End-to-end pipeline tests.
//!
//! Runs the full evaluation against a seeded SQLite file with mock oracles.

use async_trait::async_trait;
use nl2sql_eval::db::{ExecutionOutcome, SqliteExecutor, Value};
use nl2sql_eval::error::{EvalError, Result};
use nl2sql_eval::eval::{
    evaluate, load_dataset, EquivalenceOracle, EquivalenceVerdict, EvalContext, EvalSettings,
    LabeledExample, LlmEquivalenceOracle, LlmQueryGenerator,
};
use nl2sql_eval::llm::MockLlmClient;
use pretty_assertions::assert_eq;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Creates a database with three teams, one season average and 1200 games.
async fn seed_database(dir: &TempDir) -> String {
    let path = dir.path().join("nba.sqlite");
    let mut conn = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();

    sqlx::raw_sql(
        r#"
        CREATE TABLE team (id INTEGER PRIMARY KEY, full_name TEXT NOT NULL, city TEXT);
        CREATE TABLE season_avg (team_id INTEGER, pts REAL);
        CREATE TABLE game (game_id INTEGER PRIMARY KEY, team_id_home INTEGER, pts_home REAL);
        INSERT INTO team VALUES
            (1, 'Boston Celtics', 'Boston'),
            (2, 'Los Angeles Lakers', 'Los Angeles'),
            (3, 'Chicago Bulls', 'Chicago');
        INSERT INTO season_avg VALUES (1, 29.5);
        WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 1200)
        INSERT INTO game SELECT n, 1 + n % 3, 90 + n % 30 FROM seq;
        "#,
    )
    .execute(&mut conn)
    .await
    .unwrap();
    conn.close().await.unwrap();

    path.to_string_lossy().into_owned()
}

/// Accepts results whose first values are numbers within `tolerance`.
#[derive(Clone)]
struct ToleranceOracle {
    tolerance: f64,
    calls: Arc<AtomicUsize>,
}

impl ToleranceOracle {
    fn new() -> Self {
        Self {
            tolerance: 1.0,
            calls: Arc::new(AtomicUsize::new(0)),
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
            (Some(a), Some(b)) if (a - b).abs() <= self.tolerance => Ok(EquivalenceVerdict::Correct),
            _ => Ok(EquivalenceVerdict::Incorrect),
        }
    }
}

/// A generator mock keyed on phrases that only appear in the questions.
fn generator_client() -> MockLlmClient {
    MockLlmClient::new()
        .with_response("teams exist", "SELECT COUNT(id) FROM team;")
        .with_response("names of the listed teams", "```sql\nSELECT full_name\nFROM team\nORDER BY id\n```")
        .with_response("celtics season average", "SELECT ROUND(pts) FROM season_avg WHERE team_id = 1;")
        .with_response("every game id", "SELECT game_id, team_id_home FROM game;")
        .with_response("home city", "SELECT hometown FROM team;")
        .with_response("chatty", "")
}

fn examples() -> Vec<LabeledExample> {
    vec![
        LabeledExample::new("How many teams exist?", "SELECT COUNT(*) FROM team"),
        LabeledExample::new(
            "What are the names of the listed teams?",
            "SELECT full_name FROM team ORDER BY id",
        ),
        LabeledExample::new(
            "What is the Celtics season average?",
            "SELECT pts FROM season_avg WHERE team_id = 1",
        ),
        LabeledExample::new("List every game id", "SELECT game_id FROM game"),
        LabeledExample::new("What is each team's home city?", "SELECT city FROM team"),
        LabeledExample::new("Be chatty about the Bulls", "SELECT * FROM team WHERE id = 3"),
    ]
}

#[tokio::test]
async fn test_full_pipeline_buckets_every_record() {
    let dir = TempDir::new().unwrap();
    let db = seed_database(&dir).await;
    let oracle = ToleranceOracle::new();
    let ctx = EvalContext::new(
        Box::new(SqliteExecutor::new()),
        Box::new(LlmQueryGenerator::new(Box::new(generator_client()))),
        Box::new(oracle.clone()),
    );

    let report = evaluate(&ctx, &db, &examples()).await.unwrap();

    assert_eq!(report.total, 6);
    assert_eq!(report.correct, 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.generation_failures, 1);
    assert_eq!(report.incorrect, 2);
    assert_eq!(report.pseudo_correct, 1);
    assert_eq!(report.size_guarded, 1);
    assert_eq!(report.judge_failures, 0);
    assert_eq!(report.adjusted_accuracy, 50.0);
    assert!(report.strict_accuracy < report.adjusted_accuracy);
    // only the near-numeric mismatch reaches the oracle
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_llm_judge_path() {
    let dir = TempDir::new().unwrap();
    let db = seed_database(&dir).await;
    let judge_client = MockLlmClient::new()
        .with_response("true_query_result: [(29.5,)]", "Correct.")
        .with_default_response("Incorrect");
    let judge_calls = judge_client.clone();
    let ctx = EvalContext::new(
        Box::new(SqliteExecutor::new()),
        Box::new(LlmQueryGenerator::new(Box::new(generator_client()))),
        Box::new(LlmEquivalenceOracle::new(Box::new(judge_client))),
    );

    let report = evaluate(&ctx, &db, &examples()).await.unwrap();

    assert_eq!(report.pseudo_correct, 1);
    assert_eq!(judge_calls.call_count(), 1);
}

#[tokio::test]
async fn test_strict_only_never_judges() {
    let dir = TempDir::new().unwrap();
    let db = seed_database(&dir).await;
    let oracle = ToleranceOracle::new();
    let ctx = EvalContext::new(
        Box::new(SqliteExecutor::new()),
        Box::new(LlmQueryGenerator::new(Box::new(generator_client()))),
        Box::new(oracle.clone()),
    )
    .with_settings(EvalSettings {
        skip_judge: true,
        ..Default::default()
    });

    let report = evaluate(&ctx, &db, &examples()).await.unwrap();

    assert_eq!(report.pseudo_correct, 0);
    assert_eq!(report.adjusted_accuracy, report.strict_accuracy);
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_generator_outage_does_not_abort_run() {
    let dir = TempDir::new().unwrap();
    let db = seed_database(&dir).await;
    let ctx = EvalContext::new(
        Box::new(SqliteExecutor::new()),
        Box::new(LlmQueryGenerator::new(Box::new(
            MockLlmClient::new().failing("503 Service Unavailable"),
        ))),
        Box::new(ToleranceOracle::new()),
    );

    let report = evaluate(&ctx, &db, &examples()).await.unwrap();

    assert_eq!(report.generation_failures, 6);
    assert_eq!(report.errors, 0);
    assert_eq!(report.adjusted_accuracy, 0.0);
}

#[tokio::test]
async fn test_dataset_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = seed_database(&dir).await;
    let dataset_path = dir.path().join("questions.json");
    let mut file = std::fs::File::create(&dataset_path).unwrap();
    write!(
        file,
        r#"[{{"natural_language": "How many teams exist?", "sql": "SELECT COUNT(*) FROM team;", "type": "count"}}]"#
    )
    .unwrap();

    let examples = load_dataset(&dataset_path).unwrap();
    let ctx = EvalContext::new(
        Box::new(SqliteExecutor::new()),
        Box::new(LlmQueryGenerator::new(Box::new(generator_client()))),
        Box::new(ToleranceOracle::new()),
    );

    let report = evaluate(&ctx, &db, &examples).await.unwrap();
    assert_eq!(report.correct, 1);
    assert_eq!(report.adjusted_accuracy, 100.0);
}

#[tokio::test]
async fn test_empty_dataset_is_error() {
    let ctx = EvalContext::new(
        Box::new(SqliteExecutor::new()),
        Box::new(LlmQueryGenerator::new(Box::new(MockLlmClient::new()))),
        Box::new(ToleranceOracle::new()),
    );

    let result = evaluate(&ctx, "unused.sqlite", &[]).await;
    assert!(matches!(result, Err(EvalError::EmptyDataset)));
}

#[tokio::test]
async fn test_missing_database_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.sqlite");
    let ctx = EvalContext::new(
        Box::new(SqliteExecutor::new()),
        Box::new(LlmQueryGenerator::new(Box::new(generator_client()))),
        Box::new(ToleranceOracle::new()),
    );

    let result = evaluate(&ctx, &missing.to_string_lossy(), &examples()).await;
    assert!(matches!(result, Err(EvalError::Database(_))));
}
