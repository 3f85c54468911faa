//! Prompt construction for the two oracles.
//!
//! The generator prompt carries the full schema plus one worked example per
//! query shape (aggregation, counting, ranking, filtering). The judge prompt
//! carries the question and both result sets.

use crate::db::{ExecutionOutcome, Schema};
use crate::llm::types::Message;

/// System prompt template for SQL generation.
const GENERATION_SYSTEM_TEMPLATE: &str = "You're an experienced database analyst. Your job is to convert user questions to SQL queries for a SQLite database.

{schema}";

/// Instructions for the equivalence judge.
const JUDGE_INSTRUCTIONS_TEMPLATE: &str = "Analyze whether the two answers to the question are equivalent. \
When comparing generated_query_result against true_query_result, consider them equivalent if generated_query_result \
contains all the essential entities from true_query_result, even if presented with additional information or in a \
different structure. If two numerical results are within {tolerance} of each other, consider that correct. \
Reply only with Correct or Incorrect";

/// A worked example used to steer the generator's output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FewShotExample {
    /// Query shape, e.g. "Aggregation".
    pub kind: &'static str,
    /// The natural-language question.
    pub natural_language: &'static str,
    /// The SQL answering it.
    pub sql: &'static str,
}

/// One example per supported query shape.
pub const FEW_SHOT_EXAMPLES: [FewShotExample; 4] = [
    FewShotExample {
        kind: "Count",
        natural_language: "How many games went to overtime?",
        sql: "SELECT COUNT(*) as ot_games FROM line_score WHERE pts_ot1_home IS NOT NULL LIMIT 1",
    },
    FewShotExample {
        kind: "Aggregation",
        natural_language: "What's the average points per game?",
        sql: "SELECT ROUND(AVG(pts_home + pts_away) / 2, 2) as avg_points FROM game LIMIT 1",
    },
    FewShotExample {
        kind: "Ranking",
        natural_language: "Which team has the most home games?",
        sql: "SELECT t.full_name FROM game g JOIN team t ON g.team_id_home = t.id GROUP BY t.id, t.full_name ORDER BY COUNT(*) DESC LIMIT 1",
    },
    FewShotExample {
        kind: "Filtering",
        natural_language: "List all players from Spain",
        sql: "SELECT first_name, last_name FROM common_player_info WHERE country = 'Spain'",
    },
];

/// Builds the message list asking the generator to translate `question`.
pub fn build_generation_messages(schema: &Schema, question: &str) -> Vec<Message> {
    let system = GENERATION_SYSTEM_TEMPLATE.replace("{schema}", &schema.format_for_llm());

    let mut user = format!(
        "Convert this question to SQL: {question}. Provide just the SQL statement text in one line, \
         and nothing else. Don't forget to end queries with ;"
    );
    for example in &FEW_SHOT_EXAMPLES {
        user.push_str(&format!(
            "\n\n{} query example:\nQuestion: {}\nSQL: {}",
            example.kind, example.natural_language, example.sql
        ));
    }

    vec![Message::system(system), Message::user(user)]
}

/// Builds the message list asking the judge whether two results are equivalent.
pub fn build_judge_messages(
    question: &str,
    true_result: &ExecutionOutcome,
    generated_result: &ExecutionOutcome,
    numeric_tolerance: f64,
) -> Vec<Message> {
    let instructions =
        JUDGE_INSTRUCTIONS_TEMPLATE.replace("{tolerance}", &format!("{numeric_tolerance:?}"));

    vec![Message::user(format!(
        "{instructions}\n\nQuestion: {question}\n\ntrue_query_result: {true_result}\n\ngenerated_query_result: {generated_result}"
    ))]
}
