//! Response parsing for generator outputs.
//!
//! The generator is asked for one line of bare SQL, but models still wrap
//! answers in markdown fences or split them across lines. This module turns
//! such a response into a single executable line.

use crate::error::{EvalError, Result};

/// Extracts a single line of SQL from a generator response.
///
/// - If the response contains a ```` ```sql ```` (or bare ```` ``` ````) code block,
///   only the first block is used.
/// - Lines are trimmed and joined with single spaces.
/// - A terminating `;` is appended when missing.
///
/// An empty response (or an empty code block) is a protocol violation.
pub fn extract_sql(response: &str) -> Result<String> {
    let body = extract_code_block(response, "sql")
        .or_else(|| extract_code_block(response, ""))
        .unwrap_or(response);

    let line = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if line.is_empty() || line == ";" {
        return Err(EvalError::protocol(format!(
            "generator returned no SQL: {:?}",
            response.trim()
        )));
    }

    if line.ends_with(';') {
        Ok(line)
    } else {
        Ok(format!("{line};"))
    }
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language specifier.
fn extract_code_block<'a>(text: &'a str, lang: &str) -> Option<&'a str> {
    let start_pattern = format!("```{}", lang);

    let start_idx = text.find(&start_pattern)?;
    let after_fence = start_idx + start_pattern.len();

    // Content starts on the line after the opening fence
    let content_start = text[after_fence..]
        .find('\n')
        .map(|i| after_fence + i + 1)?;

    // Text between ``` and the newline is a language specifier
    if lang.is_empty() && !text[after_fence..content_start - 1].trim().is_empty() {
        return None;
    }

    let end_idx = text[content_start..].find("```")?;

    Some(&text[content_start..content_start + end_idx])
}
