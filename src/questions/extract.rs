//! Recovery of the question array from free-form model text.
//!
//! The chat model is asked for bare JSON but regularly wraps it in Markdown
//! fences, prefixes commentary, or stops mid-array. Recovery is limited to
//! fence stripping, skipping leading prose, and cutting at the last balanced
//! bracket; nothing is synthesised.

use crate::models::{Difficulty, DifficultyCounts, Question, QuestionQuota};
use crate::{Error, Result};
use serde_json::Value;
use tracing::{debug, error, warn};

const LOG_EXCERPT_CHARS: usize = 1000;
const ERROR_EXCERPT_CHARS: usize = 200;

/// Remove Markdown code-fence markers (```` ```json ```` and ```` ``` ````).
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Byte offset just past the last `]` that brings array depth back to zero.
///
/// Brackets inside JSON string literals are not counted.
pub fn last_balanced_end(text: &str) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_end = None;

    for (offset, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    last_end = Some(offset + 1);
                }
            }
            _ => {}
        }
    }

    last_end
}

fn head(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

fn tail(text: &str, chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(chars)).collect()
}

fn parse_error(raw: &str, message: String) -> Error {
    error!(
        "JSON parsing failed. Content length: {}\nFirst {} chars: {}\nLast {} chars: {}",
        raw.len(),
        LOG_EXCERPT_CHARS,
        head(raw, LOG_EXCERPT_CHARS),
        LOG_EXCERPT_CHARS,
        tail(raw, LOG_EXCERPT_CHARS)
    );
    Error::QuestionParse {
        message,
        length: raw.len(),
        head: head(raw, ERROR_EXCERPT_CHARS),
        tail: tail(raw, ERROR_EXCERPT_CHARS),
    }
}

/// Parse the JSON value embedded in a chat reply.
pub fn parse_embedded_json(raw: &str) -> Result<Value> {
    let cleaned = strip_code_fences(raw);

    let candidate = match cleaned.find('[') {
        Some(0) | None => cleaned.as_str(),
        Some(position) => {
            warn!(
                "Found text before JSON array at position {}, attempting to extract JSON",
                position
            );
            &cleaned[position..]
        }
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Ok(value),
        Err(full_error) => match last_balanced_end(candidate) {
            Some(end) if end < candidate.len() => {
                warn!(
                    "Response does not parse as a whole, truncating at position {}",
                    end
                );
                serde_json::from_str::<Value>(&candidate[..end])
                    .map_err(|e| parse_error(raw, e.to_string()))
            }
            _ => Err(parse_error(raw, full_error.to_string())),
        },
    }
}

fn required_string<'a>(item: &'a Value, field: &str, index: usize) -> Result<&'a str> {
    item.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::InvalidQuestion {
            index,
            reason: format!("missing required field '{}'", field),
        })
}

/// Shape-check a parsed value against the requested quota.
///
/// Short batches are fatal, long ones are cut to size. The difficulty mix is
/// only compared against the quota for logging.
pub fn validate_questions(value: Value, quota: &QuestionQuota) -> Result<Vec<Question>> {
    let total = quota.total();

    let mut items = match value {
        Value::Array(items) => items,
        other => {
            let rendered = other.to_string();
            error!("OpenAI response is not an array: {}", rendered);
            return Err(Error::QuestionParse {
                message: "response is not an array".to_string(),
                length: rendered.len(),
                head: head(&rendered, ERROR_EXCERPT_CHARS),
                tail: tail(&rendered, ERROR_EXCERPT_CHARS),
            });
        }
    };

    if items.len() < total {
        error!("Expected {} questions but got {}", total, items.len());
        return Err(Error::InsufficientQuestions {
            expected: total,
            actual: items.len(),
        });
    }

    if items.len() > total {
        warn!(
            "OpenAI returned {} questions, but only {} were requested. Trimming to requested count.",
            items.len(),
            total
        );
        items.truncate(total);
    }

    let questions = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let text = required_string(item, "text", index)?;
            let label = required_string(item, "difficulty", index)?;
            let difficulty = Difficulty::from_label(label).ok_or_else(|| Error::InvalidQuestion {
                index,
                reason: format!("unknown difficulty '{}'", label),
            })?;
            Ok(Question {
                text: text.to_string(),
                difficulty,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let counts = DifficultyCounts::tally(&questions);
    if counts.matches(quota) {
        debug!(
            "Difficulty mix matches quota ({} hard, {} medium, {} easy)",
            counts.hard, counts.medium, counts.easy
        );
    } else {
        warn!(
            "Difficulty mix differs from quota: got {} hard, {} medium, {} easy; expected {} hard, {} medium, {} easy",
            counts.hard, counts.medium, counts.easy, quota.hard, quota.medium, quota.easy
        );
    }

    Ok(questions)
}

/// Parse and validate a raw chat reply into exactly `quota.total()` questions.
pub fn extract_questions(raw: &str, quota: &QuestionQuota) -> Result<Vec<Question>> {
    let value = parse_embedded_json(raw)?;
    validate_questions(value, quota)
}
