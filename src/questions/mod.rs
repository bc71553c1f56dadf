//! Question generation: prompt construction, the token budget, and the
//! call into the chat model.

pub mod extract;

pub use extract::extract_questions;

use crate::ai::{ChatCompletion, ChatPrompt, ChatService};
use crate::models::{DifficultyCounts, Question, QuestionQuota};
use crate::{prompts, Error, Result};
use std::time::Instant;
use tracing::{debug, error, info, warn};

const ESTIMATED_TOKENS_PER_QUESTION: u32 = 100;
const TOKEN_SAFETY_MULTIPLIER: u32 = 2;
pub const DEFAULT_MAX_TOKENS_CAP: u32 = 4000;
const TEMPERATURE: f32 = 1.6;

// gpt-4o-mini list price, USD per million tokens
const PROMPT_COST_PER_MILLION: f64 = 0.15;
const COMPLETION_COST_PER_MILLION: f64 = 0.60;

/// Completion budget for `total` questions, capped at `cap`.
pub fn token_budget(total: usize, cap: u32) -> u32 {
    let total = u32::try_from(total).unwrap_or(u32::MAX);
    total
        .saturating_mul(ESTIMATED_TOKENS_PER_QUESTION)
        .saturating_mul(TOKEN_SAFETY_MULTIPLIER)
        .min(cap)
}

/// Render the chat prompt for a quota.
pub fn build_prompt(quota: &QuestionQuota, players: Option<u32>, max_tokens: u32) -> ChatPrompt {
    let players_label = match players.unwrap_or(1) {
        1 => "1 player".to_string(),
        n => format!("{} players", n),
    };

    let user = prompts::render(
        prompts::QUESTIONS_USER,
        &[
            ("total", &quota.total().to_string()),
            ("hard", &quota.hard.to_string()),
            ("medium", &quota.medium.to_string()),
            ("easy", &quota.easy.to_string()),
            ("players_label", &players_label),
        ],
    );

    ChatPrompt {
        system: prompts::QUESTIONS_SYSTEM.trim().to_string(),
        user,
        max_tokens,
        temperature: Some(TEMPERATURE),
    }
}

fn log_usage(completion: &ChatCompletion, total: usize) {
    match completion.usage {
        Some(usage) => {
            let per_question = usage.completion_tokens as f64 / total.max(1) as f64;
            let cost = (usage.prompt_tokens as f64 * PROMPT_COST_PER_MILLION
                + usage.completion_tokens as f64 * COMPLETION_COST_PER_MILLION)
                / 1_000_000.0;
            info!(
                "Token usage: prompt={}, completion={}, total={} ({:.1} tokens per question, ~${:.4})",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens, per_question, cost
            );
        }
        None => debug!("Token usage: N/A"),
    }
}

/// Generate exactly `quota.total()` questions through `chat`.
///
/// `players` only affects prompt wording; `quota` decides the counts.
pub async fn generate_questions(
    chat: &dyn ChatService,
    quota: &QuestionQuota,
    players: Option<u32>,
    max_tokens_cap: u32,
) -> Result<Vec<Question>> {
    let started = Instant::now();
    let total = quota.total();
    let max_tokens = token_budget(total, max_tokens_cap);

    info!(
        "Generating {} questions ({} hard, {} medium, {} easy), max_tokens={}",
        total, quota.hard, quota.medium, quota.easy, max_tokens
    );

    let prompt = build_prompt(quota, players, max_tokens);
    let api_started = Instant::now();
    let completion = chat.complete(&prompt).await?;
    let api_duration = api_started.elapsed();

    info!(
        "OpenAI call completed in {}ms (response length {} chars, finish reason {:?})",
        api_duration.as_millis(),
        completion.content.len(),
        completion.finish_reason
    );
    log_usage(&completion, total);

    if completion.hit_length_limit() {
        let completion_tokens = completion.usage.map(|u| u.completion_tokens);
        error!(
            "OpenAI response was truncated due to max_tokens limit (length {}, completion tokens {:?}, max {})",
            completion.content.len(),
            completion_tokens,
            max_tokens
        );
        return Err(Error::TruncatedCompletion {
            max_tokens,
            completion_tokens,
            total_questions: total,
        });
    }

    let trimmed = completion.content.trim_end();
    if !trimmed.ends_with(']') && !trimmed.ends_with('}') && !trimmed.ends_with("```") {
        warn!("Response may be truncated - does not end with a JSON closing bracket");
    }

    let questions = extract_questions(&completion.content, quota)?;
    let counts = DifficultyCounts::tally(&questions);

    info!(
        "Generated {} questions ({} hard, {} medium, {} easy) in {}ms (OpenAI {}ms)",
        questions.len(),
        counts.hard,
        counts.medium,
        counts.easy,
        started.elapsed().as_millis(),
        api_duration.as_millis()
    );

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockChatClient, TokenUsage};
    use crate::models::Difficulty;

    fn batch(players: usize) -> String {
        let mut items = Vec::new();
        for (label, per_player) in [("hard", 2), ("medium", 3), ("easy", 1)] {
            for i in 0..players * per_player {
                items.push(serde_json::json!({
                    "text": format!("{} question {}?", label, i),
                    "difficulty": label
                }));
            }
        }
        serde_json::Value::Array(items).to_string()
    }

    #[test]
    fn test_token_budget_scales_and_caps() {
        assert_eq!(token_budget(6, DEFAULT_MAX_TOKENS_CAP), 1200);
        assert_eq!(token_budget(18, DEFAULT_MAX_TOKENS_CAP), 3600);
        assert_eq!(token_budget(24, DEFAULT_MAX_TOKENS_CAP), 4000);
        assert_eq!(token_budget(600, 8000), 8000);
    }

    #[test]
    fn test_prompt_embeds_counts() {
        let quota = QuestionQuota::for_players(3);
        let prompt = build_prompt(&quota, Some(3), 3600);

        assert!(prompt.user.contains("Generate exactly 18 unique questions for 3 players"));
        assert!(prompt.user.contains("HARD (6 questions)"));
        assert!(prompt.user.contains("MEDIUM (9 questions)"));
        assert!(prompt.user.contains("EASY (3 questions)"));
        assert!(prompt.user.contains("(6 hard, 9 medium, 3 easy)"));
        assert!(!prompt.user.contains("{{"));
        assert!(prompt.system.contains("valid JSON"));
        assert_eq!(prompt.max_tokens, 3600);
        assert_eq!(prompt.temperature, Some(1.6));
    }

    #[test]
    fn test_single_player_prompt_wording() {
        let prompt = build_prompt(&QuestionQuota::single_player(), None, 1200);
        assert!(prompt.user.contains("Generate exactly 6 unique questions for 1 player "));
    }

    #[tokio::test]
    async fn test_full_batches_for_several_player_counts() {
        for players in 1..=4u32 {
            let chat = MockChatClient::new().with_response(&batch(players as usize));
            let quota = QuestionQuota::for_players(players);

            let questions = generate_questions(&chat, &quota, Some(players), DEFAULT_MAX_TOKENS_CAP)
                .await
                .unwrap();

            assert_eq!(questions.len(), 6 * players as usize);
            let counts = DifficultyCounts::tally(&questions);
            assert_eq!(counts.hard, 2 * players as usize);
            assert_eq!(counts.medium, 3 * players as usize);
            assert_eq!(counts.easy, players as usize);
            assert_eq!(
                chat.get_prompts()[0].max_tokens,
                token_budget(quota.total(), DEFAULT_MAX_TOKENS_CAP)
            );
        }
    }

    #[tokio::test]
    async fn test_length_finish_reason_is_truncation_error() {
        let chat = MockChatClient::new().with_completion(ChatCompletion {
            content: r#"[{"text": "Favorite drink?", "difficulty": "hard"}, {"text": "Co"#
                .to_string(),
            finish_reason: Some("length".to_string()),
            usage: Some(TokenUsage {
                prompt_tokens: 400,
                completion_tokens: 1200,
                total_tokens: 1600,
            }),
        });

        let err = generate_questions(&chat, &QuestionQuota::single_player(), None, DEFAULT_MAX_TOKENS_CAP)
            .await
            .unwrap_err();

        match err {
            Error::TruncatedCompletion {
                max_tokens,
                completion_tokens,
                total_questions,
            } => {
                assert_eq!(max_tokens, 1200);
                assert_eq!(completion_tokens, Some(1200));
                assert_eq!(total_questions, 6);
            }
            other => panic!("expected truncation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_length_finish_reason_wins_over_valid_json() {
        let chat = MockChatClient::new().with_completion(ChatCompletion {
            content: batch(1),
            finish_reason: Some("length".to_string()),
            usage: None,
        });

        let err = generate_questions(&chat, &QuestionQuota::single_player(), None, DEFAULT_MAX_TOKENS_CAP)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TruncatedCompletion { .. }));
    }

    #[tokio::test]
    async fn test_uppercase_difficulties_are_normalised() {
        let raw = r#"[{"text":"Favorite drink?","difficulty":"HARD"},{"text":"Tabs or spaces?","difficulty":"HARD"},{"text":"Favorite hobby?","difficulty":"MEDIUM"},{"text":"Weekend plans?","difficulty":"medium"},{"text":"Favorite band?","difficulty":"Medium"},{"text":"Hometown?","difficulty":"easy"}]"#;
        let chat = MockChatClient::new().with_response(raw);

        let questions = generate_questions(&chat, &QuestionQuota::single_player(), None, DEFAULT_MAX_TOKENS_CAP)
            .await
            .unwrap();

        assert_eq!(questions[0].difficulty, Difficulty::Hard);
        assert_eq!(
            DifficultyCounts::tally(&questions),
            DifficultyCounts {
                hard: 2,
                medium: 3,
                easy: 1
            }
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let chat = MockChatClient::new().with_failure("OpenAI API request failed: 503");
        let err = generate_questions(&chat, &QuestionQuota::single_player(), None, DEFAULT_MAX_TOKENS_CAP)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
