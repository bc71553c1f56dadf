//! Data models and structures
//!
//! Defines the question and portrait payloads exchanged with callers, plus
//! the environment-driven configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a model-supplied label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub text: String,
    pub difficulty: Difficulty,
}

/// Number of questions requested per difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionQuota {
    pub hard: usize,
    pub medium: usize,
    pub easy: usize,
}

impl QuestionQuota {
    pub const QUESTIONS_PER_PLAYER: usize = 6;

    /// Quota for `players` players: 2 hard, 3 medium and 1 easy each.
    pub fn for_players(players: u32) -> Self {
        let n = players as usize;
        Self {
            hard: n * 2,
            medium: n * 3,
            easy: n,
        }
    }

    /// Fixed single-player quota (6 questions: 2/3/1).
    pub fn single_player() -> Self {
        Self::for_players(1)
    }

    pub fn total(&self) -> usize {
        self.hard + self.medium + self.easy
    }
}

/// Per-difficulty tally of a validated batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyCounts {
    pub hard: usize,
    pub medium: usize,
    pub easy: usize,
}

impl DifficultyCounts {
    pub fn tally(questions: &[Question]) -> Self {
        let mut counts = Self::default();
        for question in questions {
            match question.difficulty {
                Difficulty::Hard => counts.hard += 1,
                Difficulty::Medium => counts.medium += 1,
                Difficulty::Easy => counts.easy += 1,
            }
        }
        counts
    }

    pub fn matches(&self, quota: &QuestionQuota) -> bool {
        self.hard == quota.hard && self.medium == quota.medium && self.easy == quota.easy
    }
}

/// Input of the question callables. `numberOfPlayers` is optional; when it is
/// absent the fixed single-player batch is produced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
    #[serde(default)]
    pub number_of_players: Option<serde_json::Value>,
}

impl QuestionsRequest {
    /// Validated player count; `None` selects the single-player variant.
    pub fn players(&self) -> crate::Result<Option<u32>> {
        let Some(value) = &self.number_of_players else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok(None);
        }
        let players = value
            .as_u64()
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                crate::Error::InvalidArgument(format!(
                    "numberOfPlayers must be an integer >= 1, got {}",
                    value
                ))
            })?;
        Ok(Some(players))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsResponse {
    pub success: bool,
    pub questions: Vec<Question>,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_players: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortraitRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub questions_and_answers: String,
    #[serde(default)]
    pub game_document_ref: Option<String>,
    #[serde(default)]
    pub player_document_id: Option<String>,
    #[serde(default)]
    pub player_email: Option<String>,
}

impl PortraitRequest {
    pub fn validate(&self) -> crate::Result<()> {
        if self.email.trim().is_empty() || self.questions_and_answers.trim().is_empty() {
            return Err(crate::Error::InvalidArgument(
                "email and questionsAndAnswers are required".to_string(),
            ));
        }
        self.player_record()?;
        Ok(())
    }

    /// Player record to patch, when both halves of the reference were supplied.
    ///
    /// Each half must be a single Firestore document ID.
    pub fn player_record(&self) -> crate::Result<Option<PlayerRecordRef>> {
        let game = self.game_document_ref.as_deref().filter(|s| !s.is_empty());
        let player = self.player_document_id.as_deref().filter(|s| !s.is_empty());
        let (Some(game), Some(player)) = (game, player) else {
            return Ok(None);
        };
        check_document_id("gameDocumentRef", game)?;
        check_document_id("playerDocumentId", player)?;
        Ok(Some(PlayerRecordRef {
            game_id: game.to_string(),
            player_id: player.to_string(),
        }))
    }
}

const MAX_DOCUMENT_ID_BYTES: usize = 1500;

/// Firestore document ID rules: one path segment, not `.` or `..`, not
/// reserved (`__*__`), at most 1500 bytes.
fn check_document_id(field: &str, id: &str) -> crate::Result<()> {
    let reserved = id.len() >= 4 && id.starts_with("__") && id.ends_with("__");
    if id.contains('/')
        || id == "."
        || id == ".."
        || reserved
        || id.len() > MAX_DOCUMENT_ID_BYTES
    {
        return Err(crate::Error::InvalidArgument(format!(
            "{} is not a valid document ID: {:?}",
            field, id
        )));
    }
    Ok(())
}

/// `games/{game_id}/players/{player_id}` in Firestore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecordRef {
    pub game_id: String,
    pub player_id: String,
}

impl PlayerRecordRef {
    pub fn document_path(&self) -> String {
        format!("games/{}/players/{}", self.game_id, self.player_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortraitResponse {
    pub success: bool,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<bool>,
}

/// Slack user resolved from an email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub avatar_url: String,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub questions_max_tokens: u32,
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub slack_bot_token: String,
    pub storage_bucket: String,
    pub storage_endpoint: String,
    pub storage_public_base_url: String,
    pub storage_hmac_access_key: Option<String>,
    pub storage_hmac_secret: Option<String>,
    pub firebase_project_id: String,
    pub google_credentials_path: Option<String>,
    pub portrait_logo_url: Option<String>,
    pub dry_run: bool,
}

fn required_env(name: &str) -> crate::Result<String> {
    std::env::var(name).map_err(|_| crate::Error::Config(format!("{} not set", name)))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let dry_run = optional_env("DRY_RUN")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let questions_max_tokens = match optional_env("QUESTIONS_MAX_TOKENS") {
            Some(raw) => raw.parse().map_err(|_| {
                crate::Error::Config(format!("QUESTIONS_MAX_TOKENS is not a number: {}", raw))
            })?,
            None => 4000,
        };

        let storage_hmac_access_key = optional_env("STORAGE_HMAC_ACCESS_KEY");
        let storage_hmac_secret = optional_env("STORAGE_HMAC_SECRET");
        if !dry_run && (storage_hmac_access_key.is_none() || storage_hmac_secret.is_none()) {
            return Err(crate::Error::Config(
                "STORAGE_HMAC_ACCESS_KEY and STORAGE_HMAC_SECRET must be set unless DRY_RUN is enabled"
                    .to_string(),
            ));
        }

        Ok(Self {
            openai_api_key: required_env("OPENAI_API_KEY")?,
            openai_model: optional_env("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            questions_max_tokens,
            gemini_api_key: required_env("GEMINI_API_KEY")?,
            gemini_image_model: optional_env("GEMINI_IMAGE_MODEL")
                .unwrap_or_else(|| "gemini-3-pro-image-preview".to_string()),
            slack_bot_token: required_env("SLACK_BOT_TOKEN")?,
            storage_bucket: required_env("STORAGE_BUCKET")?,
            storage_endpoint: optional_env("STORAGE_ENDPOINT")
                .unwrap_or_else(|| "https://storage.googleapis.com".to_string()),
            storage_public_base_url: optional_env("STORAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|| "https://storage.googleapis.com".to_string()),
            storage_hmac_access_key,
            storage_hmac_secret,
            firebase_project_id: required_env("FIREBASE_PROJECT_ID")?,
            google_credentials_path: optional_env("GOOGLE_APPLICATION_CREDENTIALS"),
            portrait_logo_url: optional_env("PORTRAIT_LOGO_URL"),
            dry_run,
        })
    }
}
