//! Error handling and custom error types
//!
//! Provides unified error handling across the functions using thiserror.
//! Callers only ever see two kinds, see [`Error::is_invalid_argument`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error(
        "Failed to parse questions from OpenAI response: {message} \
         (length {length}, starts with {head:?}, ends with {tail:?})"
    )]
    QuestionParse {
        message: String,
        length: usize,
        head: String,
        tail: String,
    },

    #[error("Insufficient questions from OpenAI: expected {expected}, got {actual}")]
    InsufficientQuestions { expected: usize, actual: usize },

    #[error(
        "Response was truncated at max_tokens={max_tokens} \
         (completion tokens used: {completion_tokens:?}); {total_questions} questions may require more tokens"
    )]
    TruncatedCompletion {
        max_tokens: u32,
        completion_tokens: Option<u32>,
        total_questions: usize,
    },

    #[error("Invalid question at index {index}: {reason}")]
    InvalidQuestion { index: usize, reason: String },

    #[error("Slack API error: {0}")]
    Directory(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Firestore error: {0}")]
    Firestore(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Whether the failure was caused by the request itself rather than a
    /// downstream service.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
