//! Cloud functions for a party game built around getting to know each other
//!
//! Generates the round's get-to-know-you questions with OpenAI and turns a
//! player's Slack avatar plus their answers into a cartoon portrait with
//! Gemini, storing the result in Firebase Storage.

pub mod ai;
pub mod app;
pub mod auth;
pub mod directory;
pub mod error;
pub mod firebase;
pub mod image;
pub mod models;
pub mod portrait;
pub mod prompts;
pub mod questions;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
