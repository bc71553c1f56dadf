//! Application wiring: builds the service graph from configuration and
//! exposes one method per function.

use crate::ai::{ChatService, GeminiImageClient, ImageGenerationService, OpenAiChatClient};
use crate::auth::{
    ChainedVerifier, FirebaseIdTokenVerifier, GoogleTokenInfoVerifier, TokenVerifier,
    VerifiedToken,
};
use crate::directory::{DirectoryService, SlackClient};
use crate::firebase::{FirebaseAdmin, FirestoreClient, MockRecordStore, RecordStore};
use crate::image::{ImageProcessor, ImageService};
use crate::models::{
    Config, PortraitRequest, PortraitResponse, QuestionQuota, QuestionsRequest, QuestionsResponse,
};
use crate::portrait::{pick_style, PortraitPipeline};
use crate::questions::{generate_questions, DEFAULT_MAX_TOKENS_CAP};
use crate::storage::{MockStorageClient, StorageClient, StorageService};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Owns every external service the functions talk to.
pub struct App {
    chat: Box<dyn ChatService>,
    image_gen: Box<dyn ImageGenerationService>,
    directory: Box<dyn DirectoryService>,
    image: Box<dyn ImageService>,
    storage: Box<dyn StorageService>,
    records: Box<dyn RecordStore>,
    verifier: Box<dyn TokenVerifier>,
    settings: AppSettings,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub chat: Box<dyn ChatService>,
    pub image_gen: Box<dyn ImageGenerationService>,
    pub directory: Box<dyn DirectoryService>,
    pub image: Box<dyn ImageService>,
    pub storage: Box<dyn StorageService>,
    pub records: Box<dyn RecordStore>,
    pub verifier: Box<dyn TokenVerifier>,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub questions_max_tokens: u32,
    pub portrait_logo_url: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            questions_max_tokens: DEFAULT_MAX_TOKENS_CAP,
            portrait_logo_url: None,
        }
    }
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices, settings: AppSettings) -> Self {
        Self {
            chat: services.chat,
            image_gen: services.image_gen,
            directory: services.directory,
            image: services.image,
            storage: services.storage,
            records: services.records,
            verifier: services.verifier,
            settings,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub async fn new() -> Result<Self> {
        let config = Config::from_env()?;
        Self::from_config(&config).await
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!("Chat provider: OpenAI (model: {})", config.openai_model);
        let chat = Box::new(OpenAiChatClient::new_with_client(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            http_client.clone(),
        ));

        info!("Image provider: Gemini (model: {})", config.gemini_image_model);
        let image_gen = Box::new(GeminiImageClient::new_with_client(
            config.gemini_api_key.clone(),
            config.gemini_image_model.clone(),
            http_client.clone(),
        ));

        let directory = Box::new(SlackClient::new_with_client(
            config.slack_bot_token.clone(),
            http_client,
        ));

        let admin = Arc::new(FirebaseAdmin::new(
            config.firebase_project_id.clone(),
            config.google_credentials_path.clone(),
        ));

        let (storage, records): (Box<dyn StorageService>, Box<dyn RecordStore>) = if config.dry_run
        {
            info!("DRY_RUN enabled, storage uploads and Firestore updates stay in memory");
            (
                Box::new(
                    MockStorageClient::new()
                        .with_base_url(config.storage_public_base_url.clone())
                        .with_bucket(config.storage_bucket.clone()),
                ),
                Box::new(MockRecordStore::new()),
            )
        } else {
            let (access_key, secret) = config
                .storage_hmac_access_key
                .clone()
                .zip(config.storage_hmac_secret.clone())
                .ok_or_else(|| Error::Config("Storage HMAC credentials missing".to_string()))?;
            (
                Box::new(
                    StorageClient::new(
                        access_key,
                        secret,
                        config.storage_endpoint.clone(),
                        config.storage_bucket.clone(),
                        config.storage_public_base_url.clone(),
                    )
                    .await?,
                ),
                Box::new(FirestoreClient::new(
                    config.firebase_project_id.clone(),
                    admin,
                )),
            )
        };

        let verifier = Box::new(ChainedVerifier::new(vec![
            Box::new(GoogleTokenInfoVerifier::new()) as Box<dyn TokenVerifier>,
            Box::new(FirebaseIdTokenVerifier::new(
                config.firebase_project_id.clone(),
            )),
        ]));

        Ok(Self::with_services(
            AppServices {
                chat,
                image_gen,
                directory,
                image: Box::new(ImageProcessor::new()),
                storage,
                records,
                verifier,
            },
            AppSettings {
                questions_max_tokens: config.questions_max_tokens,
                portrait_logo_url: config.portrait_logo_url.clone(),
            },
        ))
    }

    /// Question batch sized for `numberOfPlayers` (or the single-player default).
    pub async fn generate_player_questions(
        &self,
        request: &QuestionsRequest,
    ) -> Result<QuestionsResponse> {
        let players = request.players()?;
        let quota = match players {
            Some(n) => QuestionQuota::for_players(n),
            None => QuestionQuota::single_player(),
        };

        let questions = generate_questions(
            self.chat.as_ref(),
            &quota,
            players,
            self.settings.questions_max_tokens,
        )
        .await?;

        Ok(QuestionsResponse {
            success: true,
            total_questions: questions.len(),
            questions,
            number_of_players: players,
        })
    }

    pub async fn generate_character_portrait(
        &self,
        request: &PortraitRequest,
    ) -> Result<PortraitResponse> {
        request.validate()?;
        let style = pick_style(&mut rand::thread_rng())?;

        PortraitPipeline {
            directory: self.directory.as_ref(),
            image_gen: self.image_gen.as_ref(),
            image: self.image.as_ref(),
            storage: self.storage.as_ref(),
            records: self.records.as_ref(),
            logo_url: self.settings.portrait_logo_url.as_deref(),
        }
        .run(request, style)
        .await
    }

    pub async fn verify_token(&self, token: &str) -> Result<VerifiedToken> {
        self.verifier.verify(token).await
    }
}
