//! Character portrait pipeline: Slack avatar in, cartoon portrait URL out.

use crate::ai::ImageGenerationService;
use crate::directory::DirectoryService;
use crate::firebase::RecordStore;
use crate::image::ImageService;
use crate::models::{PortraitRequest, PortraitResponse};
use crate::storage::StorageService;
use crate::{prompts, Error, Result};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Instant;
use tracing::{error, info};

pub const PORTRAIT_PREFIX: &str = "character-portraits";

/// One of the named styles, uniformly at random.
pub fn pick_style<R: Rng + ?Sized>(rng: &mut R) -> Result<&'static str> {
    prompts::portrait_styles()
        .choose(rng)
        .copied()
        .ok_or_else(|| Error::Invariant("Portrait style list is empty".to_string()))
}

pub fn build_portrait_prompt(answers: &str, style: &str, logo_url: Option<&str>) -> String {
    let mut prompt = prompts::render(prompts::PORTRAIT, &[("answers", answers), ("style", style)]);
    if let Some(logo_url) = logo_url {
        prompt.push('\n');
        prompt.push_str(&prompts::render(prompts::PORTRAIT_LOGO, &[("logo_url", logo_url)]));
    }
    prompt.trim_end().to_string()
}

pub fn object_key(slack_user_id: &str, unix_millis: i64) -> String {
    format!("{}/{}_{}.png", PORTRAIT_PREFIX, slack_user_id, unix_millis)
}

/// Services a portrait run needs, borrowed for the duration of one request.
pub struct PortraitPipeline<'a> {
    pub directory: &'a dyn DirectoryService,
    pub image_gen: &'a dyn ImageGenerationService,
    pub image: &'a dyn ImageService,
    pub storage: &'a dyn StorageService,
    pub records: &'a dyn RecordStore,
    pub logo_url: Option<&'a str>,
}

impl PortraitPipeline<'_> {
    /// Run every step in order. Only the final record update may fail softly.
    pub async fn run(&self, request: &PortraitRequest, style: &str) -> Result<PortraitResponse> {
        let started = Instant::now();
        request.validate()?;

        info!("Looking up Slack user for {}", request.email);
        let user = self.directory.lookup_by_email(&request.email).await?;

        let avatar = self.directory.fetch_avatar(&user.avatar_url).await?;
        info!(
            "Downloaded avatar for {} ({} bytes, {})",
            user.id,
            avatar.bytes.len(),
            avatar.mime_type
        );

        info!("Generating portrait for {} in {} style", user.id, style);
        let prompt = build_portrait_prompt(&request.questions_and_answers, style, self.logo_url);
        let generated = self.image_gen.generate_image(&prompt, &avatar).await?;
        let png = self.image.normalize_portrait(&generated).await?;

        let key = object_key(&user.id, Utc::now().timestamp_millis());
        let image_url = self.storage.upload_public(&key, &png, "image/png").await?;

        let updated = match request.player_record()? {
            Some(record) => match self.records.set_player_image(&record, &image_url).await {
                Ok(()) => Some(true),
                Err(e) => {
                    // The portrait exists either way; report the miss instead of failing.
                    error!("Failed to update {}: {}", record.document_path(), e);
                    Some(false)
                }
            },
            None => None,
        };

        info!(
            "Portrait for {} ready at {} in {}ms",
            user.id,
            image_url,
            started.elapsed().as_millis()
        );

        Ok(PortraitResponse {
            success: true,
            image_url,
            updated,
        })
    }
}
