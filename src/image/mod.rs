//! Portrait image normalisation
//!
//! Generated images come back in whatever format and size the model chose.
//! Everything stored is re-encoded as a square PNG.

pub mod mock;
pub mod processor;

pub use mock::MockImageProcessor;
pub use processor::ImageProcessor;

use crate::Result;
use async_trait::async_trait;

pub const PORTRAIT_SIZE: u32 = 500;

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Crop and scale to a `PORTRAIT_SIZE` square and encode as PNG.
    async fn normalize_portrait(&self, image_data: &[u8]) -> Result<Vec<u8>>;
}
