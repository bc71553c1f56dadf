use super::{ImageService, PORTRAIT_SIZE};
use crate::{Error, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;

pub struct ImageProcessor {
    size: u32,
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self {
            size: PORTRAIT_SIZE,
        }
    }

    fn normalize_sync(image_data: Vec<u8>, size: u32) -> Result<Vec<u8>> {
        let image = image::load_from_memory(&image_data)?;
        let (width, height) = (image.width(), image.height());

        // Already the right shape, only the container may differ
        let resized = if width == size && height == size {
            image
        } else {
            image.resize_to_fill(size, size, FilterType::Lanczos3)
        };

        let mut bytes = Vec::new();
        resized.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        tracing::debug!(
            "Normalised portrait from {}x{} to {}x{} PNG ({} bytes)",
            width,
            height,
            size,
            size,
            bytes.len()
        );
        Ok(bytes)
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageService for ImageProcessor {
    async fn normalize_portrait(&self, image_data: &[u8]) -> Result<Vec<u8>> {
        let data = image_data.to_vec();
        let size = self.size;
        tokio::task::spawn_blocking(move || Self::normalize_sync(data, size))
            .await
            .map_err(|e| Error::Invariant(format!("Image processing task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 0, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_jpeg_is_reencoded_as_square_png() {
        let processor = ImageProcessor::new();
        let png = processor
            .normalize_portrait(&encode(1024, 768, ImageFormat::Jpeg))
            .await
            .unwrap();

        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (500, 500));
    }

    #[tokio::test]
    async fn test_small_image_is_upscaled() {
        let processor = ImageProcessor::new();
        let png = processor
            .normalize_portrait(&encode(10, 10, ImageFormat::Png))
            .await
            .unwrap();

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (500, 500));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_fail() {
        let processor = ImageProcessor::new();
        let err = processor
            .normalize_portrait(b"definitely not an image")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }
}
