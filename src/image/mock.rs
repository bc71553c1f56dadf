use super::ImageService;
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Passes bytes through untouched.
pub struct MockImageProcessor {
    process_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockImageProcessor {
    pub fn new() -> Self {
        Self {
            process_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_process_count(&self) -> usize {
        *self.process_count.lock().unwrap()
    }
}

impl Default for MockImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageService for MockImageProcessor {
    async fn normalize_portrait(&self, image_data: &[u8]) -> Result<Vec<u8>> {
        if *self.should_fail.lock().unwrap() {
            return Err(crate::Error::Image(image::ImageError::IoError(
                std::io::Error::other("Mock failure"),
            )));
        }

        let mut count = self.process_count.lock().unwrap();
        *count += 1;

        Ok(image_data.to_vec())
    }
}
