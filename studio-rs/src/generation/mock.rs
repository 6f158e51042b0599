//! Mock image generator for testing
//!
//! Outcomes are scripted per call, so tests can exercise mixed
//! success/empty/failure batches without a network dependency.

use crate::error::{Result, StudioError};
use crate::generation::{GeneratedImage, GenerationRequest, ImageGenerator};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted outcome of one mock generation call
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return an image with the given base64 payload
    Image(String),
    /// Settle successfully with no image data
    Empty,
    /// Fail with a generation error
    Fail(String),
}

/// Mock [`ImageGenerator`] implementation
pub struct MockGenerator {
    model_name: String,
    outcomes: Mutex<VecDeque<MockOutcome>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    /// A generator that always returns an image
    pub fn new() -> Self {
        Self {
            model_name: "mock-image-v1".to_string(),
            outcomes: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A generator that plays back the given outcomes in order, then
    /// defaults to returning images
    pub fn with_outcomes(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            model_name: "mock-image-v1".to_string(),
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generation calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Option<GeneratedImage>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let outcome = {
            let mut outcomes = self.outcomes.lock().unwrap();
            outcomes
                .pop_front()
                .unwrap_or_else(|| MockOutcome::Image(format!("bW9jay0{}", call)))
        };

        match outcome {
            MockOutcome::Image(data) => Ok(Some(GeneratedImage {
                data,
                mime_type: "image/png".to_string(),
            })),
            MockOutcome::Empty => Ok(None),
            MockOutcome::Fail(message) => Err(StudioError::Generation(message)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
