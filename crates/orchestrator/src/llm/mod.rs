//! Language-model port used by the classifier and extractor fallbacks.
//!
//! Both fallbacks are optional: components hold an
//! `Option<Arc<dyn LanguageModel>>` and skip the model pass when it is `None`.

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::ClaudeClient;
pub use error::{ApiError, ApiErrorResponse, LlmError};

/// A text-completion capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single prompt and return the model's text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has no text.
    async fn complete(&self, system: &str, prompt: &str, max_tokens: u32)
    -> Result<String, LlmError>;
}
