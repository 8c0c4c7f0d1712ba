use anyhow::Result;

/// Trait for multimodal AI services (OpenRouter, OpenAI-compatible, etc.)
///
/// Implementations send one instruction plus one inline image and return the
/// model's free-form text reply untouched.
#[async_trait::async_trait]
pub trait AIService: Send + Sync {
    async fn describe_image(&self, instruction: &str, image_data_uri: &str) -> Result<String>;
}
