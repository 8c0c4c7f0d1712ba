use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::ai_service::AIService;
use crate::config::Config;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion client pointed at OpenRouter.
pub struct OpenRouterService {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenRouterService {
    pub fn new(api_key: String, model: String, base_url: String, max_tokens: u32) -> Self {
        Self {
            api_key,
            model,
            base_url,
            max_tokens,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.openrouter_api_key.clone(),
            config.openrouter_model.clone(),
            config.openrouter_base_url.clone(),
            config.max_tokens,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, instruction: &str, image_data_uri: &str) -> ChatRequest {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: vec![
                ContentPart::Text {
                    content_type: "text".to_string(),
                    text: instruction.to_string(),
                },
                ContentPart::ImageUrl {
                    content_type: "image_url".to_string(),
                    image_url: ImageData {
                        url: image_data_uri.to_string(),
                    },
                },
            ],
        }];

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl AIService for OpenRouterService {
    async fn describe_image(&self, instruction: &str, image_data_uri: &str) -> Result<String> {
        let request = self.build_request(instruction, image_data_uri);

        log::info!("🤖 Sending request to OpenRouter with model: {}", self.model);
        log::debug!("📤 Request payload size: {} bytes", serde_json::to_string(&request)?.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "Food Snap")
            .json(&request)
            .send()
            .await
            .context("OpenRouter request failed")?;

        let status = response.status();
        log::debug!("📥 OpenRouter response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ OpenRouter API error response: {}", error_text);
            anyhow::bail!("OpenRouter API error ({}): {}", status, error_text);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("OpenRouter returned an unreadable completion")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenRouter returned no completion choices"))?;

        log::debug!("💬 OpenRouter response content: {}", content);
        Ok(content)
    }
}
