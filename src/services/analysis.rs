use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::ai_service::AIService;

pub const ANALYSIS_PROMPT: &str = "You are a nutrition expert. Analyze the food in this image and respond \
with ONLY a JSON object, no other text, in exactly this shape:\n\
{\n\
  \"foodName\": \"name of the food\",\n\
  \"calories\": estimated calories as a number,\n\
  \"nutrition\": {\n\
    \"carbs\": grams of carbohydrates as a number,\n\
    \"protein\": grams of protein as a number,\n\
    \"fat\": grams of fat as a number\n\
  },\n\
  \"healthiness\": \"good\" or \"okay\" or \"bad\",\n\
  \"suggestions\": [\"up to three short suggestions to make this meal healthier\"]\n\
}\n\
If you cannot identify food in the image, use null for unknown values.";

const HEALTHINESS_VALUES: [&str; 3] = ["good", "okay", "bad"];

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No image provided")]
    MissingImage,

    #[error("Failed to parse analysis response")]
    MalformedModelResponse { raw: String },

    #[error("Failed to analyze food image: {0}")]
    Upstream(String),
}

/// Turns one encoded image into a parsed nutrition object via the model.
///
/// Holds no per-request state; one instance serves every request.
pub struct AnalysisBridge {
    ai: Arc<dyn AIService>,
}

impl AnalysisBridge {
    pub fn new(ai: Arc<dyn AIService>) -> Self {
        Self { ai }
    }

    pub async fn analyze(&self, image: Option<&str>) -> Result<Value, AnalysisError> {
        let image = match image {
            Some(image) if !image.trim().is_empty() => image,
            _ => return Err(AnalysisError::MissingImage),
        };

        log::debug!(
            "📸 Analyzing image: {}... ({} chars)",
            image.chars().take(100).collect::<String>(),
            image.len()
        );

        let raw = self
            .ai
            .describe_image(ANALYSIS_PROMPT, image)
            .await
            .map_err(|e| {
                log::error!("❌ Model call failed: {:#}", e);
                AnalysisError::Upstream(format!("{:#}", e))
            })?;

        let parsed = parse_model_reply(&raw).map_err(|e| {
            log::error!("❌ Could not parse model output: {}", raw);
            e
        })?;

        if let Some(healthiness) = parsed.get("healthiness") {
            let known = healthiness
                .as_str()
                .map(|h| HEALTHINESS_VALUES.contains(&h))
                .unwrap_or(false);
            if !known {
                log::warn!("⚠️ Model returned unexpected healthiness value: {}", healthiness);
            }
        }

        log::info!("✅ Food analysis parsed successfully");
        Ok(parsed)
    }
}

/// Locates the JSON object in a model reply.
///
/// A language-tagged fenced block wins (a `json` tag in any case first,
/// then the first other tagged block); otherwise the first balanced
/// top-level `{...}` span is taken.
pub fn extract_json(response: &str) -> Option<&str> {
    fenced_block(response).or_else(|| first_object_span(response))
}

fn fenced_block(text: &str) -> Option<&str> {
    let mut fallback = None;
    let mut cursor = 0;

    while let Some(open) = text[cursor..].find("```") {
        let tag_start = cursor + open + 3;
        let tag_len = text[tag_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '+' || c == '_'))
            .unwrap_or(text.len() - tag_start);
        let tag = &text[tag_start..tag_start + tag_len];
        let body_start = tag_start + tag_len;

        let close = match text[body_start..].find("```") {
            Some(offset) => body_start + offset,
            None => break,
        };
        let body = text[body_start..close].trim();

        if tag.eq_ignore_ascii_case("json") {
            return Some(body);
        }
        if !tag.is_empty() && fallback.is_none() {
            fallback = Some(body);
        }
        cursor = close + 3;
    }

    fallback
}

fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

pub fn parse_model_reply(raw: &str) -> Result<Value, AnalysisError> {
    let malformed = || AnalysisError::MalformedModelResponse {
        raw: raw.to_string(),
    };

    let candidate = extract_json(raw).ok_or_else(malformed)?;
    let value: Value = serde_json::from_str(candidate).map_err(|_| malformed())?;

    if !value.is_object() {
        return Err(malformed());
    }

    Ok(value)
}
