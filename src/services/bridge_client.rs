use serde::Deserialize;
use thiserror::Error;

use crate::api::AnalyzeRequest;
use crate::models::AnalysisResult;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The bridge answered with an error body.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Could not reach analysis service: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected analysis response: {0}")]
    Decode(String),
}

/// How the capture client reaches the analysis bridge.
#[async_trait::async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn analyze(&self, image_data_uri: &str) -> Result<AnalysisResult, TransportError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

pub struct HttpBridgeClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpBridgeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/api/analyze", base_url.trim_end_matches('/')),
            client: reqwest::Client::new(),
        }
    }
}

/// Human-readable message for a non-2xx bridge reply.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error),
            details: Some(details),
        }) => format!("{}: {}", error, details),
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        _ => format!("Analysis failed (HTTP {})", status),
    }
}

#[async_trait::async_trait]
impl AnalysisTransport for HttpBridgeClient {
    async fn analyze(&self, image_data_uri: &str) -> Result<AnalysisResult, TransportError> {
        log::info!("📤 Posting image to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest {
                image: Some(image_data_uri.to_string()),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        log::debug!("📥 Bridge response status: {}", status);

        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
