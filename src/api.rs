use serde::{Deserialize, Serialize};

use crate::services::AnalysisError;

/// Body of `POST /api/analyze`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AnalysisError {
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisError::MissingImage => 400,
            AnalysisError::MalformedModelResponse { .. } | AnalysisError::Upstream(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            AnalysisError::MissingImage => ErrorResponse {
                error: "No image provided".to_string(),
                raw: None,
                details: None,
            },
            AnalysisError::MalformedModelResponse { raw } => ErrorResponse {
                error: "Failed to parse analysis response".to_string(),
                raw: Some(raw.clone()),
                details: None,
            },
            AnalysisError::Upstream(details) => ErrorResponse {
                error: "Failed to analyze food image".to_string(),
                raw: None,
                details: Some(details.clone()),
            },
        }
    }
}

// Axum integration (optional - requires axum dependency)
#[cfg(feature = "server")]
pub mod server {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

    use crate::services::AnalysisBridge;

    /// 5 MiB source image after base64 expansion, plus JSON framing.
    pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

    pub struct AppState {
        pub bridge: AnalysisBridge,
    }

    pub fn create_router(bridge: AnalysisBridge) -> Router {
        let state = Arc::new(AppState { bridge });

        Router::new()
            .route("/", get(root_handler))
            .route("/api/analyze", post(analyze_handler))
            .route("/health", get(health_check))
            .layer(axum::extract::DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    impl IntoResponse for AnalysisError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(self.to_response())).into_response()
        }
    }

    async fn analyze_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
        log::info!("🔔 Analysis request received ({} bytes)", body.len());

        // Anything that is not a JSON object with an `image` string counts as no image.
        let request: AnalyzeRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
            log::warn!("⚠️ Unreadable analysis request body: {}", e);
            AnalyzeRequest::default()
        });

        match state.bridge.analyze(request.image.as_deref()).await {
            Ok(result) => (StatusCode::OK, Json(result)).into_response(),
            Err(e) => {
                log::error!("❌ Analysis failed: {}", e);
                e.into_response()
            }
        }
    }

    async fn root_handler() -> &'static str {
        "Food Snap analysis bridge - POST an image data URI to /api/analyze"
    }

    async fn health_check() -> &'static str {
        "OK"
    }
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::server::create_router;
    use crate::services::{AIService, AnalysisBridge};

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct CannedAI {
        reply: Result<String, String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl AIService for CannedAI {
        async fn describe_image(&self, _instruction: &str, _image: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn router(reply: Result<&str, &str>) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let ai = CannedAI {
            reply: reply.map(str::to_string).map_err(str::to_string),
            calls: calls.clone(),
        };
        (create_router(AnalysisBridge::new(Arc::new(ai))), calls)
    }

    async fn post_analyze(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const APPLE: &str = r#"{"foodName":"Apple","calories":95,"nutrition":{"carbs":25,"protein":0,"fat":0},"healthiness":"good","suggestions":["Eat the skin for fiber"]}"#;

    #[tokio::test]
    async fn test_fenced_reply_is_200_body() {
        let reply = format!("```json\n{}\n```", APPLE);
        let (app, _) = router(Ok(&reply));

        let (status, body) = post_analyze(app, r#"{"image":"data:image/jpeg;base64,AAAA"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::from_str::<Value>(APPLE).unwrap());
    }

    #[tokio::test]
    async fn test_plain_text_reply_is_500_with_raw() {
        let (app, _) = router(Ok("Sorry, I cannot help with that."));

        let (status, body) = post_analyze(app, r#"{"image":"data:image/jpeg;base64,AAAA"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to parse analysis response");
        assert_eq!(body["raw"], "Sorry, I cannot help with that.");
    }

    #[tokio::test]
    async fn test_missing_image_is_400_without_model_call() {
        let (app, calls) = router(Ok(APPLE));

        let (status, body) = post_analyze(app, "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "No image provided" }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_body_is_400() {
        let (app, calls) = router(Ok(APPLE));

        let (status, body) = post_analyze(app, "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image provided");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_400_json() {
        let (app, calls) = router(Ok(APPLE));

        let (status, body) = post_analyze(app, vec![0xffu8, 0xfe]).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "No image provided" }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_with_details() {
        let (app, _) = router(Err("OpenRouter API error (429): quota exceeded"));

        let (status, body) = post_analyze(app, r#"{"image":"data:image/jpeg;base64,AAAA"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to analyze food image");
        assert!(body["details"].as_str().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = router(Ok(APPLE));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
