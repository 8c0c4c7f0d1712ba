pub mod ai_service;
pub mod analysis; // Analysis bridge: prompt + reply extraction
pub mod bridge_client; // Capture client -> bridge HTTP transport
pub mod openrouter; // OpenRouter AI service

pub use ai_service::AIService;
pub use analysis::{AnalysisBridge, AnalysisError};
pub use bridge_client::{AnalysisTransport, HttpBridgeClient, TransportError};
pub use openrouter::OpenRouterService;
