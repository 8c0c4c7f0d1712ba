use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use super::camera::CameraSession;
use crate::models::{AnalysisResult, CapturedImage};
use crate::services::{AnalysisTransport, TransportError};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Please select an image file (got {0})")]
    InvalidType(String),

    #[error("Image is too large ({size} bytes), the limit is 5MB")]
    TooLarge { size: usize },

    #[error("Camera unavailable: {0}")]
    Camera(String),

    #[error("Could not encode snapshot: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No image selected")]
    NoImage,

    #[error("Analysis already in progress")]
    AlreadyAnalyzing,

    /// A newer capture replaced the image while the request was in flight.
    #[error("Analysis superseded by a newer image")]
    Superseded,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A file picked from the local file system.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientState {
    Idle,
    ImageSelected {
        image: CapturedImage,
    },
    Analyzing {
        image: CapturedImage,
    },
    ResultReady {
        image: CapturedImage,
        result: AnalysisResult,
    },
    Error {
        image: CapturedImage,
        message: String,
    },
}

impl ClientState {
    pub fn image(&self) -> Option<&CapturedImage> {
        match self {
            ClientState::Idle => None,
            ClientState::ImageSelected { image }
            | ClientState::Analyzing { image }
            | ClientState::ResultReady { image, .. }
            | ClientState::Error { image, .. } => Some(image),
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self, ClientState::Analyzing { .. })
    }
}

/// Everything the view needs: current state plus the last capture problem.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientView {
    pub state: ClientState,
    pub notice: Option<String>,
}

struct Inner {
    state: ClientState,
    notice: Option<String>,
    // Bumped by every capture; replies for an older generation are dropped.
    generation: u64,
}

pub fn validate_selection(mime_type: &str, size: usize) -> Result<(), CaptureError> {
    if !mime_type.starts_with("image/") {
        return Err(CaptureError::InvalidType(mime_type.to_string()));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(CaptureError::TooLarge { size });
    }
    Ok(())
}

/// Capture/upload side of the app: owns the current image and analysis state.
pub struct CaptureClient {
    transport: Arc<dyn AnalysisTransport>,
    inner: Mutex<Inner>,
}

impl CaptureClient {
    pub fn new(transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner {
                state: ClientState::Idle,
                notice: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn view(&self) -> ClientView {
        let inner = self.lock();
        ClientView {
            state: inner.state.clone(),
            notice: inner.notice.clone(),
        }
    }

    /// Starts a new capture: stale results and in-flight replies are invalidated.
    fn begin_capture(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.notice = None;
        inner.state = ClientState::Idle;
        inner.generation
    }

    fn finish_capture(&self, generation: u64, image: CapturedImage) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        log::debug!("🖼️ Image ready: {} captured at {}", image.mime_type, image.captured_at);
        inner.state = ClientState::ImageSelected { image };
        true
    }

    fn reject_capture(&self, error: &CaptureError) {
        log::warn!("⚠️ Capture rejected: {}", error);
        self.lock().notice = Some(error.to_string());
    }

    pub async fn select_file(&self, file: SelectedFile) -> Result<(), CaptureError> {
        log::info!("📁 File selected: {} ({}, {} bytes)", file.name, file.mime_type, file.bytes.len());

        if let Err(e) = validate_selection(&file.mime_type, file.bytes.len()) {
            self.reject_capture(&e);
            return Err(e);
        }

        let generation = self.begin_capture();

        let mime_type = file.mime_type;
        let bytes = file.bytes;
        let image = tokio::task::spawn_blocking(move || CapturedImage::from_bytes(&mime_type, &bytes))
            .await
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        if !self.finish_capture(generation, image) {
            log::debug!("🔁 Selection superseded before it finished decoding");
        }
        Ok(())
    }

    pub fn capture_from_camera(&self, session: CameraSession) -> Result<(), CaptureError> {
        let image = match session.confirm() {
            Ok(image) => image,
            Err(e) => {
                self.reject_capture(&e);
                return Err(e);
            }
        };

        self.accept_snapshot(image)
    }

    fn accept_snapshot(&self, image: CapturedImage) -> Result<(), CaptureError> {
        if let Err(e) = validate_selection(&image.mime_type, image.source_size) {
            self.reject_capture(&e);
            return Err(e);
        }

        let generation = self.begin_capture();
        self.finish_capture(generation, image);
        log::info!("📸 Camera snapshot captured");
        Ok(())
    }

    /// Sends the current image to the bridge. Only one request runs at a time.
    pub async fn request_analysis(&self) -> Result<AnalysisResult, ClientError> {
        let (image, generation) = {
            let mut inner = self.lock();
            if inner.state.is_analyzing() {
                return Err(ClientError::AlreadyAnalyzing);
            }
            let image = inner.state.image().cloned().ok_or(ClientError::NoImage)?;
            inner.state = ClientState::Analyzing {
                image: image.clone(),
            };
            (image, inner.generation)
        };

        log::info!("🔍 Requesting analysis ({} bytes source)", image.source_size);
        let outcome = self.transport.analyze(&image.data_uri).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            log::info!("🔁 Discarding analysis reply for a replaced image");
            return Err(ClientError::Superseded);
        }

        match outcome {
            Ok(result) => {
                inner.state = ClientState::ResultReady {
                    image,
                    result: result.clone(),
                };
                Ok(result)
            }
            Err(e) => {
                log::error!("❌ Analysis failed: {}", e);
                inner.state = ClientState::Error {
                    image,
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }
}

fn grams(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.0}g", v))
        .unwrap_or_else(|| "-".to_string())
}

/// Plain-text view of the client state.
pub fn render(view: &ClientView) -> String {
    let mut out = String::new();

    if let Some(notice) = &view.notice {
        out.push_str(&format!("⚠️ {}\n", notice));
    }

    match &view.state {
        ClientState::Idle => {
            out.push_str("No image selected. Choose a photo or use the camera.\n");
        }
        ClientState::ImageSelected { image } => {
            out.push_str(&format!(
                "Image ready ({}, {} bytes). Press Analyze.\n",
                image.mime_type, image.source_size
            ));
        }
        ClientState::Analyzing { .. } => {
            out.push_str("Analyzing...\n");
        }
        ClientState::ResultReady { result, .. } => {
            out.push_str(&format!(
                "🍽️ {}\n",
                result.food_name.as_deref().unwrap_or("Unknown food")
            ));
            out.push_str(&format!(
                "🔥 Calories: {}\n",
                result
                    .calories
                    .map(|c| format!("{:.0} kcal", c))
                    .unwrap_or_else(|| "-".to_string())
            ));
            out.push_str(&format!(
                "Carbs: {} | Protein: {} | Fat: {}\n",
                grams(result.nutrition.carbs),
                grams(result.nutrition.protein),
                grams(result.nutrition.fat)
            ));
            out.push_str(&format!("Healthiness: {}\n", result.healthiness.label()));
            if !result.suggestions.is_empty() {
                out.push_str("Suggestions:\n");
                for suggestion in &result.suggestions {
                    out.push_str(&format!("  - {}\n", suggestion));
                }
            }
        }
        ClientState::Error { message, .. } => {
            out.push_str(&format!("❌ {}\n", message));
        }
    }

    out
}
