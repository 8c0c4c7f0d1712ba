use anyhow::Result;
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};

use super::capture::CaptureError;
use crate::models::CapturedImage;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera on phones.
    Environment,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }
}

/// One still frame, tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

pub trait VideoFeed: Send {
    fn grab_frame(&mut self) -> Result<Frame>;
}

pub trait Camera: Send + Sync {
    fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn VideoFeed>>;
}

/// A live feed waiting for the user to confirm or cancel.
pub struct CameraSession {
    feed: Box<dyn VideoFeed>,
}

impl CameraSession {
    pub fn open(camera: &dyn Camera) -> Result<Self, CaptureError> {
        let constraints = CameraConstraints::default();
        log::info!(
            "📷 Opening camera ({:?}, ideal {}x{})",
            constraints.facing_mode,
            constraints.ideal_width,
            constraints.ideal_height
        );

        let feed = camera
            .open(&constraints)
            .map_err(|e| CaptureError::Camera(format!("{:#}", e)))?;
        Ok(Self { feed })
    }

    /// Takes a single frame and encodes it as a JPEG data URI. Closes the feed.
    pub fn confirm(mut self) -> Result<CapturedImage, CaptureError> {
        let frame = self
            .feed
            .grab_frame()
            .map_err(|e| CaptureError::Camera(format!("{:#}", e)))?;
        let jpeg = encode_jpeg(&frame)?;

        log::debug!("📸 Snapshot {}x{} encoded to {} bytes", frame.width, frame.height, jpeg.len());
        Ok(CapturedImage::from_bytes("image/jpeg", &jpeg))
    }

    pub fn cancel(self) {
        log::debug!("📷 Camera capture cancelled");
    }
}

pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, CaptureError> {
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.width == 0 || frame.height == 0 || frame.rgb.len() != expected {
        return Err(CaptureError::Encode(format!(
            "frame {}x{} carries {} bytes, expected {}",
            frame.width,
            frame.height,
            frame.rgb.len(),
            expected
        )));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(jpeg)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct FakeCamera {
        pub opened_with: Mutex<Option<CameraConstraints>>,
        pub available: bool,
    }

    impl FakeCamera {
        pub(crate) fn new() -> Self {
            Self {
                opened_with: Mutex::new(None),
                available: true,
            }
        }
    }

    struct SolidFeed;

    impl VideoFeed for SolidFeed {
        fn grab_frame(&mut self) -> Result<Frame> {
            Ok(Frame {
                width: 4,
                height: 2,
                rgb: [200u8, 40, 40].repeat(8),
            })
        }
    }

    impl Camera for FakeCamera {
        fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn VideoFeed>> {
            if !self.available {
                anyhow::bail!("Permission denied");
            }
            *self.opened_with.lock().unwrap() = Some(constraints.clone());
            Ok(Box::new(SolidFeed))
        }
    }

    #[test]
    fn test_requests_rear_camera_full_hd() {
        let camera = FakeCamera::new();
        CameraSession::open(&camera).unwrap().cancel();

        let constraints = camera.opened_with.lock().unwrap().clone().unwrap();
        assert_eq!(constraints.facing_mode, FacingMode::Environment);
        assert_eq!((constraints.ideal_width, constraints.ideal_height), (1920, 1080));
    }

    #[test]
    fn test_confirm_produces_jpeg_data_uri() {
        let camera = FakeCamera::new();
        let image = CameraSession::open(&camera).unwrap().confirm().unwrap();

        assert_eq!(image.mime_type, "image/jpeg");
        // base64 of the JPEG SOI marker
        assert!(image.data_uri.starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn test_camera_unavailable() {
        let camera = FakeCamera {
            opened_with: Mutex::new(None),
            available: false,
        };

        match CameraSession::open(&camera) {
            Err(CaptureError::Camera(message)) => assert!(message.contains("Permission denied")),
            _ => panic!("expected camera error"),
        }
    }

    #[test]
    fn test_encode_rejects_short_frame() {
        let frame = Frame {
            width: 2,
            height: 2,
            rgb: vec![0; 5],
        };
        assert!(matches!(encode_jpeg(&frame), Err(CaptureError::Encode(_))));
    }
}
