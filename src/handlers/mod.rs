pub mod camera;
pub mod capture;

pub use camera::{Camera, CameraSession};
pub use capture::{render, CaptureClient, CaptureError, ClientError, SelectedFile};
