#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod recognizer;
pub mod rgba_converter;

#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraOptions, available_cameras, start_camera_stream};
pub use recognizer::{RecognizerBackend, WorkerCommand, start_recognizer};
