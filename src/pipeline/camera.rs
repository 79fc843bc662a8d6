use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Sender, TrySendError, bounded};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use super::rgba_converter;
use crate::types::Frame;

// macOS built-in cameras often reject YUYV even though it is advertised.
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

fn requested_formats() -> [RequestedFormat<'static>; 3] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug, Default)]
pub struct CameraOptions {
    pub index: u32,
    /// Flip frames left to right before they reach the recognizer.
    pub mirror: bool,
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

impl fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.label)
    }
}

/// Capture thread handle. Stopping it drops the frame sender, which is how
/// the recognizer learns there is nothing more to process.
#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("camera thread panicked");
            }
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto).context("failed to enumerate cameras")?;
    Ok(cameras.iter().map(camera_device).collect())
}

fn camera_device(info: &CameraInfo) -> CameraDevice {
    CameraDevice {
        index: info.index().clone(),
        label: info.human_name(),
    }
}

fn open_camera(index: &CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => {
                    log::info!(
                        "camera {index} streaming {:?} at {} fps",
                        camera.camera_format(),
                        camera.frame_rate()
                    );
                    return Ok(camera);
                }
                Err(err) => last_err = Some(anyhow::Error::from(err)),
            },
            Err(err) => last_err = Some(anyhow::Error::from(err)),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Opens the camera on its own thread and forwards RGBA frames, dropping
/// them while the consumer is busy. Returns once the device is streaming.
pub fn start_camera_stream(options: CameraOptions, frame_tx: Sender<Frame>) -> Result<CameraStream> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

    let handle = thread::Builder::new()
        .name("camera".into())
        .spawn(move || {
            let index = CameraIndex::Index(options.index);
            let mut camera = match open_camera(&index) {
                Ok(camera) => {
                    let _ = ready_tx.send(Ok(()));
                    camera
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            capture_loop(&mut camera, options.mirror, &stop_flag, &frame_tx);

            if let Err(err) = camera.stop_stream() {
                log::warn!("failed to stop camera stream: {err:?}");
            }
            log::info!("camera thread stopped");
        })
        .context("failed to spawn camera thread")?;

    let mut stream = CameraStream {
        stop,
        handle: Some(handle),
    };

    match ready_rx.recv_timeout(OPEN_TIMEOUT) {
        Ok(Ok(())) => Ok(stream),
        Ok(Err(err)) => {
            stream.shutdown();
            Err(err.context(format!("failed to open camera #{}", options.index)))
        }
        Err(_) => {
            stream.shutdown();
            Err(anyhow!(
                "camera #{} did not start within {OPEN_TIMEOUT:?}",
                options.index
            ))
        }
    }
}

fn capture_loop(camera: &mut Camera, mirror: bool, stop: &AtomicBool, frame_tx: &Sender<Frame>) {
    while !stop.load(Ordering::Relaxed) {
        let read_start = Instant::now();
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(err) => {
                log::warn!(
                    "camera frame read failed (after {:?}): {err:?}",
                    read_start.elapsed()
                );
                continue;
            }
        };

        let mut converted = match rgba_converter::convert_camera_frame(&buffer) {
            Ok(rgba) => rgba,
            Err(err) => {
                log::warn!("failed to decode camera frame {err:?}");
                continue;
            }
        };
        if mirror {
            converted.mirror_horizontally();
        }

        let frame = Frame {
            rgba: converted.rgba,
            width: converted.width,
            height: converted.height,
            timestamp: Instant::now(),
        };

        if let Err(TrySendError::Disconnected(_)) = frame_tx.try_send(frame) {
            break;
        }
    }
}
