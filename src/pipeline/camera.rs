//! Live camera source
//!
//! Captures frames with nokhwa on a background thread and keeps only the
//! latest one for the scheduler to pick up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use parking_lot::Mutex;

use super::frame::FrameBuffer;
use super::source::FrameSource;
use crate::config::CameraSettings;
use crate::error::SourceError;
use crate::processor::FrameType;

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
}

/// List cameras the platform backend can see
pub fn list_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) => cameras
            .iter()
            .enumerate()
            .map(|(idx, info)| CameraInfo {
                index: idx as u32,
                name: info.human_name().to_string(),
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Camera stream as a frame source
pub struct CameraSource {
    latest: Arc<Mutex<Option<FrameBuffer>>>,
    /// Frames written by the capture thread
    written: Arc<AtomicU64>,
    /// Frames handed to the scheduler
    consumed: u64,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    name: String,
}

impl CameraSource {
    /// Open the camera described by `settings`.
    ///
    /// Waits for the device to open so permission and hardware errors are
    /// reported here rather than on the first frame.
    pub fn open(settings: &CameraSettings) -> Result<Self, SourceError> {
        let latest = Arc::new(Mutex::new(None));
        let written = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<String, String>>(1);

        let settings = *settings;
        let latest_clone = latest.clone();
        let written_clone = written.clone();
        let running_clone = running.clone();

        let thread_handle = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || {
                capture_thread(settings, latest_clone, written_clone, running_clone, ready_tx);
            })
            .map_err(|e| SourceError::CameraUnavailable(format!("capture thread: {e}")))?;

        let name = match ready_rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Ok(name)) => name,
            Ok(Err(reason)) => {
                let _ = thread_handle.join();
                return Err(SourceError::CameraUnavailable(reason));
            }
            Err(_) => {
                running.store(false, Ordering::Release);
                let _ = thread_handle.join();
                return Err(SourceError::CameraUnavailable("camera did not open".into()));
            }
        };

        Ok(Self {
            latest,
            written,
            consumed: 0,
            running,
            thread_handle: Some(thread_handle),
            name,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Frames delivered by the device so far
    pub fn frame_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::info!(camera = %self.name, "Camera released");
        }
    }
}

fn open_camera(settings: &CameraSettings) -> Result<Camera, String> {
    let index = CameraIndex::Index(settings.index);
    let ideal = CameraFormat::new(
        Resolution::new(settings.ideal_width, settings.ideal_height),
        FrameFormat::MJPEG,
        settings.frame_rate,
    );

    let attempts = [
        RequestedFormatType::Closest(ideal),
        RequestedFormatType::HighestResolution(Resolution::new(
            settings.ideal_width,
            settings.ideal_height,
        )),
        RequestedFormatType::None,
    ];

    let mut last_error = String::new();
    for attempt in attempts {
        let label = format!("{attempt:?}");
        match Camera::new(index.clone(), RequestedFormat::new::<RgbAFormat>(attempt)) {
            Ok(camera) => return Ok(camera),
            Err(e) => {
                tracing::warn!("Failed to open camera with {}: {:?}", label, e);
                last_error = e.to_string();
            }
        }
    }
    Err(last_error)
}

fn capture_thread(
    settings: CameraSettings,
    latest: Arc<Mutex<Option<FrameBuffer>>>,
    written: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    ready: crossbeam_channel::Sender<Result<String, String>>,
) {
    let mut camera = match open_camera(&settings) {
        Ok(camera) => camera,
        Err(reason) => {
            let _ = ready.send(Err(reason));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(format!("failed to open stream: {e}")));
        return;
    }

    let name = camera.info().human_name().to_string();
    tracing::info!(
        camera = %name,
        width = camera.resolution().width(),
        height = camera.resolution().height(),
        "Camera opened"
    );
    let _ = ready.send(Ok(name));

    while running.load(Ordering::Acquire) {
        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Failed to capture frame: {:?}", e);
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        match frame.decode_image::<RgbAFormat>() {
            Ok(image) => {
                let (width, height) = image.dimensions();
                match FrameBuffer::from_rgba(width, height, image.into_raw()) {
                    Ok(buffer) => {
                        *latest.lock() = Some(buffer);
                        written.fetch_add(1, Ordering::Release);
                    }
                    Err(e) => tracing::warn!("Discarding camera frame: {}", e),
                }
            }
            Err(e) => tracing::warn!("Failed to decode frame: {:?}", e),
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!("Failed to stop camera stream: {:?}", e);
    }
    tracing::info!("Camera capture thread stopped");
}

impl FrameSource for CameraSource {
    fn frame_type(&self) -> FrameType {
        FrameType::Video
    }

    fn has_frame(&self) -> bool {
        self.is_running() && self.written.load(Ordering::Acquire) > self.consumed
    }

    fn acquire(&mut self) -> Result<FrameBuffer, SourceError> {
        if !self.is_running() {
            return Err(SourceError::Disconnected);
        }
        let written = self.written.load(Ordering::Acquire);
        if written <= self.consumed {
            return Err(SourceError::NotReady);
        }
        let frame = self.latest.lock().take().ok_or(SourceError::NotReady)?;
        self.consumed = written;
        Ok(frame)
    }

    fn release(&mut self) {
        self.stop();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}
