//! Frame acquisition sources
//!
//! A source declares whether it produces a video stream or a still, reports
//! whether a frame is ready, and hands frames over one at a time. Releasing a
//! source frees the underlying device or stream.

use std::path::Path;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use image::ImageFormat;

use super::frame::FrameBuffer;
use crate::error::SourceError;
use crate::processor::FrameType;

/// Something the scheduler can pull frames from
pub trait FrameSource {
    /// Video sources are previewed mirrored; stills are not
    fn frame_type(&self) -> FrameType;

    /// True when `acquire` would return a frame without waiting
    fn has_frame(&self) -> bool;

    /// Take the next frame
    fn acquire(&mut self) -> Result<FrameBuffer, SourceError>;

    /// Stop producing frames and free the device or stream
    fn release(&mut self);

    /// Short description for logs
    fn name(&self) -> &str;
}

/// A decoded picture
pub struct StillImageSource {
    frame: Option<FrameBuffer>,
    name: String,
}

impl StillImageSource {
    /// Decode an image file. Unknown extensions are rejected before decoding.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        ImageFormat::from_path(path)
            .map_err(|_| SourceError::UnsupportedFormat(path.to_path_buf()))?;
        let image = image::open(path)?;
        let frame = FrameBuffer::from_image(image);
        tracing::info!(
            path = %path.display(),
            width = frame.width(),
            height = frame.height(),
            "Opened still image"
        );
        Ok(Self {
            frame: Some(frame),
            name: path.display().to_string(),
        })
    }

    pub fn from_frame(frame: FrameBuffer) -> Self {
        Self {
            frame: Some(frame),
            name: "still".to_string(),
        }
    }

    /// The decoded picture, until released
    pub fn frame(&self) -> Option<&FrameBuffer> {
        self.frame.as_ref()
    }
}

impl FrameSource for StillImageSource {
    fn frame_type(&self) -> FrameType {
        FrameType::Image
    }

    fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    fn acquire(&mut self) -> Result<FrameBuffer, SourceError> {
        self.frame.clone().ok_or(SourceError::NotReady)
    }

    fn release(&mut self) {
        self.frame = None;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Producer half of a [`ChannelSource`]
#[derive(Clone)]
pub struct FrameSender {
    tx: Sender<FrameBuffer>,
}

impl FrameSender {
    /// Offer a frame. Returns false when the queue is full or the source is gone.
    pub fn send(&self, frame: FrameBuffer) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Frame queue full, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Video frames pushed by an external producer (capture thread, decoder).
///
/// `acquire` returns the newest queued frame and discards older ones, so a
/// slow consumer sees fresh frames instead of a backlog.
pub struct ChannelSource {
    rx: Option<Receiver<FrameBuffer>>,
    name: String,
}

impl ChannelSource {
    /// Create a source holding at most `capacity` pending frames
    pub fn bounded(capacity: usize) -> (FrameSender, Self) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (
            FrameSender { tx },
            Self {
                rx: Some(rx),
                name: "channel".to_string(),
            },
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_released(&self) -> bool {
        self.rx.is_none()
    }
}

impl FrameSource for ChannelSource {
    fn frame_type(&self) -> FrameType {
        FrameType::Video
    }

    fn has_frame(&self) -> bool {
        self.rx.as_ref().map_or(false, |rx| !rx.is_empty())
    }

    fn acquire(&mut self) -> Result<FrameBuffer, SourceError> {
        let rx = self.rx.as_ref().ok_or(SourceError::Disconnected)?;
        let mut latest = match rx.try_recv() {
            Ok(frame) => frame,
            Err(TryRecvError::Empty) => return Err(SourceError::NotReady),
            Err(TryRecvError::Disconnected) => return Err(SourceError::Disconnected),
        };
        while let Ok(frame) = rx.try_recv() {
            latest = frame;
        }
        Ok(latest)
    }

    fn release(&mut self) {
        if self.rx.take().is_some() {
            tracing::debug!(source = %self.name, "Frame channel released");
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
