//! Error types
//!
//! Each stage of the preview pipeline has its own error enum. None of them
//! are allowed to stop the frame loop: callers convert them into log lines
//! and status messages at the component boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by the external effects processor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("Effects engine is not initialized")]
    NotInitialized,
    #[error("Effects engine has been destroyed")]
    Destroyed,
    #[error("Resource not registered: {0}")]
    ResourceNotRegistered(String),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Effects engine error: {0}")]
    Engine(String),
}

/// Errors raised while acquiring frames from a camera or file.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Frame source has no frame ready")]
    NotReady,
    #[error("Frame source disconnected")]
    Disconnected,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl SourceError {
    /// Hardware and file-type failures warrant a blocking alert.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            SourceError::CameraUnavailable(_) | SourceError::UnsupportedFormat(_)
        )
    }
}

/// Pixel buffer construction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("Buffer length {actual} does not match {width}x{height} RGBA ({expected} bytes)")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised when exporting the last processed frame.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No image to save")]
    NoFrame,
    #[error("Invalid canvas size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Failed to encode capture: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to write capture: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings and panel configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("Please configure appId and appKey")]
    MissingCredentials,
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
