//! Still capture of the last processed frame

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::ImageFormat;

use crate::error::CaptureError;
use crate::pipeline::frame::FrameBuffer;

/// Milliseconds since the Unix epoch, used to name captures
fn capture_timestamp() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// File name for a capture taken at `millis`
pub fn capture_file_name(prefix: &str, millis: u128) -> String {
    format!("{prefix}_{millis}.png")
}

/// Write `frame` as a PNG into `dir`.
///
/// The frame is written as processed, without the preview mirror. Nothing is
/// written when there is no frame or it has a zero dimension.
pub fn save_capture(
    frame: Option<&FrameBuffer>,
    dir: &Path,
    prefix: &str,
) -> Result<PathBuf, CaptureError> {
    let frame = frame.ok_or(CaptureError::NoFrame)?;
    if frame.is_empty() {
        return Err(CaptureError::InvalidSize {
            width: frame.width(),
            height: frame.height(),
        });
    }

    let image = frame.to_rgba_image().ok_or(CaptureError::InvalidSize {
        width: frame.width(),
        height: frame.height(),
    })?;

    std::fs::create_dir_all(dir)?;
    let mut path = dir.join(capture_file_name(prefix, capture_timestamp()));
    // Two captures inside the same millisecond
    let mut attempt = 1;
    while path.exists() {
        path = dir.join(format!("{prefix}_{}_{attempt}.png", capture_timestamp()));
        attempt += 1;
    }

    image.save_with_format(&path, ImageFormat::Png)?;
    tracing::info!(
        path = %path.display(),
        width = frame.width(),
        height = frame.height(),
        "Capture saved"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("beauty_capture_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_file_name() {
        assert_eq!(capture_file_name("beauty", 1700000000123), "beauty_1700000000123.png");
    }

    #[test]
    fn test_no_frame() {
        let err = save_capture(None, &temp_dir("none"), "beauty").unwrap_err();
        assert!(matches!(err, CaptureError::NoFrame));
    }

    #[test]
    fn test_zero_sized_frame_is_rejected() {
        let dir = temp_dir("empty");
        let frame = FrameBuffer::filled(0, 4, [0; 4]);
        let err = save_capture(Some(&frame), &dir, "beauty").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidSize { width: 0, height: 4 }));
        assert!(!dir.exists());
    }

    #[test]
    fn test_capture_is_unmirrored_png() {
        let dir = temp_dir("png");
        // left pixel red, right pixel blue
        let frame = FrameBuffer::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();

        let path = save_capture(Some(&frame), &dir, "shot").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("shot_") && name.ends_with(".png"));

        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (2, 1));
        assert_eq!(saved.get_pixel(0, 0).0, [255, 0, 0, 255]);

        let second = save_capture(Some(&frame), &dir, "shot").unwrap();
        assert_ne!(path, second);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
