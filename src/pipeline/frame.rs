//! RGBA pixel buffers passed between pipeline stages

use image::{DynamicImage, RgbaImage};

use crate::error::FrameError;

/// An RGBA8 frame.
///
/// Each stage owns the buffer it is working on; only the scheduler's last
/// processed slot keeps one across frames.
#[derive(Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl FrameBuffer {
    /// Wrap raw RGBA bytes, checking the length against the dimensions
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FrameError::LengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one color
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self::from_rgba_image(image.into_rgba8())
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    /// Copy into an `image` buffer for encoding or drawing
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at (x, y), if inside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_validation() {
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
        let err = FrameBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_filled_and_pixel_access() {
        let frame = FrameBuffer::filled(3, 2, [1, 2, 3, 255]);
        assert_eq!(frame.data().len(), 24);
        assert_eq!(frame.pixel(2, 1), Some([1, 2, 3, 255]));
        assert_eq!(frame.pixel(3, 0), None);
        assert!(!frame.is_empty());
        assert!(FrameBuffer::filled(0, 5, [0; 4]).is_empty());
    }

    #[test]
    fn test_image_conversion() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(1, 0, image::Rgba([9, 8, 7, 6]));
        let frame = FrameBuffer::from_rgba_image(img);
        assert_eq!(frame.dimensions(), (2, 1));
        assert_eq!(frame.pixel(1, 0), Some([9, 8, 7, 6]));
        let back = frame.to_rgba_image().unwrap();
        assert_eq!(back.get_pixel(1, 0).0, [9, 8, 7, 6]);
    }
}
