//! Display surface compositing
//!
//! `RenderPipeline::present` copies a processed frame onto the display
//! surface (mirrored for live preview), overlays detections, and computes the
//! aspect-fit size the surface is shown at inside its container.

use image::RgbaImage;

use super::frame::FrameBuffer;
use super::overlay::{draw_detections, OverlayOptions, TextLabel};
use crate::detection::DetectionResult;

/// Size and position of the surface inside its container
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayLayout {
    pub width: f32,
    pub height: f32,
    /// Letterbox offset from the container's left edge
    pub offset_x: f32,
    /// Letterbox offset from the container's top edge
    pub offset_y: f32,
}

/// Fit an image into a container without distortion.
///
/// The longer relative dimension fills the container; the other is
/// letterboxed.
pub fn aspect_fit(
    image_width: u32,
    image_height: u32,
    container_width: f32,
    container_height: f32,
) -> DisplayLayout {
    if image_width == 0 || image_height == 0 || container_width <= 0.0 || container_height <= 0.0 {
        return DisplayLayout::default();
    }

    let image_aspect = image_width as f32 / image_height as f32;
    let container_aspect = container_width / container_height;

    let (width, height) = if image_aspect > container_aspect {
        (container_width, container_width / image_aspect)
    } else {
        (container_height * image_aspect, container_height)
    };

    DisplayLayout {
        width,
        height,
        offset_x: (container_width - width) / 2.0,
        offset_y: (container_height - height) / 2.0,
    }
}

/// Pixels currently on screen plus their text annotations
pub struct DisplaySurface {
    image: RgbaImage,
    labels: Vec<TextLabel>,
    layout: DisplayLayout,
    /// Number of times the surface was reallocated
    resize_count: u64,
}

impl DisplaySurface {
    fn new() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
            labels: Vec::new(),
            layout: DisplayLayout::default(),
            resize_count: 0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    pub fn layout(&self) -> DisplayLayout {
        self.layout
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }
}

/// Presents processed frames onto a display surface
pub struct RenderPipeline {
    surface: DisplaySurface,
    overlay: OverlayOptions,
    container_width: f32,
    container_height: f32,
    max_display_width: f32,
}

impl RenderPipeline {
    /// Create a pipeline for a container, capped at `max_display_width`
    pub fn new(container_width: f32, container_height: f32, max_display_width: u32) -> Self {
        Self {
            surface: DisplaySurface::new(),
            overlay: OverlayOptions::default(),
            container_width,
            container_height,
            max_display_width: max_display_width.max(1) as f32,
        }
    }

    pub fn set_overlay(&mut self, overlay: OverlayOptions) {
        self.overlay = overlay;
    }

    pub fn overlay(&self) -> OverlayOptions {
        self.overlay
    }

    /// Update the container size, e.g. on window resize
    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.container_width = width;
        self.container_height = height;
        self.refit();
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    /// Draw `buffer` and its detections onto the surface.
    pub fn present(&mut self, buffer: &FrameBuffer, detections: &[DetectionResult], mirrored: bool) {
        if self.surface.image.dimensions() != buffer.dimensions() {
            tracing::debug!(
                width = buffer.width(),
                height = buffer.height(),
                "Resizing display surface"
            );
            self.surface.resize_count += 1;
        }

        let Some(frame) = buffer.to_rgba_image() else {
            tracing::warn!("Frame buffer does not match its dimensions, skipping present");
            return;
        };

        let mut image = if mirrored {
            image::imageops::flip_horizontal(&frame)
        } else {
            frame
        };

        self.surface.labels = draw_detections(&mut image, detections, mirrored, self.overlay);
        self.surface.image = image;
        self.refit();
    }

    fn refit(&mut self) {
        let (width, height) = self.surface.image.dimensions();
        let container_width = self.container_width.min(self.max_display_width);
        self.surface.layout = aspect_fit(width, height, container_width, self.container_height);
    }

    /// Drop the displayed frame
    pub fn clear(&mut self) {
        self.surface = DisplaySurface::new();
    }
}
