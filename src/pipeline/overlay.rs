//! Face detection overlay
//!
//! Draws boxes and landmark markers straight into the surface pixels. Text is
//! not rasterized here; labels are returned with their anchor position for
//! whatever draws text on top of the surface.

use image::{Rgba, RgbaImage};

use crate::detection::DetectionResult;

/// Bounding box color (#F9DA69)
pub const BOX_COLOR: [u8; 4] = [0xF9, 0xDA, 0x69, 0xFF];
/// Landmark color (#F0F0F0)
pub const POINT_COLOR: [u8; 4] = [0xF0, 0xF0, 0xF0, 0xFF];

const BOX_LINE_WIDTH: i64 = 2;
const POINT_RADIUS: f32 = 1.5;
/// Gap between a box and its score label
const SCORE_LABEL_OFFSET: f32 = 5.0;
/// Offset of a landmark index from its point
const INDEX_LABEL_OFFSET: f32 = 3.0;

/// Which annotations are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayOptions {
    pub enabled: bool,
    /// Number each landmark
    pub show_indices: bool,
}

/// A text annotation anchored at a surface position (baseline-left)
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub color: [u8; 4],
}

/// Pixel-space rectangle of a detection, after mirroring
pub fn detection_rect(
    detection: &DetectionResult,
    width: f32,
    height: f32,
    mirrored: bool,
) -> (f32, f32, f32, f32) {
    let w = detection.rect.width * width;
    let h = detection.rect.height * height;
    let mut x = detection.rect.x * width;
    let y = detection.rect.y * height;
    if mirrored {
        x = width - x - w;
    }
    (x, y, w, h)
}

/// Draw every detection onto `canvas`, returning the text labels to show.
pub fn draw_detections(
    canvas: &mut RgbaImage,
    detections: &[DetectionResult],
    mirrored: bool,
    options: OverlayOptions,
) -> Vec<TextLabel> {
    let mut labels = Vec::new();
    if !options.enabled {
        return labels;
    }

    let (width, height) = (canvas.width() as f32, canvas.height() as f32);

    for detection in detections {
        let (x, y, w, h) = detection_rect(detection, width, height, mirrored);
        stroke_rect(canvas, x, y, w, h, BOX_COLOR);

        labels.push(TextLabel {
            text: format!("Score: {:.3}", detection.score),
            x,
            y: y - SCORE_LABEL_OFFSET,
            color: BOX_COLOR,
        });

        if detection.face_id >= 0 {
            labels.push(TextLabel {
                text: format!("ID: {}", detection.face_id),
                x,
                y: y + h + 15.0,
                color: BOX_COLOR,
            });
        }

        for (index, point) in detection.key_points.iter().enumerate() {
            if !point.is_visible() {
                continue;
            }
            let mut px = point.x * width;
            let py = point.y * height;
            if mirrored {
                px = width - px;
            }
            fill_circle(canvas, px, py, POINT_RADIUS, POINT_COLOR);

            if options.show_indices {
                let lx = if mirrored {
                    px - INDEX_LABEL_OFFSET
                } else {
                    px + INDEX_LABEL_OFFSET
                };
                labels.push(TextLabel {
                    text: index.to_string(),
                    x: lx,
                    y: py - INDEX_LABEL_OFFSET,
                    color: POINT_COLOR,
                });
            }
        }
    }

    labels
}

fn put(canvas: &mut RgbaImage, x: i64, y: i64, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    canvas.put_pixel(x as u32, y as u32, Rgba(color));
}

/// Round to a pixel coordinate no further than one line width off `extent`.
/// NaN maps to 0.
fn to_pixel(v: f32, extent: u32) -> i64 {
    (v.round() as i64).clamp(-BOX_LINE_WIDTH, i64::from(extent) + BOX_LINE_WIDTH)
}

fn stroke_rect(canvas: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, color: [u8; 4]) {
    let (width, height) = canvas.dimensions();
    let x0 = to_pixel(x, width);
    let y0 = to_pixel(y, height);
    let x1 = to_pixel(x + w, width);
    let y1 = to_pixel(y + h, height);

    for t in 0..BOX_LINE_WIDTH {
        for px in x0..=x1 {
            put(canvas, px, y0 + t, color);
            put(canvas, px, y1 - t, color);
        }
        for py in y0..=y1 {
            put(canvas, x0 + t, py, color);
            put(canvas, x1 - t, py, color);
        }
    }
}

fn fill_circle(canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: [u8; 4]) {
    let (width, height) = canvas.dimensions();
    let on_canvas = |v: f32, extent: u32| v.is_finite() && v >= -radius && v <= extent as f32 + radius;
    if !on_canvas(cx, width) || !on_canvas(cy, height) {
        return;
    }
    let r = radius.ceil() as i64;
    let (icx, icy) = (cx.floor() as i64, cy.floor() as i64);
    for dy in -r..=r {
        for dx in -r..=r {
            let px = icx + dx;
            let py = icy + dy;
            let ddx = px as f32 + 0.5 - cx;
            let ddy = py as f32 + 0.5 - cy;
            if ddx * ddx + ddy * ddy <= radius * radius {
                put(canvas, px, py, color);
            }
        }
    }
}
