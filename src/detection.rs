//! Face detection results delivered by the effects engine callback

use std::sync::Arc;

use parking_lot::Mutex;

/// Axis-aligned box in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A facial landmark in normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    /// Per-point visibility score, when the engine provides one
    pub visibility: Option<f32>,
}

impl KeyPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    /// Points with a visibility at or below 0.5 are not drawn
    pub fn is_visible(&self) -> bool {
        self.visibility.map_or(true, |v| v > 0.5)
    }
}

/// One detected face
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    pub rect: NormalizedRect,
    /// Detector confidence
    pub score: f32,
    pub key_points: Vec<KeyPoint>,
    /// Tracking id, negative when untracked
    pub face_id: i32,
}

/// Latest detection results, shared between the engine callback and the
/// render path. Each callback replaces the previous results wholesale.
#[derive(Debug, Clone, Default)]
pub struct DetectionSlot {
    latest: Arc<Mutex<Vec<DetectionResult>>>,
}

impl DetectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede the previous results
    pub fn replace(&self, results: Vec<DetectionResult>) {
        *self.latest.lock() = results;
    }

    /// Copy of the current results
    pub fn snapshot(&self) -> Vec<DetectionResult> {
        self.latest.lock().clone()
    }

    pub fn clear(&self) {
        self.latest.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.latest.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.lock().is_empty()
    }
}
