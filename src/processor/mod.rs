//! External effects engine interface
//!
//! The engine that actually computes beauty effects and face detection is an
//! opaque collaborator. This module defines the typed surface the rest of the
//! crate drives:
//! - `EffectsProcessor` - parameter setters, resource registration, frame processing
//! - parameter enums (`BasicParam`, `ReshapeParam`, ...) naming engine parameters
//! - `VirtualBackgroundOptions` - background replacement configuration
//!
//! All parameter values are in the processor domain, 0.0-1.0.

pub mod passthrough;
pub mod resources;

#[cfg(test)]
pub(crate) mod mock;

pub use passthrough::PassthroughProcessor;
pub use resources::{register_resources, ResourceManifest};

use crate::detection::DetectionResult;
use crate::error::ProcessorError;
use crate::pipeline::frame::FrameBuffer;

/// Feature categories that can be switched on and off as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeautyType {
    Basic,
    Reshape,
    Makeup,
    VirtualBackground,
    ChromaKey,
    Filter,
    Sticker,
}

/// Skin adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicParam {
    Whitening,
    Smoothing,
    Rosiness,
}

impl BasicParam {
    pub const ALL: [BasicParam; 3] = [
        BasicParam::Whitening,
        BasicParam::Smoothing,
        BasicParam::Rosiness,
    ];
}

/// Face shape adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReshapeParam {
    FaceThin,
    FaceVShape,
    FaceNarrow,
    FaceShort,
    Cheekbone,
    Jawbone,
    Chin,
    NoseSlim,
    EyeSize,
    EyeDistance,
}

impl ReshapeParam {
    pub const ALL: [ReshapeParam; 10] = [
        ReshapeParam::FaceThin,
        ReshapeParam::FaceVShape,
        ReshapeParam::FaceNarrow,
        ReshapeParam::FaceShort,
        ReshapeParam::Cheekbone,
        ReshapeParam::Jawbone,
        ReshapeParam::Chin,
        ReshapeParam::NoseSlim,
        ReshapeParam::EyeSize,
        ReshapeParam::EyeDistance,
    ];
}

/// Makeup layers with an intensity parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MakeupParam {
    Lipstick,
    Blush,
}

impl MakeupParam {
    pub const ALL: [MakeupParam; 2] = [MakeupParam::Lipstick, MakeupParam::Blush];
}

/// Chroma-key (green screen) parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaKeyParam {
    /// Key color index mapped to 0.0 (green), 0.5 (blue), 1.0 (red)
    KeyColor,
    Similarity,
    Smoothness,
    Desaturation,
}

impl ChromaKeyParam {
    pub const ALL: [ChromaKeyParam; 4] = [
        ChromaKeyParam::KeyColor,
        ChromaKeyParam::Similarity,
        ChromaKeyParam::Smoothness,
        ChromaKeyParam::Desaturation,
    ];
}

/// Virtual background mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundMode {
    #[default]
    None,
    Blur,
    Image,
}

/// Replacement background configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VirtualBackgroundOptions {
    pub mode: BackgroundMode,
    /// Background picture, required for `BackgroundMode::Image`
    pub image: Option<FrameBuffer>,
}

impl VirtualBackgroundOptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn blur() -> Self {
        Self {
            mode: BackgroundMode::Blur,
            image: None,
        }
    }

    pub fn image(image: FrameBuffer) -> Self {
        Self {
            mode: BackgroundMode::Image,
            image: Some(image),
        }
    }
}

/// Whether a frame belongs to a stream or is a single still
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Consecutive camera frames; the engine may track across them
    Video,
    /// A standalone picture
    Image,
}

/// Mirroring the engine applies to its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    #[default]
    None,
    Horizontal,
}

/// Callback receiving the faces found in the last processed frame
pub type FaceLandmarksCallback = Box<dyn FnMut(&[DetectionResult]) + Send>;

/// Callbacks installed on the engine
pub struct ProcessorCallbacks {
    pub on_face_landmarks: Option<FaceLandmarksCallback>,
    /// Upper bound on faces reported per frame
    pub max_faces: u32,
}

impl Default for ProcessorCallbacks {
    fn default() -> Self {
        Self {
            on_face_landmarks: None,
            max_faces: 10,
        }
    }
}

/// The effects engine as seen by the preview pipeline.
///
/// Implementations hold parameter state between calls; `process_image` applies
/// whatever was last set. Parameter values outside 0.0-1.0 are never sent.
pub trait EffectsProcessor {
    /// Prepare the engine for use
    fn init(&mut self) -> Result<(), ProcessorError>;

    fn set_beauty_type_enabled(&mut self, kind: BeautyType, enabled: bool)
        -> Result<(), ProcessorError>;

    fn is_beauty_type_enabled(&self, kind: BeautyType) -> bool;

    fn set_basic_param(&mut self, param: BasicParam, value: f32) -> Result<(), ProcessorError>;

    fn set_reshape_param(&mut self, param: ReshapeParam, value: f32)
        -> Result<(), ProcessorError>;

    fn set_makeup_param(&mut self, param: MakeupParam, value: f32) -> Result<(), ProcessorError>;

    fn set_chroma_key_param(&mut self, param: ChromaKeyParam, value: f32)
        -> Result<(), ProcessorError>;

    /// Replace the whole virtual background configuration
    fn set_virtual_background(
        &mut self,
        options: VirtualBackgroundOptions,
    ) -> Result<(), ProcessorError>;

    /// Select a registered filter; an empty name clears it
    fn set_filter(&mut self, name: &str) -> Result<(), ProcessorError>;

    fn set_filter_intensity(&mut self, intensity: f32) -> Result<(), ProcessorError>;

    /// Select a registered sticker; an empty name clears it
    fn set_sticker(&mut self, name: &str) -> Result<(), ProcessorError>;

    fn register_filter(&mut self, id: &str, data: &[u8]) -> Result<(), ProcessorError>;

    fn register_sticker(&mut self, id: &str, data: &[u8]) -> Result<(), ProcessorError>;

    /// Run the current effects over one frame
    fn process_image(
        &mut self,
        frame: &FrameBuffer,
        frame_type: FrameType,
        mirror: MirrorMode,
    ) -> Result<FrameBuffer, ProcessorError>;

    fn set_callbacks(&mut self, callbacks: ProcessorCallbacks) -> Result<(), ProcessorError>;

    /// Release engine resources; later calls fail with `Destroyed`
    fn destroy(&mut self);
}
