//! Engine stand-in that tracks parameters and returns frames unchanged
//!
//! Used by the demo binary and anywhere the real engine is not linked. It
//! enforces the same lifecycle as the engine: nothing works before `init`,
//! nothing works after `destroy`, and filters/stickers must be registered
//! before they can be selected.

use std::collections::{HashMap, HashSet};

use super::{
    BasicParam, BeautyType, ChromaKeyParam, EffectsProcessor, FrameType, MakeupParam, MirrorMode,
    ProcessorCallbacks, ReshapeParam, VirtualBackgroundOptions,
};
use crate::error::ProcessorError;
use crate::pipeline::frame::FrameBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Ready,
    Destroyed,
}

/// Parameter-tracking processor with identity output
pub struct PassthroughProcessor {
    lifecycle: Lifecycle,
    enabled: HashSet<BeautyType>,
    basic: HashMap<BasicParam, f32>,
    reshape: HashMap<ReshapeParam, f32>,
    makeup: HashMap<MakeupParam, f32>,
    chroma_key: HashMap<ChromaKeyParam, f32>,
    background: VirtualBackgroundOptions,
    filters: HashSet<String>,
    stickers: HashSet<String>,
    filter: String,
    filter_intensity: f32,
    sticker: String,
    callbacks: ProcessorCallbacks,
    frames_processed: u64,
}

impl Default for PassthroughProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PassthroughProcessor {
    /// Create a new, uninitialized processor
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Created,
            enabled: HashSet::new(),
            basic: HashMap::new(),
            reshape: HashMap::new(),
            makeup: HashMap::new(),
            chroma_key: HashMap::new(),
            background: VirtualBackgroundOptions::none(),
            filters: HashSet::new(),
            stickers: HashSet::new(),
            filter: String::new(),
            filter_intensity: 0.0,
            sticker: String::new(),
            callbacks: ProcessorCallbacks::default(),
            frames_processed: 0,
        }
    }

    fn ensure_ready(&self) -> Result<(), ProcessorError> {
        match self.lifecycle {
            Lifecycle::Created => Err(ProcessorError::NotInitialized),
            Lifecycle::Ready => Ok(()),
            Lifecycle::Destroyed => Err(ProcessorError::Destroyed),
        }
    }

    pub fn basic_param(&self, param: BasicParam) -> f32 {
        self.basic.get(&param).copied().unwrap_or(0.0)
    }

    pub fn reshape_param(&self, param: ReshapeParam) -> f32 {
        self.reshape.get(&param).copied().unwrap_or(0.0)
    }

    pub fn makeup_param(&self, param: MakeupParam) -> f32 {
        self.makeup.get(&param).copied().unwrap_or(0.0)
    }

    pub fn chroma_key_param(&self, param: ChromaKeyParam) -> f32 {
        self.chroma_key.get(&param).copied().unwrap_or(0.0)
    }

    pub fn background(&self) -> &VirtualBackgroundOptions {
        &self.background
    }

    pub fn filter(&self) -> (&str, f32) {
        (&self.filter, self.filter_intensity)
    }

    pub fn sticker(&self) -> &str {
        &self.sticker
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

impl EffectsProcessor for PassthroughProcessor {
    fn init(&mut self) -> Result<(), ProcessorError> {
        if self.lifecycle == Lifecycle::Destroyed {
            return Err(ProcessorError::Destroyed);
        }
        self.lifecycle = Lifecycle::Ready;
        tracing::debug!("Passthrough processor initialized");
        Ok(())
    }

    fn set_beauty_type_enabled(
        &mut self,
        kind: BeautyType,
        enabled: bool,
    ) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        if enabled {
            self.enabled.insert(kind);
        } else {
            self.enabled.remove(&kind);
        }
        Ok(())
    }

    fn is_beauty_type_enabled(&self, kind: BeautyType) -> bool {
        self.enabled.contains(&kind)
    }

    fn set_basic_param(&mut self, param: BasicParam, value: f32) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.basic.insert(param, value);
        Ok(())
    }

    fn set_reshape_param(
        &mut self,
        param: ReshapeParam,
        value: f32,
    ) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.reshape.insert(param, value);
        Ok(())
    }

    fn set_makeup_param(&mut self, param: MakeupParam, value: f32) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.makeup.insert(param, value);
        Ok(())
    }

    fn set_chroma_key_param(
        &mut self,
        param: ChromaKeyParam,
        value: f32,
    ) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.chroma_key.insert(param, value);
        Ok(())
    }

    fn set_virtual_background(
        &mut self,
        options: VirtualBackgroundOptions,
    ) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.background = options;
        Ok(())
    }

    fn set_filter(&mut self, name: &str) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        if !name.is_empty() && !self.filters.contains(name) {
            return Err(ProcessorError::ResourceNotRegistered(name.to_string()));
        }
        self.filter = name.to_string();
        Ok(())
    }

    fn set_filter_intensity(&mut self, intensity: f32) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.filter_intensity = intensity;
        Ok(())
    }

    fn set_sticker(&mut self, name: &str) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        if !name.is_empty() && !self.stickers.contains(name) {
            return Err(ProcessorError::ResourceNotRegistered(name.to_string()));
        }
        self.sticker = name.to_string();
        Ok(())
    }

    fn register_filter(&mut self, id: &str, _data: &[u8]) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.filters.insert(id.to_string());
        Ok(())
    }

    fn register_sticker(&mut self, id: &str, _data: &[u8]) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.stickers.insert(id.to_string());
        Ok(())
    }

    fn process_image(
        &mut self,
        frame: &FrameBuffer,
        _frame_type: FrameType,
        mirror: MirrorMode,
    ) -> Result<FrameBuffer, ProcessorError> {
        self.ensure_ready()?;
        if frame.is_empty() {
            return Err(ProcessorError::InvalidFrame(format!(
                "{}x{}",
                frame.width(),
                frame.height()
            )));
        }
        self.frames_processed += 1;

        if let Some(callback) = self.callbacks.on_face_landmarks.as_mut() {
            callback(&[]);
        }

        let output = match mirror {
            MirrorMode::None => frame.clone(),
            MirrorMode::Horizontal => match frame.to_rgba_image() {
                Some(image) => {
                    FrameBuffer::from_rgba_image(image::imageops::flip_horizontal(&image))
                }
                None => frame.clone(),
            },
        };
        Ok(output)
    }

    fn set_callbacks(&mut self, callbacks: ProcessorCallbacks) -> Result<(), ProcessorError> {
        self.ensure_ready()?;
        self.callbacks = callbacks;
        Ok(())
    }

    fn destroy(&mut self) {
        self.lifecycle = Lifecycle::Destroyed;
        self.callbacks = ProcessorCallbacks::default();
        tracing::debug!(frames = self.frames_processed, "Passthrough processor destroyed");
    }
}
