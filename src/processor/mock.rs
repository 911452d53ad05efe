//! Call-recording processor for unit tests

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    BackgroundMode, BasicParam, BeautyType, ChromaKeyParam, EffectsProcessor, FrameType,
    MakeupParam, MirrorMode, ProcessorCallbacks, ReshapeParam, VirtualBackgroundOptions,
};
use crate::detection::DetectionResult;
use crate::error::ProcessorError;
use crate::pipeline::frame::FrameBuffer;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init,
    SetBeautyType(BeautyType, bool),
    Basic(BasicParam, f32),
    Reshape(ReshapeParam, f32),
    Makeup(MakeupParam, f32),
    ChromaKey(ChromaKeyParam, f32),
    Background(BackgroundMode),
    Filter(String),
    FilterIntensity(f32),
    Sticker(String),
    RegisterFilter(String),
    RegisterSticker(String),
    Process(FrameType, MirrorMode),
    SetCallbacks(u32),
    Destroy,
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    enabled: HashSet<BeautyType>,
    fail_params: bool,
    fail_process: bool,
    detections: Vec<DetectionResult>,
}

/// Test-side view of a `RecordingProcessor` that has been boxed away
#[derive(Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.state.lock().calls.clear();
    }

    pub fn fail_params(&self, fail: bool) {
        self.state.lock().fail_params = fail;
    }

    pub fn fail_process(&self, fail: bool) {
        self.state.lock().fail_process = fail;
    }

    pub fn set_detections(&self, detections: Vec<DetectionResult>) {
        self.state.lock().detections = detections;
    }

    pub fn is_enabled(&self, kind: BeautyType) -> bool {
        self.state.lock().enabled.contains(&kind)
    }

    pub fn last_basic(&self, param: BasicParam) -> Option<f32> {
        self.calls().iter().rev().find_map(|c| match c {
            Call::Basic(p, v) if *p == param => Some(*v),
            _ => None,
        })
    }

    pub fn last_reshape(&self, param: ReshapeParam) -> Option<f32> {
        self.calls().iter().rev().find_map(|c| match c {
            Call::Reshape(p, v) if *p == param => Some(*v),
            _ => None,
        })
    }

    pub fn last_chroma_key(&self, param: ChromaKeyParam) -> Option<f32> {
        self.calls().iter().rev().find_map(|c| match c {
            Call::ChromaKey(p, v) if *p == param => Some(*v),
            _ => None,
        })
    }

    pub fn last_background(&self) -> Option<BackgroundMode> {
        self.calls().iter().rev().find_map(|c| match c {
            Call::Background(mode) => Some(*mode),
            _ => None,
        })
    }

    pub fn process_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Process(..)))
            .count()
    }
}

pub struct RecordingProcessor {
    handle: MockHandle,
    callbacks: ProcessorCallbacks,
}

impl RecordingProcessor {
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        let processor = Self {
            handle: handle.clone(),
            callbacks: ProcessorCallbacks::default(),
        };
        (processor, handle)
    }

    fn record(&self, call: Call) -> Result<(), ProcessorError> {
        let mut state = self.handle.state.lock();
        state.calls.push(call);
        if state.fail_params {
            return Err(ProcessorError::Engine("injected failure".into()));
        }
        Ok(())
    }
}

impl EffectsProcessor for RecordingProcessor {
    fn init(&mut self) -> Result<(), ProcessorError> {
        self.record(Call::Init)
    }

    fn set_beauty_type_enabled(
        &mut self,
        kind: BeautyType,
        enabled: bool,
    ) -> Result<(), ProcessorError> {
        self.record(Call::SetBeautyType(kind, enabled))?;
        let mut state = self.handle.state.lock();
        if enabled {
            state.enabled.insert(kind);
        } else {
            state.enabled.remove(&kind);
        }
        Ok(())
    }

    fn is_beauty_type_enabled(&self, kind: BeautyType) -> bool {
        self.handle.is_enabled(kind)
    }

    fn set_basic_param(&mut self, param: BasicParam, value: f32) -> Result<(), ProcessorError> {
        self.record(Call::Basic(param, value))
    }

    fn set_reshape_param(
        &mut self,
        param: ReshapeParam,
        value: f32,
    ) -> Result<(), ProcessorError> {
        self.record(Call::Reshape(param, value))
    }

    fn set_makeup_param(&mut self, param: MakeupParam, value: f32) -> Result<(), ProcessorError> {
        self.record(Call::Makeup(param, value))
    }

    fn set_chroma_key_param(
        &mut self,
        param: ChromaKeyParam,
        value: f32,
    ) -> Result<(), ProcessorError> {
        self.record(Call::ChromaKey(param, value))
    }

    fn set_virtual_background(
        &mut self,
        options: VirtualBackgroundOptions,
    ) -> Result<(), ProcessorError> {
        self.record(Call::Background(options.mode))
    }

    fn set_filter(&mut self, name: &str) -> Result<(), ProcessorError> {
        self.record(Call::Filter(name.to_string()))
    }

    fn set_filter_intensity(&mut self, intensity: f32) -> Result<(), ProcessorError> {
        self.record(Call::FilterIntensity(intensity))
    }

    fn set_sticker(&mut self, name: &str) -> Result<(), ProcessorError> {
        self.record(Call::Sticker(name.to_string()))
    }

    fn register_filter(&mut self, id: &str, _data: &[u8]) -> Result<(), ProcessorError> {
        self.record(Call::RegisterFilter(id.to_string()))
    }

    fn register_sticker(&mut self, id: &str, _data: &[u8]) -> Result<(), ProcessorError> {
        self.record(Call::RegisterSticker(id.to_string()))
    }

    fn process_image(
        &mut self,
        frame: &FrameBuffer,
        frame_type: FrameType,
        mirror: MirrorMode,
    ) -> Result<FrameBuffer, ProcessorError> {
        let (fail, detections) = {
            let mut state = self.handle.state.lock();
            state.calls.push(Call::Process(frame_type, mirror));
            (state.fail_process, state.detections.clone())
        };
        if fail {
            return Err(ProcessorError::Engine("injected processing failure".into()));
        }
        if let Some(callback) = self.callbacks.on_face_landmarks.as_mut() {
            callback(&detections);
        }
        Ok(frame.clone())
    }

    fn set_callbacks(&mut self, callbacks: ProcessorCallbacks) -> Result<(), ProcessorError> {
        self.record(Call::SetCallbacks(callbacks.max_faces))?;
        self.callbacks = callbacks;
        Ok(())
    }

    fn destroy(&mut self) {
        self.handle.state.lock().calls.push(Call::Destroy);
    }
}
