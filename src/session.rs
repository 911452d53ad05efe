//! Preview session
//!
//! Owns one effects engine and everything around it: the parameter store,
//! the panel, the frame scheduler, the display surface and the status board.
//! The host forwards UI events to the matching methods and calls
//! [`PreviewSession::tick`] once per display refresh while
//! [`PreviewSession::is_running`] is true.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::capture::save_capture;
use crate::comparator::BeforeAfterComparator;
use crate::config::{tabs, AppSettings, PanelConfig};
use crate::detection::{DetectionResult, DetectionSlot};
use crate::error::{CaptureError, ProcessorError};
use crate::panel::{PanelEvent, PanelState, PanelStateMachine, ParameterBinding, ParameterSink};
use crate::params::{ParameterApplier, ParameterKey, ParameterStore};
use crate::pipeline::frame::FrameBuffer;
use crate::pipeline::render::{DisplaySurface, RenderPipeline};
use crate::pipeline::scheduler::{FramePipeline, FrameScheduler, SchedulerState, TickOutcome};
use crate::pipeline::source::{FrameSource, StillImageSource};
use crate::processor::{
    register_resources, EffectsProcessor, FrameType, MirrorMode, ProcessorCallbacks,
};
use crate::status::{StatusBoard, StatusMessage, StatusSender};
use crate::telemetry::{PipelineCounters, ProcessingStats};

/// Default preview container before the host reports its size
const DEFAULT_CONTAINER: (f32, f32) = (1280.0, 720.0);

/// Process and present stages handed to the scheduler
struct Stages {
    binding: ParameterBinding,
    render: RenderPipeline,
    detections: DetectionSlot,
}

impl FramePipeline for Stages {
    fn process(
        &mut self,
        frame: &FrameBuffer,
        frame_type: FrameType,
    ) -> Result<FrameBuffer, ProcessorError> {
        let applier = self.binding.applier_mut();
        if !applier.is_ready() {
            // Without an engine the preview shows the raw source
            return Ok(frame.clone());
        }
        // Mirroring happens at present time so the processed frame stays
        // usable for capture
        applier
            .processor_mut()
            .process_image(frame, frame_type, MirrorMode::None)
    }

    fn present(&mut self, frame: &FrameBuffer, mirrored: bool) {
        self.render.set_overlay(self.binding.applier().overlay());
        let detections = self.detections.snapshot();
        self.render.present(frame, &detections, mirrored);
    }
}

/// Everything a parameter change can touch
struct EngineContext {
    stages: Stages,
    scheduler: FrameScheduler,
    /// The decoded picture while a still is the active source
    still: Option<FrameBuffer>,
}

impl EngineContext {
    /// Run the still through the engine again so it shows current parameters
    fn reprocess_still(&mut self) {
        if let Some(still) = &self.still {
            self.scheduler.process_still(still, &mut self.stages);
        }
    }
}

impl ParameterSink for EngineContext {
    fn store(&self) -> &ParameterStore {
        self.stages.binding.store()
    }

    fn store_mut(&mut self) -> &mut ParameterStore {
        self.stages.binding.store_mut()
    }

    fn apply(&mut self, tab: &str, function: &str, value: f32) -> bool {
        let applied = self.stages.binding.apply(tab, function, value);
        if applied {
            self.reprocess_still();
        }
        applied
    }

    fn enable_chroma_key(&mut self) {
        self.stages.binding.enable_chroma_key();
    }

    fn reset_tab(&mut self, tab: &str) {
        self.stages.binding.reset_tab(tab);
        self.reprocess_still();
    }

    fn reset_processor(&mut self) {
        self.stages.binding.reset_processor();
        self.reprocess_still();
    }

    fn zero_effects(&mut self) {
        self.stages.binding.zero_effects();
        self.reprocess_still();
    }
}

/// A running preview
pub struct PreviewSession {
    settings: AppSettings,
    engine: EngineContext,
    panel: PanelStateMachine,
    comparator: BeforeAfterComparator,
    status: StatusBoard,
    shut_down: bool,
}

impl PreviewSession {
    /// Build a session around `processor`.
    ///
    /// With missing credentials the engine is left uninitialized: a status
    /// message is posted and every parameter change becomes a no-op.
    pub fn new(processor: Box<dyn EffectsProcessor>, settings: AppSettings, config: PanelConfig) -> Self {
        let status = StatusBoard::new(settings.status_duration());
        let sender = status.sender();
        let config = Arc::new(config);
        let detections = DetectionSlot::new();

        let mut applier = ParameterApplier::new(processor, config.clone(), sender.clone());
        applier.set_preset_background(settings.preset_background.clone());

        match settings.credentials.validate() {
            Ok(()) => start_engine(&mut applier, &settings, &detections, &sender),
            Err(e) => {
                tracing::error!("Effects engine not started: {}", e);
                sender.error(e.to_string());
            }
        }

        let mut panel = PanelStateMachine::new(config, &settings.initial_tab);
        let notices = sender.clone();
        panel.subscribe(move |event| {
            if let PanelEvent::ComingSoon { label, .. } = event {
                notices.info(format!("{label} is coming soon"));
            }
        });

        let render = RenderPipeline::new(
            DEFAULT_CONTAINER.0,
            DEFAULT_CONTAINER.1,
            settings.max_display_width,
        );

        let comparator = BeforeAfterComparator::new(settings.comparison_keys.clone());

        Self {
            engine: EngineContext {
                stages: Stages {
                    binding: ParameterBinding::new(applier),
                    render,
                    detections,
                },
                scheduler: FrameScheduler::new(sender),
                still: None,
            },
            panel,
            comparator,
            status,
            settings,
            shut_down: false,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn is_engine_ready(&self) -> bool {
        self.engine.stages.binding.applier().is_ready()
    }

    pub fn status_sender(&self) -> StatusSender {
        self.status.sender()
    }

    // Sources

    /// Preview a live source. Any still or previous source is dropped.
    pub fn start_live(&mut self, source: Box<dyn FrameSource>) {
        self.engine.still = None;
        self.engine.scheduler.start(source);
    }

    /// Open the configured camera and preview it
    #[cfg(feature = "camera")]
    pub fn start_camera(&mut self) -> bool {
        match crate::pipeline::camera::CameraSource::open(&self.settings.camera) {
            Ok(camera) => {
                self.start_live(Box::new(camera));
                true
            }
            Err(e) => {
                tracing::error!("Failed to open camera: {}", e);
                self.status.sender().alert(e.to_string());
                false
            }
        }
    }

    /// Stop the live source and show a picture file instead
    pub fn open_image(&mut self, path: &Path) -> bool {
        self.engine.scheduler.stop();
        let frame = StillImageSource::open(path).and_then(|mut source| source.acquire());
        match frame {
            Ok(frame) => {
                self.show_still(frame);
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to open image");
                let sender = self.status.sender();
                if e.is_blocking() {
                    sender.alert(e.to_string());
                } else {
                    sender.warning(e.to_string());
                }
                false
            }
        }
    }

    /// Show a decoded picture, processed once with the current parameters
    pub fn show_still(&mut self, frame: FrameBuffer) {
        self.engine.scheduler.stop();
        tracing::info!(width = frame.width(), height = frame.height(), "Showing still");
        self.engine.still = Some(frame);
        self.engine.reprocess_still();
    }

    /// One display refresh
    pub fn tick(&mut self) -> TickOutcome {
        self.engine.scheduler.tick(&mut self.engine.stages)
    }

    /// True while a live source wants further ticks
    pub fn is_running(&self) -> bool {
        self.engine.scheduler.is_running()
    }

    pub fn stop(&mut self) {
        self.engine.scheduler.stop();
    }

    // Panel

    pub fn select_tab(&mut self, tab: &str) {
        self.panel.select_tab(tab, &mut self.engine);
    }

    pub fn select_function(&mut self, function: &str) {
        self.panel.select_function(function, &mut self.engine);
    }

    pub fn select_sub_option(&mut self, index: usize) {
        self.panel.select_sub_option(index, &mut self.engine);
    }

    pub fn move_slider(&mut self, value: i32) -> bool {
        self.panel.move_slider(value, &mut self.engine)
    }

    pub fn off_or_close(&mut self) {
        self.panel.off_or_close(&mut self.engine);
    }

    pub fn reset_all(&mut self) {
        self.panel.reset_all(&mut self.engine);
    }

    pub fn dismiss_panel(&mut self) {
        self.panel.dismiss();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PanelEvent) + 'static) {
        self.panel.subscribe(listener);
    }

    /// Before/after button pressed
    pub fn press_compare(&mut self) -> bool {
        self.comparator.on_press_start(&mut self.engine)
    }

    /// Before/after button released
    pub fn release_compare(&mut self) -> bool {
        self.comparator.on_press_end(&mut self.engine, &mut self.panel)
    }

    /// Use `path` for the "image" virtual background, re-applying it if that
    /// background is on
    pub fn set_background_image(&mut self, path: PathBuf) {
        self.engine
            .stages
            .binding
            .applier_mut()
            .set_custom_background(Some(path));
        let key = ParameterKey::new(tabs::VIRTUAL_BG, "image");
        if self.engine.store().toggle_value(&key) {
            self.engine.apply(tabs::VIRTUAL_BG, "image", 1.0);
        }
    }

    pub fn panel_state(&self) -> &PanelState {
        self.panel.state()
    }

    pub fn store(&self) -> &ParameterStore {
        self.engine.store()
    }

    // Output

    /// Save the last processed frame into the capture directory
    pub fn capture(&mut self) -> Result<PathBuf, CaptureError> {
        let dir = self.settings.capture_dir();
        let result = save_capture(
            self.engine.scheduler.last_processed(),
            &dir,
            &self.settings.capture_prefix,
        );
        match &result {
            Ok(path) => self
                .status
                .sender()
                .info(format!("Saved {}", path.display())),
            Err(e) => {
                tracing::warn!("Capture failed: {}", e);
                self.status.sender().error(e.to_string());
            }
        }
        result
    }

    pub fn surface(&self) -> &DisplaySurface {
        self.engine.stages.render.surface()
    }

    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.engine.stages.render.set_container_size(width, height);
    }

    pub fn detections(&self) -> Vec<DetectionResult> {
        self.engine.stages.detections.snapshot()
    }

    /// Drain and expire status messages
    pub fn poll_status(&mut self, now: Instant) -> Option<&StatusMessage> {
        self.status.poll(now)
    }

    pub fn acknowledge_status(&mut self) {
        self.status.acknowledge();
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.engine.scheduler.state()
    }

    pub fn counters(&self) -> PipelineCounters {
        self.engine.scheduler.counters()
    }

    pub fn processing_stats(&self) -> ProcessingStats {
        self.engine.scheduler.processing_stats()
    }

    /// Stop the source, destroy the engine and drop retained frames.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.engine.scheduler.stop();
        self.engine.scheduler.clear_last_processed();
        self.engine.still = None;
        self.engine.stages.detections.clear();
        self.engine.stages.render.clear();
        self.engine.stages.binding.applier_mut().destroy();
        tracing::info!("Preview session shut down");
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Initialize the engine, register resources and install callbacks
fn start_engine(
    applier: &mut ParameterApplier,
    settings: &AppSettings,
    detections: &DetectionSlot,
    status: &StatusSender,
) {
    if let Err(e) = applier.initialize() {
        tracing::error!("Failed to initialize effects engine: {}", e);
        status.error(format!("Failed to initialize effects engine: {e}"));
        return;
    }

    if let Some(root) = &settings.resource_dir {
        let report = register_resources(applier.processor_mut(), root, &settings.resources);
        if !report.all_registered() {
            status.warning(format!(
                "{} effect resources failed to load",
                report.failed.len()
            ));
        }
    }

    let slot = detections.clone();
    let callbacks = ProcessorCallbacks {
        on_face_landmarks: Some(Box::new(move |faces: &[DetectionResult]| {
            slot.replace(faces.to_vec());
        })),
        max_faces: settings.max_faces,
    };
    if let Err(e) = applier.processor_mut().set_callbacks(callbacks) {
        tracing::warn!("Failed to install engine callbacks: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::detection::NormalizedRect;
    use crate::pipeline::source::ChannelSource;
    use crate::processor::mock::{Call, MockHandle, RecordingProcessor};
    use crate::processor::{BackgroundMode, BasicParam, BeautyType};
    use crate::status::StatusLevel;

    fn settings() -> AppSettings {
        AppSettings {
            credentials: Credentials {
                app_id: "id".into(),
                app_key: "key".into(),
            },
            capture_dir: Some(
                std::env::temp_dir().join(format!("beauty_session_{}", std::process::id())),
            ),
            ..AppSettings::default()
        }
    }

    fn session_with(settings: AppSettings) -> (PreviewSession, MockHandle) {
        let (processor, handle) = RecordingProcessor::new();
        let session = PreviewSession::new(Box::new(processor), settings, PanelConfig::builtin());
        (session, handle)
    }

    fn session() -> (PreviewSession, MockHandle) {
        session_with(settings())
    }

    fn face() -> DetectionResult {
        DetectionResult {
            rect: NormalizedRect {
                x: 0.25,
                y: 0.25,
                width: 0.5,
                height: 0.5,
            },
            score: 0.9,
            key_points: Vec::new(),
            face_id: 1,
        }
    }

    #[test]
    fn test_engine_startup_sequence() {
        let (session, handle) = session();
        assert!(session.is_engine_ready());
        assert_eq!(
            handle.calls(),
            vec![
                Call::Init,
                Call::SetBeautyType(BeautyType::Basic, true),
                Call::SetBeautyType(BeautyType::Reshape, true),
                Call::SetBeautyType(BeautyType::Makeup, true),
                Call::SetBeautyType(BeautyType::VirtualBackground, true),
                Call::SetBeautyType(BeautyType::ChromaKey, false),
                Call::SetCallbacks(10),
            ]
        );
    }

    #[test]
    fn test_missing_credentials_leave_engine_off() {
        let (mut session, handle) = session_with(AppSettings::default());
        assert!(!session.is_engine_ready());
        let message = session.poll_status(Instant::now()).cloned().unwrap();
        assert_eq!(message.text, "Please configure appId and appKey");

        session.select_function("smooth");
        session.move_slider(50);
        assert!(handle.calls().is_empty());
        // The slider still moves
        assert_eq!(session.panel_state().slider_value, 50);
    }

    #[test]
    fn test_live_preview_is_mirrored_and_collects_faces() {
        let (mut session, handle) = session();
        handle.set_detections(vec![face()]);
        let (tx, source) = ChannelSource::bounded(2);
        session.start_live(Box::new(source));

        assert_eq!(session.tick(), TickOutcome::NotReady);
        tx.send(FrameBuffer::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap());
        assert_eq!(session.tick(), TickOutcome::Presented);

        assert!(handle
            .calls()
            .contains(&Call::Process(FrameType::Video, MirrorMode::None)));
        assert_eq!(session.surface().image().get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(session.detections().len(), 1);
        assert!(!session.scheduler_state().frame_in_flight);
    }

    #[test]
    fn test_engine_error_drops_frame_and_keeps_running() {
        let (mut session, handle) = session();
        let (tx, source) = ChannelSource::bounded(1);
        session.start_live(Box::new(source));

        handle.fail_process(true);
        tx.send(FrameBuffer::filled(2, 2, [9; 4]));
        assert_eq!(session.tick(), TickOutcome::Dropped);
        assert!(session.is_running());
        assert!(!session.scheduler_state().frame_in_flight);
        assert_eq!(session.counters().failed, 1);
        assert!(matches!(session.capture(), Err(CaptureError::NoFrame)));

        handle.fail_process(false);
        tx.send(FrameBuffer::filled(2, 2, [9; 4]));
        assert_eq!(session.tick(), TickOutcome::Presented);
    }

    #[test]
    fn test_live_blur_scenario() {
        let (mut session, handle) = session();
        let (_tx, source) = ChannelSource::bounded(1);
        session.start_live(Box::new(source));

        session.select_tab("virtual_bg");
        session.select_function("blur");
        assert_eq!(handle.last_background(), Some(BackgroundMode::Blur));
        session.select_function("blur");
        assert_eq!(handle.last_background(), Some(BackgroundMode::None));
        // Live source: parameter changes do not process anything themselves
        assert_eq!(handle.process_count(), 0);
    }

    #[test]
    fn test_switching_to_still_reprocesses_once() {
        let (mut session, handle) = session();
        let (tx, source) = ChannelSource::bounded(1);
        session.start_live(Box::new(source));
        session.select_function("smooth");
        session.move_slider(60);
        handle.clear();

        session.show_still(FrameBuffer::filled(4, 4, [10; 4]));
        assert!(!session.is_running());
        assert!(!tx.send(FrameBuffer::filled(1, 1, [0; 4])));
        assert_eq!(
            handle.calls(),
            vec![Call::Process(FrameType::Image, MirrorMode::None)]
        );
        assert_eq!(session.surface().dimensions(), (4, 4));
    }

    #[test]
    fn test_still_follows_parameter_changes() {
        let (mut session, handle) = session();
        session.show_still(FrameBuffer::filled(4, 4, [10; 4]));
        session.select_function("smooth");
        session.move_slider(30);
        handle.clear();

        session.move_slider(40);
        assert_eq!(
            handle.calls(),
            vec![
                Call::Basic(BasicParam::Smoothing, 0.4),
                Call::Process(FrameType::Image, MirrorMode::None),
            ]
        );
        // Stills are not driven by the refresh loop
        assert_eq!(session.tick(), TickOutcome::Stopped);
    }

    #[test]
    fn test_open_image_rejects_unsupported_files() {
        let (mut session, _handle) = session();
        session.poll_status(Instant::now());
        assert!(!session.open_image(Path::new("notes.txt")));
        let message = session.poll_status(Instant::now()).cloned().unwrap();
        assert_eq!(message.level, StatusLevel::Alert);
    }

    #[test]
    fn test_open_image_decodes_file() {
        let (mut session, handle) = session();
        let path = std::env::temp_dir().join(format!("beauty_open_{}.png", std::process::id()));
        image::RgbaImage::from_pixel(6, 3, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();
        assert!(session.open_image(&path));
        assert_eq!(handle.process_count(), 1);
        assert_eq!(session.surface().dimensions(), (6, 3));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_capture() {
        let (mut session, _handle) = session();
        assert!(matches!(session.capture(), Err(CaptureError::NoFrame)));

        session.show_still(FrameBuffer::filled(3, 3, [200; 4]));
        let path = session.capture().unwrap();
        assert!(path.exists());
        assert!(path.starts_with(session.settings().capture_dir()));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_disabled_function_posts_notice() {
        let (mut session, _handle) = session();
        session.select_tab("body");
        session.select_function("slim");
        let message = session.poll_status(Instant::now()).cloned().unwrap();
        assert_eq!(message.text, "Slim is coming soon");
    }

    #[test]
    fn test_compare_round_trip() {
        let (mut session, handle) = session();
        session.select_function("white");
        session.move_slider(55);
        let before = session.store().clone();

        assert!(session.press_compare());
        assert_eq!(handle.last_basic(BasicParam::Whitening), Some(0.0));
        assert!(session.release_compare());
        assert_eq!(handle.last_basic(BasicParam::Whitening), Some(0.55));
        assert_eq!(session.store(), &before);
    }

    #[test]
    fn test_background_image_selection() {
        let (mut session, handle) = session();
        session.select_tab("virtual_bg");
        session.select_function("image");
        assert_eq!(handle.last_background(), Some(BackgroundMode::None));

        let path = std::env::temp_dir().join(format!("beauty_bg_{}.png", std::process::id()));
        image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]))
            .save(&path)
            .unwrap();
        session.set_background_image(path.clone());
        assert_eq!(handle.last_background(), Some(BackgroundMode::Image));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_shutdown() {
        let (mut session, handle) = session();
        let (tx, source) = ChannelSource::bounded(1);
        session.start_live(Box::new(source));
        tx.send(FrameBuffer::filled(2, 2, [0; 4]));
        session.tick();

        session.shutdown();
        assert!(!session.is_running());
        assert!(!session.is_engine_ready());
        assert!(handle.calls().contains(&Call::Destroy));
        assert!(matches!(session.capture(), Err(CaptureError::NoFrame)));

        // Idempotent, including the Drop that follows
        session.shutdown();
        assert_eq!(
            handle.calls().iter().filter(|c| **c == Call::Destroy).count(),
            1
        );
    }
}
