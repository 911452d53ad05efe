//! Parameter dispatch to the effects engine
//!
//! `ParameterApplier` turns a `(tab, function, value)` triple into the typed
//! engine call it stands for. It owns value clamping and the few value-domain
//! conversions that are not a plain 0-1 pass-through (chroma key color,
//! filter on/off, background modes). Every engine failure stops here: it is
//! logged, possibly reported on the status channel, and never returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{tabs, PanelConfig};
use crate::error::ProcessorError;
use crate::params::types::{FunctionKind, SLIDER_MAX};
use crate::pipeline::frame::FrameBuffer;
use crate::pipeline::overlay::OverlayOptions;
use crate::processor::{
    BasicParam, BeautyType, ChromaKeyParam, EffectsProcessor, MakeupParam, ReshapeParam,
    VirtualBackgroundOptions,
};
use crate::status::StatusSender;

/// Filter function that switches filtering off
pub const FILTER_OFF: &str = "off";
/// Function name clearing a tab's selection (filter, sticker, background)
pub const NONE_FUNCTION: &str = "none";

/// Number of selectable chroma key colors (green, blue, red)
pub const CHROMA_KEY_COLORS: usize = 3;

/// Dispatched value for a chroma key color index: 0 -> 0.0, 1 -> 0.5, 2 -> 1.0
pub fn chroma_index_to_value(index: usize) -> f32 {
    let index = index.min(CHROMA_KEY_COLORS - 1);
    index as f32 / (CHROMA_KEY_COLORS - 1) as f32
}

/// Color index nearest to a dispatched value
pub fn chroma_value_to_index(value: f32) -> usize {
    if !value.is_finite() {
        return 0;
    }
    let scaled = value.clamp(0.0, 1.0) * (CHROMA_KEY_COLORS - 1) as f32;
    scaled.round() as usize
}

/// Color index recovered from a stored slider position
pub fn chroma_index_from_slider(slider: u8) -> usize {
    chroma_value_to_index(f32::from(slider.min(SLIDER_MAX)) / 100.0)
}

/// Slider position stored for a chroma key color index
pub fn chroma_index_to_slider(index: usize) -> u8 {
    (chroma_index_to_value(index) * 100.0).round() as u8
}

/// Categories switched on right after the engine initializes
const DEFAULT_ENABLED: [BeautyType; 4] = [
    BeautyType::Basic,
    BeautyType::Reshape,
    BeautyType::Makeup,
    BeautyType::VirtualBackground,
];

/// Engine call a panel function maps to
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Basic(BasicParam),
    Reshape(ReshapeParam),
    Makeup(MakeupParam),
    ChromaKey(ChromaKeyParam),
    BackgroundNone,
    BackgroundBlur,
    BackgroundPreset,
    BackgroundImage,
    Filter,
    Sticker,
    OverlayEnabled,
    OverlayIndices,
}

fn resolve(tab: &str, function: &str) -> Option<Target> {
    let target = match (tab, function) {
        (tabs::BEAUTY, "white") => Target::Basic(BasicParam::Whitening),
        (tabs::BEAUTY, "smooth") => Target::Basic(BasicParam::Smoothing),
        (tabs::BEAUTY, "rosiness") => Target::Basic(BasicParam::Rosiness),

        (tabs::RESHAPE, "thin_face") => Target::Reshape(ReshapeParam::FaceThin),
        (tabs::RESHAPE, "v_face") => Target::Reshape(ReshapeParam::FaceVShape),
        (tabs::RESHAPE, "narrow_face") => Target::Reshape(ReshapeParam::FaceNarrow),
        (tabs::RESHAPE, "short_face") => Target::Reshape(ReshapeParam::FaceShort),
        (tabs::RESHAPE, "cheekbone") => Target::Reshape(ReshapeParam::Cheekbone),
        (tabs::RESHAPE, "jawbone") => Target::Reshape(ReshapeParam::Jawbone),
        (tabs::RESHAPE, "chin") => Target::Reshape(ReshapeParam::Chin),
        (tabs::RESHAPE, "nose_slim") => Target::Reshape(ReshapeParam::NoseSlim),
        (tabs::RESHAPE, "big_eye") => Target::Reshape(ReshapeParam::EyeSize),
        (tabs::RESHAPE, "eye_distance") => Target::Reshape(ReshapeParam::EyeDistance),

        (tabs::MAKEUP, "lipstick") => Target::Makeup(MakeupParam::Lipstick),
        (tabs::MAKEUP, "blush") => Target::Makeup(MakeupParam::Blush),

        (tabs::CHROMA_KEY, "key_color") => Target::ChromaKey(ChromaKeyParam::KeyColor),
        (tabs::CHROMA_KEY, "similarity") => Target::ChromaKey(ChromaKeyParam::Similarity),
        (tabs::CHROMA_KEY, "smoothness") => Target::ChromaKey(ChromaKeyParam::Smoothness),
        (tabs::CHROMA_KEY, "desaturation") => Target::ChromaKey(ChromaKeyParam::Desaturation),

        (tabs::VIRTUAL_BG, NONE_FUNCTION) => Target::BackgroundNone,
        (tabs::VIRTUAL_BG, "blur") => Target::BackgroundBlur,
        (tabs::VIRTUAL_BG, "preset") => Target::BackgroundPreset,
        (tabs::VIRTUAL_BG, f) if f.starts_with("image") => Target::BackgroundImage,

        (tabs::FILTER, _) => Target::Filter,
        (tabs::STICKER, _) => Target::Sticker,

        (tabs::FACE_DETECTION, "enable") => Target::OverlayEnabled,
        (tabs::FACE_DETECTION, "show_numbers") => Target::OverlayIndices,

        _ => return None,
    };
    Some(target)
}

fn is_sentinel(tab: &str, function: &str) -> bool {
    match tab {
        tabs::FILTER => function == FILTER_OFF || function == NONE_FUNCTION,
        tabs::STICKER | tabs::VIRTUAL_BG => function == NONE_FUNCTION,
        _ => false,
    }
}

/// Translates panel parameters into engine calls.
pub struct ParameterApplier {
    processor: Box<dyn EffectsProcessor>,
    config: Arc<PanelConfig>,
    status: StatusSender,
    /// False until the engine initialized with valid credentials
    ready: bool,
    preset_background: Option<PathBuf>,
    custom_background: Option<PathBuf>,
    overlay: OverlayOptions,
}

impl ParameterApplier {
    /// Create an applier around an engine that has not been initialized yet
    pub fn new(
        processor: Box<dyn EffectsProcessor>,
        config: Arc<PanelConfig>,
        status: StatusSender,
    ) -> Self {
        Self {
            processor,
            config,
            status,
            ready: false,
            preset_background: None,
            custom_background: None,
            overlay: OverlayOptions::default(),
        }
    }

    /// Initialize the engine and switch on the default effect categories.
    /// Until this succeeds every apply is a no-op.
    pub fn initialize(&mut self) -> Result<(), ProcessorError> {
        self.processor.init()?;
        for kind in DEFAULT_ENABLED {
            self.processor.set_beauty_type_enabled(kind, true)?;
        }
        // Chroma keying stays off until its tab is opened
        self.processor.set_beauty_type_enabled(BeautyType::ChromaKey, false)?;
        self.ready = true;
        tracing::info!("Effects engine initialized");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn config(&self) -> &Arc<PanelConfig> {
        &self.config
    }

    pub fn processor(&self) -> &dyn EffectsProcessor {
        self.processor.as_ref()
    }

    pub fn processor_mut(&mut self) -> &mut dyn EffectsProcessor {
        self.processor.as_mut()
    }

    pub fn overlay(&self) -> OverlayOptions {
        self.overlay
    }

    pub fn set_preset_background(&mut self, path: Option<PathBuf>) {
        self.preset_background = path;
    }

    /// Image installed by the `virtual_bg/image` toggle
    pub fn set_custom_background(&mut self, path: Option<PathBuf>) {
        self.custom_background = path;
    }

    /// Apply one parameter. Returns true when the engine accepted it.
    ///
    /// Unknown `(tab, function)` pairs are ignored. Values are clamped to
    /// 0.0-1.0; toggles are on when the value is positive.
    pub fn apply(&mut self, tab: &str, function: &str, raw_value: f32) -> bool {
        if self.config.function(tab, function).is_none() && !is_sentinel(tab, function) {
            tracing::debug!(tab, function, "Ignoring unknown parameter");
            return false;
        }

        let Some(target) = resolve(tab, function) else {
            tracing::debug!(tab, function, "No engine parameter for function");
            return false;
        };

        // Overlay switches live on this side of the engine boundary
        match target {
            Target::OverlayEnabled => {
                self.overlay.enabled = raw_value > 0.0;
                return true;
            }
            Target::OverlayIndices => {
                self.overlay.show_indices = raw_value > 0.0;
                return true;
            }
            _ => {}
        }

        if !self.ready {
            tracing::warn!(tab, function, "Effects engine not initialized");
            return false;
        }

        let value = if raw_value.is_finite() {
            raw_value.clamp(0.0, 1.0)
        } else {
            0.0
        };

        tracing::debug!(tab, function, value, "Applying parameter");
        match self.dispatch(target, function, value) {
            Ok(applied) => applied,
            Err(e) => {
                self.report_failure(tab, function, &e);
                false
            }
        }
    }

    fn dispatch(&mut self, target: Target, function: &str, value: f32) -> Result<bool, ProcessorError> {
        match target {
            Target::Basic(param) => self.processor.set_basic_param(param, value)?,
            Target::Reshape(param) => self.processor.set_reshape_param(param, value)?,
            Target::Makeup(param) => self.processor.set_makeup_param(param, value)?,
            Target::ChromaKey(param) => {
                self.ensure_enabled(BeautyType::ChromaKey)?;
                let value = match param {
                    ChromaKeyParam::KeyColor => chroma_index_to_value(chroma_value_to_index(value)),
                    _ => value,
                };
                self.processor.set_chroma_key_param(param, value)?;
            }
            Target::BackgroundNone => {
                self.processor
                    .set_beauty_type_enabled(BeautyType::VirtualBackground, false)?;
                self.processor.set_virtual_background(VirtualBackgroundOptions::none())?;
            }
            Target::BackgroundBlur => {
                self.processor
                    .set_beauty_type_enabled(BeautyType::VirtualBackground, true)?;
                let options = if value > 0.0 {
                    VirtualBackgroundOptions::blur()
                } else {
                    VirtualBackgroundOptions::none()
                };
                self.set_background(options)?;
            }
            Target::BackgroundPreset => {
                self.processor
                    .set_beauty_type_enabled(BeautyType::VirtualBackground, true)?;
                if value > 0.0 {
                    let path = self.preset_background.clone();
                    return self.install_background_image(path.as_deref(), "Failed to load preset background");
                }
                self.set_background(VirtualBackgroundOptions::none())?;
            }
            Target::BackgroundImage => {
                self.processor
                    .set_beauty_type_enabled(BeautyType::VirtualBackground, true)?;
                if value > 0.0 {
                    if self.custom_background.is_none() {
                        self.status.info("No background image selected");
                        self.set_background(VirtualBackgroundOptions::none())?;
                        return Ok(false);
                    }
                    let path = self.custom_background.clone();
                    return self.install_background_image(path.as_deref(), "Failed to load background image");
                }
                self.set_background(VirtualBackgroundOptions::none())?;
            }
            Target::Filter => {
                if value <= 0.0 || function == FILTER_OFF || function == NONE_FUNCTION {
                    self.processor.set_beauty_type_enabled(BeautyType::Filter, false)?;
                    self.processor.set_filter("")?;
                } else {
                    self.processor.set_beauty_type_enabled(BeautyType::Filter, true)?;
                    self.processor.set_filter(function)?;
                    self.processor.set_filter_intensity(value)?;
                }
            }
            Target::Sticker => {
                if value <= 0.0 || function == NONE_FUNCTION {
                    self.processor.set_sticker("")?;
                } else {
                    self.processor.set_sticker(function)?;
                }
            }
            Target::OverlayEnabled | Target::OverlayIndices => {}
        }
        Ok(true)
    }

    fn set_background(&mut self, options: VirtualBackgroundOptions) -> Result<(), ProcessorError> {
        tracing::debug!(mode = ?options.mode, "Setting virtual background");
        self.processor.set_virtual_background(options)
    }

    /// Decode `path` and install it as the background.
    ///
    /// A missing or undecodable picture leaves the background off and posts
    /// `failure_message`.
    fn install_background_image(
        &mut self,
        path: Option<&Path>,
        failure_message: &str,
    ) -> Result<bool, ProcessorError> {
        let decoded = match path {
            Some(path) => image::open(path).map_err(|e| format!("{}: {}", path.display(), e)),
            None => Err("no background image configured".to_string()),
        };

        match decoded {
            Ok(image) => {
                let frame = FrameBuffer::from_image(image);
                tracing::debug!(width = frame.width(), height = frame.height(), "Background image loaded");
                self.set_background(VirtualBackgroundOptions::image(frame))?;
                Ok(true)
            }
            Err(reason) => {
                tracing::error!(%reason, "{}", failure_message);
                self.status.error(failure_message);
                self.set_background(VirtualBackgroundOptions::none())?;
                Ok(false)
            }
        }
    }

    fn ensure_enabled(&mut self, kind: BeautyType) -> Result<(), ProcessorError> {
        if !self.processor.is_beauty_type_enabled(kind) {
            self.processor.set_beauty_type_enabled(kind, true)?;
        }
        Ok(())
    }

    /// Switch on chroma keying, e.g. when its tab is opened
    pub fn enable_chroma_key(&mut self) {
        if !self.ready {
            return;
        }
        if let Err(e) = self.ensure_enabled(BeautyType::ChromaKey) {
            self.report_failure(tabs::CHROMA_KEY, "enable", &e);
        }
    }

    fn report_failure(&self, tab: &str, function: &str, error: &ProcessorError) {
        tracing::warn!(tab, function, error = %error, "Failed to apply parameter");
        if let ProcessorError::ResourceNotRegistered(id) = error {
            self.status.error(format!("Effect resource not available: {id}"));
        }
    }

    /// Zero the effects a before/after comparison hides: beauty, reshape,
    /// makeup, background and filter. Sticker and chroma key stay as they are.
    pub fn zero_effects(&mut self) {
        if !self.ready {
            return;
        }
        match self.zero_effect_params() {
            Ok(()) => tracing::debug!("Effect parameters zeroed"),
            Err(e) => tracing::warn!(error = %e, "Failed to zero effect parameters"),
        }
    }

    fn zero_effect_params(&mut self) -> Result<(), ProcessorError> {
        self.zero_basic()?;
        self.zero_reshape()?;
        self.zero_makeup()?;
        self.set_background(VirtualBackgroundOptions::none())?;
        self.zero_filter()
    }

    /// Zero every parameter the engine tracks, clear the sticker, switch
    /// chroma keying off and hide the overlay.
    pub fn reset_all(&mut self) {
        self.overlay = OverlayOptions::default();
        if !self.ready {
            return;
        }
        match self.zero_all_params() {
            Ok(()) => tracing::debug!("All beauty parameters reset"),
            Err(e) => tracing::warn!(error = %e, "Failed to reset beauty parameters"),
        }
    }

    fn zero_all_params(&mut self) -> Result<(), ProcessorError> {
        self.zero_effect_params()?;
        self.processor.set_sticker("")?;
        self.zero_chroma_key()
    }

    /// Zero the engine parameters behind one tab.
    pub fn reset_tab(&mut self, tab: &str) {
        if matches!(tab, tabs::FACE_DETECTION) {
            self.overlay = OverlayOptions::default();
            return;
        }
        if !self.ready {
            return;
        }
        let result = match tab {
            tabs::BEAUTY => self.zero_basic(),
            tabs::RESHAPE => self.zero_reshape(),
            tabs::MAKEUP => self.zero_makeup(),
            tabs::VIRTUAL_BG => self.set_background(VirtualBackgroundOptions::none()),
            tabs::FILTER => self.zero_filter(),
            tabs::STICKER => self.processor.set_sticker(""),
            tabs::CHROMA_KEY => self.zero_chroma_key(),
            _ => Ok(()),
        };
        match result {
            Ok(()) => tracing::debug!(tab, "Tab parameters reset"),
            Err(e) => tracing::warn!(tab, error = %e, "Failed to reset tab"),
        }
    }

    fn zero_basic(&mut self) -> Result<(), ProcessorError> {
        for param in BasicParam::ALL {
            self.processor.set_basic_param(param, 0.0)?;
        }
        Ok(())
    }

    fn zero_reshape(&mut self) -> Result<(), ProcessorError> {
        for param in ReshapeParam::ALL {
            self.processor.set_reshape_param(param, 0.0)?;
        }
        Ok(())
    }

    fn zero_makeup(&mut self) -> Result<(), ProcessorError> {
        for param in MakeupParam::ALL {
            self.processor.set_makeup_param(param, 0.0)?;
        }
        Ok(())
    }

    fn zero_filter(&mut self) -> Result<(), ProcessorError> {
        self.processor.set_beauty_type_enabled(BeautyType::Filter, false)?;
        self.processor.set_filter("")?;
        self.processor.set_filter_intensity(0.0)
    }

    fn zero_chroma_key(&mut self) -> Result<(), ProcessorError> {
        for param in ChromaKeyParam::ALL {
            self.processor.set_chroma_key_param(param, 0.0)?;
        }
        self.processor.set_beauty_type_enabled(BeautyType::ChromaKey, false)
    }

    /// Kind of a configured function, if any
    pub fn function_kind(&self, tab: &str, function: &str) -> Option<FunctionKind> {
        self.config.function(tab, function).map(|f| f.kind)
    }

    /// Tear down the engine; the applier stays usable as a no-op
    pub fn destroy(&mut self) {
        if self.ready {
            self.processor.destroy();
            self.ready = false;
            tracing::info!("Effects engine destroyed");
        }
    }
}
