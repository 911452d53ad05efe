//! Configuration
//!
//! Two documents, both JSON:
//! - [`PanelConfig`] describes the tabs and functions the panel offers. One
//!   table serves every presentation layer; a built-in default is provided.
//! - [`AppSettings`] holds per-user settings (engine credentials, camera
//!   request, capture location) stored in the config directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::types::{FunctionDescriptor, ParameterKey};
use crate::processor::resources::ResourceManifest;

/// Tab ids with dedicated dispatch rules
pub mod tabs {
    pub const BEAUTY: &str = "beauty";
    pub const RESHAPE: &str = "reshape";
    pub const MAKEUP: &str = "makeup";
    pub const FILTER: &str = "filter";
    pub const STICKER: &str = "sticker";
    pub const BODY: &str = "body";
    pub const VIRTUAL_BG: &str = "virtual_bg";
    pub const CHROMA_KEY: &str = "chroma_key";
    pub const QUALITY: &str = "quality";
    pub const FACE_DETECTION: &str = "face_detection";
}

/// One top-level effect category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Functions in an exclusive tab switch each other off (filters)
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub functions: Vec<FunctionDescriptor>,
}

impl TabDescriptor {
    fn new(id: &str, label: &str, functions: Vec<FunctionDescriptor>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            exclusive: false,
            functions,
        }
    }

    fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn function(&self, key: &str) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.key == key)
    }
}

/// Tabs and functions offered by the panel, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub tabs: Vec<TabDescriptor>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PanelConfig {
    /// The stock tab table
    pub fn builtin() -> Self {
        use tabs::*;

        let slider = FunctionDescriptor::slider;
        let toggle = FunctionDescriptor::toggle;
        let styles = ["Style 1", "Style 2", "Style 3"];

        let filters: Vec<FunctionDescriptor> = ResourceManifest::default()
            .filters
            .iter()
            .map(|id| slider(FILTER, id, &title_case(id)).with_default(80))
            .collect();

        Self {
            tabs: vec![
                TabDescriptor::new(
                    BEAUTY,
                    "Beauty",
                    vec![
                        slider(BEAUTY, "white", "Whitening"),
                        slider(BEAUTY, "dark", "Tanning").disabled(),
                        slider(BEAUTY, "smooth", "Smoothing"),
                        slider(BEAUTY, "rosiness", "Rosiness"),
                    ],
                ),
                TabDescriptor::new(
                    RESHAPE,
                    "Reshape",
                    vec![
                        slider(RESHAPE, "thin_face", "Thin Face"),
                        slider(RESHAPE, "v_face", "V Face"),
                        slider(RESHAPE, "narrow_face", "Narrow Face"),
                        slider(RESHAPE, "short_face", "Short Face"),
                        slider(RESHAPE, "cheekbone", "Cheekbone"),
                        slider(RESHAPE, "jawbone", "Jawbone"),
                        slider(RESHAPE, "chin", "Chin"),
                        slider(RESHAPE, "nose_slim", "Slim Nose"),
                        slider(RESHAPE, "big_eye", "Big Eyes"),
                        slider(RESHAPE, "eye_distance", "Eye Distance"),
                    ],
                ),
                TabDescriptor::new(
                    MAKEUP,
                    "Makeup",
                    vec![
                        slider(MAKEUP, "lipstick", "Lipstick").with_sub_options(&styles),
                        slider(MAKEUP, "blush", "Blush").with_sub_options(&styles),
                        slider(MAKEUP, "eyebrow", "Eyebrow").with_sub_options(&styles),
                        slider(MAKEUP, "eyeshadow", "Eyeshadow").with_sub_options(&styles),
                    ],
                ),
                TabDescriptor::new(FILTER, "Filter", filters).exclusive(),
                TabDescriptor::new(
                    STICKER,
                    "Sticker",
                    vec![slider(STICKER, "rabbit", "Rabbit").with_default(100)],
                )
                .exclusive(),
                TabDescriptor::new(BODY, "Body", vec![slider(BODY, "slim", "Slim").disabled()]),
                TabDescriptor::new(
                    VIRTUAL_BG,
                    "Virtual Background",
                    vec![
                        toggle(VIRTUAL_BG, "blur", "Blur"),
                        toggle(VIRTUAL_BG, "preset", "Preset"),
                        toggle(VIRTUAL_BG, "image", "Image"),
                    ],
                )
                .exclusive(),
                TabDescriptor::new(
                    CHROMA_KEY,
                    "Chroma Key",
                    vec![
                        slider(CHROMA_KEY, "key_color", "Key Color")
                            .with_sub_options(&["Green", "Blue", "Red"]),
                        slider(CHROMA_KEY, "similarity", "Similarity"),
                        slider(CHROMA_KEY, "smoothness", "Smoothness"),
                        slider(CHROMA_KEY, "desaturation", "Desaturation"),
                    ],
                ),
                TabDescriptor::new(
                    QUALITY,
                    "Quality",
                    vec![slider(QUALITY, "sharpen", "Sharpen").disabled()],
                ),
                TabDescriptor::new(
                    FACE_DETECTION,
                    "Face Detection",
                    vec![
                        toggle(FACE_DETECTION, "enable", "Show Faces"),
                        toggle(FACE_DETECTION, "show_numbers", "Show Point Numbers"),
                    ],
                ),
            ],
        }
    }

    pub fn tab(&self, id: &str) -> Option<&TabDescriptor> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn function(&self, tab: &str, key: &str) -> Option<&FunctionDescriptor> {
        self.tab(tab).and_then(|t| t.function(key))
    }

    pub fn descriptor(&self, key: &ParameterKey) -> Option<&FunctionDescriptor> {
        self.function(&key.tab, &key.function)
    }

    pub fn tab_ids(&self) -> impl Iterator<Item = &str> {
        self.tabs.iter().map(|t| t.id.as_str())
    }

    pub fn is_exclusive(&self, tab: &str) -> bool {
        self.tab(tab).map_or(false, |t| t.exclusive)
    }

    /// Fill in each function's owning tab, which JSON files may omit
    fn normalize(&mut self) {
        for tab in &mut self.tabs {
            for function in &mut tab.functions {
                function.tab = tab.id.clone();
                function.default_value = function.default_value.min(100);
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn title_case(id: &str) -> String {
    id.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Effects engine license credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "appId", default)]
    pub app_id: String,
    #[serde(rename = "appKey", default)]
    pub app_key: String,
}

impl Credentials {
    /// Blank or placeholder credentials are a configuration failure
    pub fn validate(&self) -> Result<(), ConfigError> {
        let blank = |s: &str| s.trim().is_empty() || s.trim() == "your appId" || s.trim() == "your appKey";
        if blank(&self.app_id) || blank(&self.app_key) {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(())
    }
}

/// Requested camera stream; the device may deliver something else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default)]
    pub index: u32,
    #[serde(rename = "idealWidth", default = "default_camera_width")]
    pub ideal_width: u32,
    #[serde(rename = "idealHeight", default = "default_camera_height")]
    pub ideal_height: u32,
    #[serde(rename = "frameRate", default = "default_camera_fps")]
    pub frame_rate: u32,
}

fn default_camera_width() -> u32 {
    640
}

fn default_camera_height() -> u32 {
    480
}

fn default_camera_fps() -> u32 {
    15
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: 0,
            ideal_width: default_camera_width(),
            ideal_height: default_camera_height(),
            frame_rate: default_camera_fps(),
        }
    }
}

fn default_max_faces() -> u32 {
    10
}

fn default_status_duration_ms() -> u64 {
    2000
}

fn default_max_display_width() -> u32 {
    1200
}

fn default_capture_prefix() -> String {
    "beauty".to_string()
}

fn default_initial_tab() -> String {
    tabs::BEAUTY.to_string()
}

fn default_comparison_keys() -> Vec<ParameterKey> {
    vec![
        ParameterKey::new(tabs::BEAUTY, "white"),
        ParameterKey::new(tabs::BEAUTY, "smooth"),
        ParameterKey::new(tabs::BEAUTY, "rosiness"),
        ParameterKey::new(tabs::RESHAPE, "thin_face"),
    ]
}

/// Per-user application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub camera: CameraSettings,

    /// Faces reported per frame by the engine
    #[serde(rename = "maxFaces", default = "default_max_faces")]
    pub max_faces: u32,

    /// How long a status message stays visible
    #[serde(rename = "statusDurationMs", default = "default_status_duration_ms")]
    pub status_duration_ms: u64,

    /// Cap on the preview container width in pixels
    #[serde(rename = "maxDisplayWidth", default = "default_max_display_width")]
    pub max_display_width: u32,

    /// Where captures are written; the pictures directory when unset
    #[serde(rename = "captureDir", default, skip_serializing_if = "Option::is_none")]
    pub capture_dir: Option<PathBuf>,

    #[serde(rename = "capturePrefix", default = "default_capture_prefix")]
    pub capture_prefix: String,

    /// Image installed by the virtual background "preset" toggle
    #[serde(rename = "presetBackground", default, skip_serializing_if = "Option::is_none")]
    pub preset_background: Option<PathBuf>,

    /// Root of the filter and sticker bundles
    #[serde(rename = "resourceDir", default, skip_serializing_if = "Option::is_none")]
    pub resource_dir: Option<PathBuf>,

    #[serde(default)]
    pub resources: ResourceManifest,

    #[serde(rename = "initialTab", default = "default_initial_tab")]
    pub initial_tab: String,

    /// Parameters zeroed while the before/after button is held
    #[serde(rename = "comparisonKeys", default = "default_comparison_keys")]
    pub comparison_keys: Vec<ParameterKey>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            camera: CameraSettings::default(),
            max_faces: default_max_faces(),
            status_duration_ms: default_status_duration_ms(),
            max_display_width: default_max_display_width(),
            capture_dir: None,
            capture_prefix: default_capture_prefix(),
            preset_background: None,
            resource_dir: None,
            resources: ResourceManifest::default(),
            initial_tab: default_initial_tab(),
            comparison_keys: default_comparison_keys(),
        }
    }
}

impl AppSettings {
    /// Settings file location in the config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("BeautyCamera");
            p.push("settings.json");
            p
        })
    }

    /// Load from the config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&contents)?;
        settings.clamp();
        Ok(settings)
    }

    /// Save to the config directory
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to_file(&path)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Keep numeric settings within usable ranges
    pub fn clamp(&mut self) {
        self.max_faces = self.max_faces.clamp(1, 50);
        self.camera.frame_rate = self.camera.frame_rate.clamp(1, 120);
        self.max_display_width = self.max_display_width.max(1);
    }

    /// Capture directory, resolving the default
    pub fn capture_dir(&self) -> PathBuf {
        self.capture_dir
            .clone()
            .or_else(dirs::picture_dir)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn status_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.status_duration_ms)
    }
}
