//! Parameter data types
//!
//! Plain data describing what can be adjusted and the values a user has
//! chosen. Nothing here talks to the effects engine; dispatch lives in
//! [`super::applier`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound of the slider UI domain
pub const SLIDER_MAX: u8 = 100;

/// Identifies one adjustable quantity: a function within a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterKey {
    pub tab: String,
    pub function: String,
}

impl ParameterKey {
    /// Create a new key
    pub fn new(tab: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            tab: tab.into(),
            function: function.into(),
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tab, self.function)
    }
}

/// How a function is adjusted in the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    /// Continuous 0-100 slider
    #[default]
    Slider,
    /// On/off switch, never shows a slider
    Toggle,
}

/// A stored parameter value in the UI domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    /// Slider position, 0-100
    Slider(u8),
    /// Toggle state
    Toggle(bool),
}

impl ParameterValue {
    /// Slider value clamped into 0-100
    pub fn slider(value: i32) -> Self {
        ParameterValue::Slider(value.clamp(0, SLIDER_MAX as i32) as u8)
    }

    /// Zero/off value for a function kind
    pub fn zero(kind: FunctionKind) -> Self {
        match kind {
            FunctionKind::Slider => ParameterValue::Slider(0),
            FunctionKind::Toggle => ParameterValue::Toggle(false),
        }
    }

    /// Enforce the slider range
    pub fn clamped(self) -> Self {
        match self {
            ParameterValue::Slider(v) => ParameterValue::Slider(v.min(SLIDER_MAX)),
            toggle => toggle,
        }
    }

    /// Value in the processor domain, 0.0-1.0
    pub fn as_normalized(&self) -> f32 {
        match self {
            ParameterValue::Slider(v) => f32::from((*v).min(SLIDER_MAX)) / 100.0,
            ParameterValue::Toggle(true) => 1.0,
            ParameterValue::Toggle(false) => 0.0,
        }
    }

    /// Slider position; toggles read as 0 or 100
    pub fn as_slider(&self) -> u8 {
        match self {
            ParameterValue::Slider(v) => (*v).min(SLIDER_MAX),
            ParameterValue::Toggle(true) => SLIDER_MAX,
            ParameterValue::Toggle(false) => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            ParameterValue::Slider(v) => *v > 0,
            ParameterValue::Toggle(b) => *b,
        }
    }

    pub fn kind(&self) -> FunctionKind {
        match self {
            ParameterValue::Slider(_) => FunctionKind::Slider,
            ParameterValue::Toggle(_) => FunctionKind::Toggle,
        }
    }
}

/// Convert a processor-domain value back to a slider position.
pub fn slider_from_normalized(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn default_enabled() -> bool {
    true
}

/// One adjustable effect within a tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Function identifier, unique within its tab
    pub key: String,
    /// Owning tab identifier
    pub tab: String,
    /// Display label
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub kind: FunctionKind,
    /// Named variants, shown before the slider
    #[serde(default, rename = "subOptions")]
    pub sub_options: Vec<String>,
    /// Disabled functions show a "coming soon" notice
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Slider seed used the first time the function is opened
    #[serde(default, rename = "defaultValue")]
    pub default_value: u8,
}

impl FunctionDescriptor {
    /// Create an enabled slider function with a zero seed
    pub fn slider(tab: &str, key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            tab: tab.to_string(),
            label: label.to_string(),
            kind: FunctionKind::Slider,
            sub_options: Vec::new(),
            enabled: true,
            default_value: 0,
        }
    }

    /// Create an enabled toggle function
    pub fn toggle(tab: &str, key: &str, label: &str) -> Self {
        Self {
            kind: FunctionKind::Toggle,
            ..Self::slider(tab, key, label)
        }
    }

    pub fn with_sub_options(mut self, options: &[&str]) -> Self {
        self.sub_options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_default(mut self, value: u8) -> Self {
        self.default_value = value.min(SLIDER_MAX);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn parameter_key(&self) -> ParameterKey {
        ParameterKey::new(&self.tab, &self.key)
    }

    pub fn has_sub_options(&self) -> bool {
        !self.sub_options.is_empty()
    }

    pub fn is_toggle(&self) -> bool {
        self.kind == FunctionKind::Toggle
    }
}

/// Logical tag of a sub-option: `style1`, `style2`, ...
pub fn sub_option_tag(index: usize) -> String {
    format!("style{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slider_constructor_clamps() {
        assert_eq!(ParameterValue::slider(-5), ParameterValue::Slider(0));
        assert_eq!(ParameterValue::slider(250), ParameterValue::Slider(100));
        assert_eq!(ParameterValue::Slider(180).clamped(), ParameterValue::Slider(100));
    }

    #[test]
    fn test_normalized_conversion() {
        assert!((ParameterValue::Slider(70).as_normalized() - 0.7).abs() < 1e-6);
        assert_eq!(ParameterValue::Toggle(true).as_normalized(), 1.0);
        assert_eq!(ParameterValue::Toggle(false).as_normalized(), 0.0);
        assert_eq!(slider_from_normalized(0.704), 70);
        assert_eq!(slider_from_normalized(3.0), 100);
        assert_eq!(slider_from_normalized(f32::NAN), 0);
    }

    #[test]
    fn test_key_display_and_equality() {
        let a = ParameterKey::new("beauty", "smooth");
        let b = ParameterKey::new("beauty".to_string(), "smooth");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "beauty/smooth");
        assert_ne!(a, ParameterKey::new("beauty:smooth", ""));
    }

    #[test]
    fn test_descriptor_builders() {
        let f = FunctionDescriptor::slider("makeup", "lipstick", "Lipstick")
            .with_sub_options(&["Style 1", "Style 2"]);
        assert!(f.has_sub_options());
        assert!(!f.is_toggle());
        assert_eq!(f.parameter_key(), ParameterKey::new("makeup", "lipstick"));
        assert_eq!(sub_option_tag(0), "style1");

        let t = FunctionDescriptor::toggle("virtual_bg", "blur", "Blur").disabled();
        assert!(t.is_toggle());
        assert!(!t.enabled);
    }

    #[test]
    fn test_descriptor_json_defaults() {
        let json = r#"{"key":"smooth","tab":"beauty"}"#;
        let f: FunctionDescriptor = serde_json::from_str(json).unwrap();
        assert!(f.enabled);
        assert_eq!(f.kind, FunctionKind::Slider);
        assert_eq!(f.default_value, 0);
        assert!(f.sub_options.is_empty());
    }
}
