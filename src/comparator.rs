//! Press-and-hold before/after comparison
//!
//! While the button is held the engine runs with beauty, reshape, makeup,
//! background and filter zeroed. The store is left untouched, so releasing
//! only has to replay what was saved. One snapshot level; pressing again
//! while held does nothing.

use crate::panel::{ParameterSink, PanelStateMachine, SliderControl};
use crate::params::{ParameterKey, ParameterValue};

/// Before/after toggle over a fixed set of comparison keys.
///
/// Only those keys are replayed on release. Makeup, filter and background
/// values outside the set stay zeroed in the engine until they are changed
/// again, even though the store still holds them. Sticker and chroma key are
/// never touched.
pub struct BeforeAfterComparator {
    keys: Vec<ParameterKey>,
    snapshot: Vec<(ParameterKey, Option<ParameterValue>)>,
    pressed: bool,
}

impl BeforeAfterComparator {
    /// Compare against the parameters in `keys`
    pub fn new(keys: Vec<ParameterKey>) -> Self {
        Self {
            keys,
            snapshot: Vec::new(),
            pressed: false,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn keys(&self) -> &[ParameterKey] {
        &self.keys
    }

    /// Save the comparison values and zero the engine.
    ///
    /// Returns false if already pressed.
    pub fn on_press_start(&mut self, sink: &mut dyn ParameterSink) -> bool {
        if self.pressed {
            return false;
        }
        self.snapshot = self
            .keys
            .iter()
            .map(|key| (key.clone(), sink.store().get(key)))
            .collect();
        self.pressed = true;

        sink.zero_effects();
        tracing::debug!(saved = self.snapshot.len(), "Showing original");
        true
    }

    /// Replay the saved values and move the panel's sliders back.
    ///
    /// Returns false if not pressed.
    pub fn on_press_end(
        &mut self,
        sink: &mut dyn ParameterSink,
        panel: &mut PanelStateMachine,
    ) -> bool {
        if !self.pressed {
            return false;
        }
        self.pressed = false;

        for (key, value) in std::mem::take(&mut self.snapshot) {
            let Some(value) = value else {
                continue;
            };
            sink.apply(&key.tab, &key.function, value.as_normalized());

            let mut controls = panel.controls(sink);
            match value {
                ParameterValue::Slider(v) => controls.update_slider_value(&key.tab, &key.function, v),
                ParameterValue::Toggle(on) => controls.set_toggle_state(&key.tab, &key.function, on),
            }
        }
        tracing::debug!("Effects restored");
        true
    }
}
