//! Panel state machine
//!
//! Tracks which tab, function and sub-option the user is looking at and turns
//! discrete input events into store writes and parameter dispatches. It has
//! no timers and does no I/O of its own; everything goes through a
//! [`ParameterSink`].

use std::sync::Arc;

use super::sink::ParameterSink;
use crate::config::{tabs, PanelConfig};
use crate::params::applier::{chroma_index_from_slider, chroma_index_to_slider, chroma_index_to_value};
use crate::params::types::{sub_option_tag, FunctionDescriptor, ParameterKey, ParameterValue, SLIDER_MAX};
use crate::params::ParameterStore;

/// Chroma key function whose sub-options apply directly
const KEY_COLOR: &str = "key_color";

/// What the panel is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelMode {
    /// Function list, nothing selected
    #[default]
    Idle,
    /// Slider for the selected function
    FunctionSelected,
    /// Named variants of the selected function
    SubOptionsShown,
}

/// Visible panel state.
///
/// The slider and the sub-option list are never shown together; both are
/// derived from a single [`PanelMode`].
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub active_tab: String,
    pub selected_function: Option<FunctionDescriptor>,
    /// Logical tag of the chosen variant (`style1`, ...)
    pub sub_option: Option<String>,
    /// Slider position while `FunctionSelected`
    pub slider_value: u8,
    mode: PanelMode,
}

impl PanelState {
    fn new(tab: &str) -> Self {
        Self {
            active_tab: tab.to_string(),
            selected_function: None,
            sub_option: None,
            slider_value: 0,
            mode: PanelMode::Idle,
        }
    }

    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    pub fn slider_visible(&self) -> bool {
        self.mode == PanelMode::FunctionSelected
    }

    pub fn sub_options_visible(&self) -> bool {
        self.mode == PanelMode::SubOptionsShown
    }

    /// True when the slider for `(tab, function)` is on screen
    fn shows_slider_for(&self, tab: &str, function: &str) -> bool {
        self.slider_visible()
            && self
                .selected_function
                .as_ref()
                .map_or(false, |f| f.tab == tab && f.key == function)
    }

    fn reset_to_idle(&mut self) {
        self.mode = PanelMode::Idle;
        self.selected_function = None;
        self.sub_option = None;
        self.slider_value = 0;
    }
}

/// Notifications for whoever renders the panel
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    StateChanged { tab: String, mode: PanelMode },
    ParameterChanged { key: ParameterKey, value: ParameterValue },
    /// A disabled function was picked
    ComingSoon { key: ParameterKey, label: String },
}

pub type PanelListener = Box<dyn FnMut(&PanelEvent)>;

/// Slider and toggle access for the panel's host.
///
/// None of these dispatch to the engine; they only move what the panel shows
/// and what the store holds.
pub trait SliderControl {
    fn slider_value(&self, tab: &str, function: &str) -> u8;
    fn update_slider_value(&mut self, tab: &str, function: &str, value: u8);
    fn set_toggle_state(&mut self, tab: &str, function: &str, on: bool);
}

/// Panel driven by discrete UI events
pub struct PanelStateMachine {
    config: Arc<PanelConfig>,
    state: PanelState,
    listeners: Vec<PanelListener>,
}

impl PanelStateMachine {
    /// Mount the panel on `initial_tab` in `Idle`
    pub fn new(config: Arc<PanelConfig>, initial_tab: &str) -> Self {
        let tab = if config.tab(initial_tab).is_some() {
            initial_tab.to_string()
        } else {
            config.tab_ids().next().unwrap_or(tabs::BEAUTY).to_string()
        };
        Self {
            config,
            state: PanelState::new(&tab),
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn config(&self) -> &Arc<PanelConfig> {
        &self.config
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PanelEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: PanelEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    fn notify_state(&mut self) {
        let event = PanelEvent::StateChanged {
            tab: self.state.active_tab.clone(),
            mode: self.state.mode,
        };
        self.emit(event);
    }

    fn set_value(&mut self, sink: &mut dyn ParameterSink, key: ParameterKey, value: ParameterValue) {
        sink.store_mut().set(key.clone(), value);
        self.emit(PanelEvent::ParameterChanged { key, value });
    }

    /// Switch tabs. Always lands in `Idle`.
    pub fn select_tab(&mut self, tab: &str, sink: &mut dyn ParameterSink) {
        if self.config.tab(tab).is_none() {
            tracing::debug!(tab, "Ignoring unknown tab");
            return;
        }
        self.state.active_tab = tab.to_string();
        self.state.reset_to_idle();
        if tab == tabs::CHROMA_KEY {
            sink.enable_chroma_key();
        }
        tracing::debug!(tab, "Tab selected");
        self.notify_state();
    }

    /// Pick a function in the active tab
    pub fn select_function(&mut self, function: &str, sink: &mut dyn ParameterSink) {
        let tab = self.state.active_tab.clone();
        let Some(descriptor) = self.config.function(&tab, function).cloned() else {
            tracing::debug!(tab = %tab, function, "Ignoring unknown function");
            return;
        };

        if !descriptor.enabled {
            tracing::info!(tab = %tab, function, "Function not available yet");
            self.emit(PanelEvent::ComingSoon {
                key: descriptor.parameter_key(),
                label: descriptor.label.clone(),
            });
            return;
        }

        if descriptor.is_toggle() {
            self.flip_toggle(&descriptor, sink);
        } else if descriptor.has_sub_options() {
            self.state.mode = PanelMode::SubOptionsShown;
            self.state.selected_function = Some(descriptor);
            self.state.sub_option = None;
            self.notify_state();
        } else {
            self.state.sub_option = None;
            self.show_slider(descriptor, sink);
        }
    }

    fn flip_toggle(&mut self, descriptor: &FunctionDescriptor, sink: &mut dyn ParameterSink) {
        let key = descriptor.parameter_key();
        let on = !sink.store().toggle_value(&key);
        if on && self.config.is_exclusive(&descriptor.tab) {
            self.switch_off_siblings(descriptor, sink);
        }

        self.set_value(sink, key, ParameterValue::Toggle(on));
        sink.apply(&descriptor.tab, &descriptor.key, if on { 1.0 } else { 0.0 });
        tracing::debug!(tab = %descriptor.tab, function = %descriptor.key, on, "Toggle flipped");

        self.state.reset_to_idle();
        self.notify_state();
    }

    /// Zero every other active function in an exclusive tab
    fn switch_off_siblings(&mut self, selected: &FunctionDescriptor, sink: &mut dyn ParameterSink) {
        let active: Vec<(ParameterKey, ParameterValue)> = sink
            .store()
            .entries_in_tab(&selected.tab)
            .filter(|(k, v)| k.function != selected.key && v.as_bool())
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        for (key, value) in active {
            self.set_value(sink, key.clone(), ParameterValue::zero(value.kind()));
            sink.apply(&key.tab, &key.function, 0.0);
        }
    }

    /// Show the slider for a function, seed it and apply the seed
    fn show_slider(&mut self, descriptor: FunctionDescriptor, sink: &mut dyn ParameterSink) {
        let key = descriptor.parameter_key();
        let exclusive = self.config.is_exclusive(&descriptor.tab);
        if exclusive {
            self.switch_off_siblings(&descriptor, sink);
        }

        // In exclusive tabs a zeroed entry means "was switched off", so it
        // gets the seed again
        let value = match sink.store().get(&key) {
            Some(stored) if !(exclusive && !stored.as_bool()) => stored.as_slider(),
            _ => descriptor.default_value.min(SLIDER_MAX),
        };

        self.set_value(sink, key, ParameterValue::Slider(value));
        sink.apply(&descriptor.tab, &descriptor.key, f32::from(value) / 100.0);

        self.state.mode = PanelMode::FunctionSelected;
        self.state.slider_value = value;
        self.state.selected_function = Some(descriptor);
        self.notify_state();
    }

    /// Choose a variant of the selected function
    pub fn select_sub_option(&mut self, index: usize, sink: &mut dyn ParameterSink) {
        if !self.state.sub_options_visible() {
            tracing::debug!(index, "No sub-options shown");
            return;
        }
        let Some(descriptor) = self.state.selected_function.clone() else {
            return;
        };
        if index >= descriptor.sub_options.len() {
            tracing::warn!(function = %descriptor.key, index, "Sub-option out of range");
            return;
        }

        if descriptor.tab == tabs::CHROMA_KEY && descriptor.key == KEY_COLOR {
            self.set_value(
                sink,
                descriptor.parameter_key(),
                ParameterValue::Slider(chroma_index_to_slider(index)),
            );
            sink.apply(&descriptor.tab, &descriptor.key, chroma_index_to_value(index));
            self.state.reset_to_idle();
            self.notify_state();
            return;
        }

        let tag = sub_option_tag(index);
        tracing::debug!(function = %descriptor.key, tag = %tag, "Sub-option selected");
        self.state.sub_option = Some(tag);
        self.show_slider(descriptor, sink);
    }

    /// Drag the visible slider. Returns false when no slider is shown.
    pub fn move_slider(&mut self, value: i32, sink: &mut dyn ParameterSink) -> bool {
        if !self.state.slider_visible() {
            return false;
        }
        let Some(key) = self.state.selected_function.as_ref().map(|f| f.parameter_key()) else {
            return false;
        };

        let value = value.clamp(0, i32::from(SLIDER_MAX)) as u8;
        self.state.slider_value = value;
        self.set_value(sink, key.clone(), ParameterValue::Slider(value));
        sink.apply(&key.tab, &key.function, f32::from(value) / 100.0)
    }

    /// "Off" / "close" for the active tab: clear its values and zero the engine
    pub fn off_or_close(&mut self, sink: &mut dyn ParameterSink) {
        let tab = self.state.active_tab.clone();
        let toggles_on = active_toggles(sink.store(), Some(&tab));

        let removed = sink.store_mut().clear_by_tab(&tab);
        for key in toggles_on {
            sink.apply(&key.tab, &key.function, 0.0);
            self.emit(PanelEvent::ParameterChanged {
                key,
                value: ParameterValue::Toggle(false),
            });
        }
        sink.reset_tab(&tab);
        tracing::debug!(tab = %tab, cleared = removed.len(), "Tab reset");

        self.state.reset_to_idle();
        self.notify_state();
    }

    /// Clear every stored value and zero the engine
    pub fn reset_all(&mut self, sink: &mut dyn ParameterSink) {
        let toggles_on = active_toggles(sink.store(), None);
        sink.store_mut().clear_all();
        for key in toggles_on {
            sink.apply(&key.tab, &key.function, 0.0);
        }
        sink.reset_processor();
        tracing::info!("All effects reset");

        self.state.reset_to_idle();
        self.notify_state();
    }

    /// Collapse the slider or sub-option list without touching values
    pub fn dismiss(&mut self) {
        if self.state.mode == PanelMode::Idle {
            return;
        }
        self.state.reset_to_idle();
        self.notify_state();
    }

    /// Slider/toggle capability bound to a sink
    pub fn controls<'a>(&'a mut self, sink: &'a mut dyn ParameterSink) -> PanelControls<'a> {
        PanelControls { panel: self, sink }
    }
}

fn active_toggles(store: &ParameterStore, tab: Option<&str>) -> Vec<ParameterKey> {
    store
        .iter()
        .filter(|(k, v)| tab.map_or(true, |t| k.tab == t) && matches!(v, ParameterValue::Toggle(true)))
        .map(|(k, _)| k.clone())
        .collect()
}

/// Chroma key color index for the stored key color, if one was chosen
pub fn key_color_index(store: &ParameterStore) -> Option<usize> {
    store
        .get(&ParameterKey::new(tabs::CHROMA_KEY, KEY_COLOR))
        .map(|v| chroma_index_from_slider(v.as_slider()))
}

/// The panel's slider/toggle capability, see [`SliderControl`]
pub struct PanelControls<'a> {
    panel: &'a mut PanelStateMachine,
    sink: &'a mut dyn ParameterSink,
}

impl SliderControl for PanelControls<'_> {
    fn slider_value(&self, tab: &str, function: &str) -> u8 {
        if self.panel.state.shows_slider_for(tab, function) {
            return self.panel.state.slider_value;
        }
        self.sink.store().slider_value(&ParameterKey::new(tab, function))
    }

    fn update_slider_value(&mut self, tab: &str, function: &str, value: u8) {
        let value = value.min(SLIDER_MAX);
        self.sink
            .store_mut()
            .set(ParameterKey::new(tab, function), ParameterValue::Slider(value));
        if self.panel.state.shows_slider_for(tab, function) {
            self.panel.state.slider_value = value;
        }
    }

    fn set_toggle_state(&mut self, tab: &str, function: &str, on: bool) {
        self.sink
            .store_mut()
            .set(ParameterKey::new(tab, function), ParameterValue::Toggle(on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::sink::ParameterBinding;
    use crate::params::ParameterApplier;
    use crate::processor::mock::{Call, MockHandle, RecordingProcessor};
    use crate::processor::{BackgroundMode, BasicParam, BeautyType, ChromaKeyParam};
    use crate::status::StatusSender;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (PanelStateMachine, ParameterBinding, MockHandle) {
        let config = Arc::new(PanelConfig::builtin());
        let (processor, handle) = RecordingProcessor::new();
        let mut applier =
            ParameterApplier::new(Box::new(processor), config.clone(), StatusSender::detached());
        applier.initialize().unwrap();
        handle.clear();
        let panel = PanelStateMachine::new(config, tabs::BEAUTY);
        (panel, ParameterBinding::new(applier), handle)
    }

    fn key(tab: &str, function: &str) -> ParameterKey {
        ParameterKey::new(tab, function)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let (panel, _, _) = setup();
        assert_eq!(panel.state().mode(), PanelMode::Idle);
        assert_eq!(panel.state().active_tab, "beauty");
        assert!(!panel.state().slider_visible());
        assert!(!panel.state().sub_options_visible());
    }

    #[test]
    fn test_unknown_initial_tab_falls_back() {
        let panel = PanelStateMachine::new(Arc::new(PanelConfig::builtin()), "hair");
        assert_eq!(panel.state().active_tab, "beauty");
    }

    #[test]
    fn test_smooth_scenario() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_tab("beauty", &mut sink);
        panel.select_function("smooth", &mut sink);
        assert!(panel.state().slider_visible());
        assert_eq!(panel.state().slider_value, 0);

        assert!(panel.move_slider(70, &mut sink));
        assert_eq!(handle.last_basic(BasicParam::Smoothing), Some(0.7));
        assert_eq!(sink.store().slider_value(&key("beauty", "smooth")), 70);

        handle.clear();
        panel.off_or_close(&mut sink);
        for param in BasicParam::ALL {
            assert_eq!(handle.last_basic(param), Some(0.0));
        }
        assert_eq!(panel.state().mode(), PanelMode::Idle);
        assert_eq!(sink.store().entries_in_tab("beauty").count(), 0);
    }

    #[test]
    fn test_slider_restores_stored_value() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_function("white", &mut sink);
        panel.move_slider(35, &mut sink);
        panel.select_function("rosiness", &mut sink);
        handle.clear();
        panel.select_function("white", &mut sink);
        assert_eq!(panel.state().slider_value, 35);
        // Re-entering applies the restored value
        assert_eq!(handle.last_basic(BasicParam::Whitening), Some(0.35));
    }

    #[test]
    fn test_move_slider_clamps_and_needs_slider() {
        let (mut panel, mut sink, _) = setup();
        assert!(!panel.move_slider(50, &mut sink));
        panel.select_function("smooth", &mut sink);
        panel.move_slider(250, &mut sink);
        assert_eq!(panel.state().slider_value, 100);
        panel.move_slider(-5, &mut sink);
        assert_eq!(sink.store().slider_value(&key("beauty", "smooth")), 0);
    }

    #[test]
    fn test_select_tab_resets_to_idle() {
        let (mut panel, mut sink, _) = setup();
        panel.select_function("smooth", &mut sink);
        panel.select_tab("reshape", &mut sink);
        assert_eq!(panel.state().mode(), PanelMode::Idle);
        assert!(panel.state().selected_function.is_none());

        panel.select_tab("nonexistent", &mut sink);
        assert_eq!(panel.state().active_tab, "reshape");
    }

    #[test]
    fn test_disabled_function_emits_coming_soon() {
        let (mut panel, mut sink, handle) = setup();
        let events = Rc::new(RefCell::new(Vec::new()));
        let seen = events.clone();
        panel.subscribe(move |e| seen.borrow_mut().push(e.clone()));

        panel.select_function("dark", &mut sink);
        assert_eq!(panel.state().mode(), PanelMode::Idle);
        assert!(handle.calls().is_empty());
        assert!(matches!(
            events.borrow().as_slice(),
            [PanelEvent::ComingSoon { key, .. }] if key.function == "dark"
        ));
    }

    #[test]
    fn test_toggle_flips_and_stays_idle() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_tab("virtual_bg", &mut sink);
        panel.select_function("blur", &mut sink);
        assert_eq!(panel.state().mode(), PanelMode::Idle);
        assert!(sink.store().toggle_value(&key("virtual_bg", "blur")));
        assert_eq!(handle.last_background(), Some(BackgroundMode::Blur));

        panel.select_function("blur", &mut sink);
        assert!(!sink.store().toggle_value(&key("virtual_bg", "blur")));
        assert_eq!(handle.last_background(), Some(BackgroundMode::None));
    }

    #[test]
    fn test_exclusive_toggles_switch_each_other_off() {
        let (mut panel, mut sink, _) = setup();
        panel.select_tab("virtual_bg", &mut sink);
        panel.select_function("blur", &mut sink);
        panel.select_function("preset", &mut sink);
        assert!(!sink.store().toggle_value(&key("virtual_bg", "blur")));
        assert!(sink.store().toggle_value(&key("virtual_bg", "preset")));
    }

    #[test]
    fn test_filter_seed_and_exclusivity() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_tab("filter", &mut sink);
        panel.select_function("natural", &mut sink);
        assert_eq!(panel.state().slider_value, 80);
        assert!(handle.calls().contains(&Call::Filter("natural".into())));
        assert!(handle.calls().contains(&Call::FilterIntensity(0.8)));

        panel.select_function("tender", &mut sink);
        assert_eq!(sink.store().slider_value(&key("filter", "natural")), 0);
        assert_eq!(sink.store().slider_value(&key("filter", "tender")), 80);
        assert!(handle.is_enabled(BeautyType::Filter));

        // A filter that was switched off is seeded again
        panel.select_function("natural", &mut sink);
        assert_eq!(panel.state().slider_value, 80);
    }

    #[test]
    fn test_sticker_seeds_full_strength() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_tab("sticker", &mut sink);
        panel.select_function("rabbit", &mut sink);
        assert_eq!(panel.state().slider_value, 100);
        assert!(handle.calls().contains(&Call::Sticker("rabbit".into())));
    }

    #[test]
    fn test_sub_options_then_slider() {
        let (mut panel, mut sink, _) = setup();
        panel.select_tab("makeup", &mut sink);
        panel.select_function("lipstick", &mut sink);
        assert!(panel.state().sub_options_visible());
        assert!(!panel.state().slider_visible());

        panel.select_sub_option(7, &mut sink);
        assert!(panel.state().sub_options_visible());

        panel.select_sub_option(1, &mut sink);
        assert!(panel.state().slider_visible());
        assert!(!panel.state().sub_options_visible());
        assert_eq!(panel.state().sub_option.as_deref(), Some("style2"));
    }

    #[test]
    fn test_chroma_key_color_round_trip() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_tab("chroma_key", &mut sink);
        assert!(handle.is_enabled(BeautyType::ChromaKey));

        panel.select_function("key_color", &mut sink);
        panel.select_sub_option(1, &mut sink);
        assert_eq!(handle.last_chroma_key(ChromaKeyParam::KeyColor), Some(0.5));
        assert_eq!(panel.state().mode(), PanelMode::Idle);
        assert_eq!(key_color_index(sink.store()), Some(1));
    }

    #[test]
    fn test_off_or_close_is_idempotent() {
        let (mut panel, mut sink, _) = setup();
        panel.select_tab("reshape", &mut sink);
        panel.select_function("big_eye", &mut sink);
        panel.move_slider(40, &mut sink);
        panel.off_or_close(&mut sink);
        panel.select_tab("reshape", &mut sink);
        assert_eq!(sink.store().entries_in_tab("reshape").count(), 0);
        panel.off_or_close(&mut sink);
        panel.select_tab("reshape", &mut sink);
        assert_eq!(sink.store().entries_in_tab("reshape").count(), 0);
    }

    #[test]
    fn test_off_or_close_turns_toggles_off() {
        let (mut panel, mut sink, _) = setup();
        panel.select_tab("face_detection", &mut sink);
        panel.select_function("enable", &mut sink);
        assert!(sink.applier().overlay().enabled);
        panel.off_or_close(&mut sink);
        assert!(!sink.applier().overlay().enabled);
        assert!(!sink.store().toggle_value(&key("face_detection", "enable")));
    }

    #[test]
    fn test_reset_all() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_function("smooth", &mut sink);
        panel.move_slider(60, &mut sink);
        panel.select_tab("face_detection", &mut sink);
        panel.select_function("enable", &mut sink);
        handle.clear();

        panel.reset_all(&mut sink);
        assert!(sink.store().is_empty());
        assert!(!sink.applier().overlay().enabled);
        assert_eq!(handle.last_basic(BasicParam::Smoothing), Some(0.0));
        assert_eq!(handle.last_background(), Some(BackgroundMode::None));
    }

    #[test]
    fn test_reset_all_clears_sticker_and_chroma_key() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_tab("sticker", &mut sink);
        panel.select_function("rabbit", &mut sink);
        panel.select_tab("chroma_key", &mut sink);
        panel.select_function("similarity", &mut sink);
        panel.move_slider(45, &mut sink);
        assert!(handle.is_enabled(BeautyType::ChromaKey));
        handle.clear();

        panel.reset_all(&mut sink);
        assert!(sink.store().is_empty());
        assert!(handle.calls().contains(&Call::Sticker(String::new())));
        assert_eq!(handle.last_chroma_key(ChromaKeyParam::Similarity), Some(0.0));
        assert!(!handle.is_enabled(BeautyType::ChromaKey));
    }

    #[test]
    fn test_controls_follow_visible_slider() {
        let (mut panel, mut sink, handle) = setup();
        panel.select_function("smooth", &mut sink);
        handle.clear();
        {
            let mut controls = panel.controls(&mut sink);
            controls.update_slider_value("beauty", "smooth", 45);
            controls.update_slider_value("beauty", "white", 20);
            controls.set_toggle_state("virtual_bg", "blur", true);
            assert_eq!(controls.slider_value("beauty", "smooth"), 45);
            assert_eq!(controls.slider_value("beauty", "white"), 20);
        }
        assert_eq!(panel.state().slider_value, 45);
        assert!(sink.store().toggle_value(&key("virtual_bg", "blur")));
        // Controls never dispatch
        assert!(handle.calls().is_empty());
    }

    #[test]
    fn test_dismiss_keeps_values() {
        let (mut panel, mut sink, _) = setup();
        panel.select_function("smooth", &mut sink);
        panel.move_slider(30, &mut sink);
        panel.dismiss();
        assert_eq!(panel.state().mode(), PanelMode::Idle);
        assert_eq!(sink.store().slider_value(&key("beauty", "smooth")), 30);
    }
}
