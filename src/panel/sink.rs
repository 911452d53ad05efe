//! The seam between panel input and the effects engine

use crate::params::{ParameterApplier, ParameterStore};

/// Where panel transitions read and write parameter state.
///
/// The panel only decides what changes; the sink owns the store and the
/// applier and may do more per call (reprocessing a still, for one).
pub trait ParameterSink {
    fn store(&self) -> &ParameterStore;

    fn store_mut(&mut self) -> &mut ParameterStore;

    /// Dispatch a processor-domain value (0.0-1.0). Returns true when applied.
    fn apply(&mut self, tab: &str, function: &str, value: f32) -> bool;

    /// Switch on chroma keying before its parameters are adjusted
    fn enable_chroma_key(&mut self);

    /// Zero every engine parameter behind `tab`
    fn reset_tab(&mut self, tab: &str);

    /// Zero every engine parameter, sticker and chroma key included
    fn reset_processor(&mut self);

    /// Zero the effects hidden while comparing before/after
    fn zero_effects(&mut self);
}

/// Store and applier paired with no further side effects
pub struct ParameterBinding {
    store: ParameterStore,
    applier: ParameterApplier,
}

impl ParameterBinding {
    pub fn new(applier: ParameterApplier) -> Self {
        Self {
            store: ParameterStore::new(),
            applier,
        }
    }

    pub fn applier(&self) -> &ParameterApplier {
        &self.applier
    }

    pub fn applier_mut(&mut self) -> &mut ParameterApplier {
        &mut self.applier
    }
}

impl ParameterSink for ParameterBinding {
    fn store(&self) -> &ParameterStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut ParameterStore {
        &mut self.store
    }

    fn apply(&mut self, tab: &str, function: &str, value: f32) -> bool {
        self.applier.apply(tab, function, value)
    }

    fn enable_chroma_key(&mut self) {
        self.applier.enable_chroma_key();
    }

    fn reset_tab(&mut self, tab: &str) {
        self.applier.reset_tab(tab);
    }

    fn reset_processor(&mut self) {
        self.applier.reset_all();
    }

    fn zero_effects(&mut self) {
        self.applier.zero_effects();
    }
}
