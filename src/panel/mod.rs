//! Effect panel
//!
//! - `state` - the tab/function/sub-option state machine
//! - `sink` - where its parameter changes go

pub mod sink;
pub mod state;

pub use sink::{ParameterBinding, ParameterSink};
pub use state::{
    key_color_index, PanelControls, PanelEvent, PanelMode, PanelState, PanelStateMachine,
    SliderControl,
};
