//! Beauty Camera Library
//!
//! Live beauty-effects preview around an external effects engine: frame
//! scheduling with at-most-one frame in flight, panel state kept in step with
//! engine parameters, before/after comparison, compositing and capture.

pub mod capture;
pub mod comparator;
pub mod config;
pub mod detection;
pub mod error;
pub mod panel;
pub mod params;
pub mod pipeline;
pub mod processor;
pub mod session;
pub mod status;
pub mod telemetry;

pub use comparator::BeforeAfterComparator;
pub use config::{AppSettings, CameraSettings, Credentials, PanelConfig, TabDescriptor};
pub use detection::{DetectionResult, DetectionSlot, KeyPoint, NormalizedRect};
pub use error::{CaptureError, ConfigError, Error, FrameError, ProcessorError, Result, SourceError};
pub use panel::{PanelEvent, PanelMode, PanelState, PanelStateMachine, ParameterSink, SliderControl};
pub use params::{FunctionDescriptor, FunctionKind, ParameterApplier, ParameterKey, ParameterStore, ParameterValue};
pub use pipeline::{FrameBuffer, FrameScheduler, FrameSource, RenderPipeline, TickOutcome};
pub use processor::{EffectsProcessor, PassthroughProcessor};
pub use session::PreviewSession;
pub use status::{StatusBoard, StatusLevel, StatusMessage, StatusSender};
