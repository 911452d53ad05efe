//! Frame pipeline
//!
//! Sources produce frames, the scheduler pushes them through the effects
//! engine one at a time, and the render pipeline composites the result with
//! the detection overlay.

#[cfg(feature = "camera")]
pub mod camera;
pub mod frame;
pub mod overlay;
pub mod render;
pub mod scheduler;
pub mod source;

#[cfg(feature = "camera")]
pub use camera::{list_cameras, CameraInfo, CameraSource};
pub use frame::FrameBuffer;
pub use overlay::{OverlayOptions, TextLabel};
pub use render::{aspect_fit, DisplayLayout, DisplaySurface, RenderPipeline};
pub use scheduler::{FramePipeline, FrameScheduler, SchedulerHandle, SchedulerState, TickOutcome};
pub use source::{ChannelSource, FrameSender, FrameSource, StillImageSource};
