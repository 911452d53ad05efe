//! Frame scheduler
//!
//! Drives pull -> process -> present once per display refresh. At most one
//! frame is ever in flight: a tick that arrives while a frame is still being
//! processed is dropped instead of queued, so a slow engine lowers the frame
//! rate rather than building latency.
//!
//! The scheduler does not own a timer. The host calls [`FrameScheduler::tick`]
//! from its refresh callback and keeps requesting refreshes while
//! [`FrameScheduler::is_running`] is true.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::frame::FrameBuffer;
use super::source::FrameSource;
use crate::error::ProcessorError;
use crate::processor::FrameType;
use crate::status::StatusSender;
use crate::telemetry::{PipelineCounters, ProcessingProfiler, ProcessingStats};

/// The stages a frame passes through after acquisition
pub trait FramePipeline {
    /// Run the effects engine over one frame
    fn process(
        &mut self,
        frame: &FrameBuffer,
        frame_type: FrameType,
    ) -> Result<FrameBuffer, ProcessorError>;

    /// Show a processed frame
    fn present(&mut self, frame: &FrameBuffer, mirrored: bool);
}

/// Snapshot of the scheduler flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerState {
    pub running: bool,
    pub frame_in_flight: bool,
}

/// Shared view of the scheduler flags.
///
/// Cloneable so callbacks can observe the in-flight flag or ask the loop to
/// stop without holding the scheduler itself.
#[derive(Debug, Clone, Default)]
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
    frame_in_flight: Arc<AtomicBool>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn frame_in_flight(&self) -> bool {
        self.frame_in_flight.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState {
            running: self.is_running(),
            frame_in_flight: self.frame_in_flight(),
        }
    }

    /// Prevent further ticks from doing work. The source is released by the
    /// next `FrameScheduler::stop` or `tick`.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Holds the in-flight flag for one processor invocation and clears it on
/// drop, including when processing unwinds.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// Claim the flag, or None if a frame is already in flight
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; no work done
    Stopped,
    /// A frame was already in flight
    Busy,
    /// The source had nothing ready
    NotReady,
    /// Acquisition or processing failed; the frame was dropped
    Dropped,
    /// A frame was processed and presented
    Presented,
}

/// At-most-one-in-flight frame loop
pub struct FrameScheduler {
    handle: SchedulerHandle,
    source: Option<Box<dyn FrameSource>>,
    last_processed: Option<FrameBuffer>,
    counters: PipelineCounters,
    profiler: ProcessingProfiler,
    status: StatusSender,
}

impl FrameScheduler {
    /// Create a stopped scheduler
    pub fn new(status: StatusSender) -> Self {
        Self {
            handle: SchedulerHandle::default(),
            source: None,
            last_processed: None,
            counters: PipelineCounters::default(),
            profiler: ProcessingProfiler::default(),
            status,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.handle.state()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Begin pulling from `source`, replacing any current source
    pub fn start(&mut self, source: Box<dyn FrameSource>) {
        self.stop();
        tracing::info!(source = source.name(), "Frame scheduler started");
        self.source = Some(source);
        self.handle.running.store(true, Ordering::Release);
    }

    /// Stop the loop and release the source before returning.
    pub fn stop(&mut self) {
        self.handle.running.store(false, Ordering::Release);
        if let Some(mut source) = self.source.take() {
            source.release();
            tracing::info!(
                source = source.name(),
                presented = self.counters.presented,
                "Frame scheduler stopped"
            );
        }
    }

    /// Run one iteration of the loop.
    ///
    /// Returns without doing work when stopped, when a frame is in flight, or
    /// when the source has nothing ready. The in-flight flag is cleared before
    /// this returns whatever the outcome.
    pub fn tick(&mut self, pipeline: &mut dyn FramePipeline) -> TickOutcome {
        if !self.handle.is_running() {
            // A stop requested through the handle still has to free the source
            if self.source.is_some() {
                self.stop();
            }
            return TickOutcome::Stopped;
        }

        let Some(source) = self.source.as_mut() else {
            return TickOutcome::Stopped;
        };

        if self.handle.frame_in_flight() {
            self.counters.skipped_busy += 1;
            return TickOutcome::Busy;
        }

        if !source.has_frame() {
            self.counters.skipped_not_ready += 1;
            return TickOutcome::NotReady;
        }

        let Some(_guard) = InFlightGuard::enter(&self.handle.frame_in_flight) else {
            self.counters.skipped_busy += 1;
            return TickOutcome::Busy;
        };

        let frame = match source.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                self.counters.failed += 1;
                tracing::warn!(source = source.name(), error = %e, "Failed to acquire frame");
                if e.is_blocking() {
                    self.status.alert(e.to_string());
                } else {
                    self.status.warning(e.to_string());
                }
                return TickOutcome::Dropped;
            }
        };

        let frame_type = source.frame_type();
        let mirrored = frame_type == FrameType::Video;

        let started = Instant::now();
        let result = pipeline.process(&frame, frame_type);
        self.profiler.record(started.elapsed());

        match result {
            Ok(processed) => {
                pipeline.present(&processed, mirrored);
                self.last_processed = Some(processed);
                self.counters.presented += 1;
                TickOutcome::Presented
            }
            Err(e) => {
                self.counters.failed += 1;
                tracing::warn!(error = %e, "Frame processing failed, dropping frame");
                TickOutcome::Dropped
            }
        }
    }

    /// Process a still synchronously, outside the refresh loop.
    ///
    /// Uses the same in-flight guard as `tick`. Returns false when another
    /// frame is in flight or processing failed.
    pub fn process_still(&mut self, still: &FrameBuffer, pipeline: &mut dyn FramePipeline) -> bool {
        let Some(_guard) = InFlightGuard::enter(&self.handle.frame_in_flight) else {
            self.counters.skipped_busy += 1;
            return false;
        };

        let started = Instant::now();
        let result = pipeline.process(still, FrameType::Image);
        self.profiler.record(started.elapsed());

        match result {
            Ok(processed) => {
                pipeline.present(&processed, false);
                self.last_processed = Some(processed);
                self.counters.presented += 1;
                true
            }
            Err(e) => {
                self.counters.failed += 1;
                tracing::warn!(error = %e, "Still processing failed");
                false
            }
        }
    }

    /// The most recent processed frame, kept for capture
    pub fn last_processed(&self) -> Option<&FrameBuffer> {
        self.last_processed.as_ref()
    }

    pub fn clear_last_processed(&mut self) {
        self.last_processed = None;
    }

    pub fn counters(&self) -> PipelineCounters {
        self.counters
    }

    pub fn processing_stats(&self) -> ProcessingStats {
        self.profiler.stats()
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
