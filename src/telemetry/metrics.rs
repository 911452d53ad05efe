//! Frame pipeline counters and processing-time statistics

use std::collections::VecDeque;
use std::time::Duration;

/// Processing time statistics over the recent window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    /// Average processing time in milliseconds
    pub avg_ms: f64,
    /// Fastest frame in the window
    pub min_ms: f64,
    /// Slowest frame in the window
    pub max_ms: f64,
    /// 95th percentile processing time
    pub p95_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Counters kept by the frame scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCounters {
    /// Frames processed and presented
    pub presented: u64,
    /// Ticks dropped because a frame was still in flight
    pub skipped_busy: u64,
    /// Ticks dropped because the source had nothing ready
    pub skipped_not_ready: u64,
    /// Frames lost to acquisition or processing errors
    pub failed: u64,
}

/// Rolling window of processor invocation times
pub struct ProcessingProfiler {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl Default for ProcessingProfiler {
    fn default() -> Self {
        Self::new(300)
    }
}

impl ProcessingProfiler {
    /// Create a profiler keeping at most `max_samples` timings
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    /// Record one processor invocation
    pub fn record(&mut self, elapsed: Duration) {
        self.samples.push_back(elapsed);
        if self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    pub fn stats(&self) -> ProcessingStats {
        if self.samples.is_empty() {
            return ProcessingStats::default();
        }

        let mut times: Vec<f64> = self
            .samples
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sum: f64 = times.iter().sum();
        ProcessingStats {
            avg_ms: sum / times.len() as f64,
            min_ms: times.first().copied().unwrap_or(0.0),
            max_ms: times.last().copied().unwrap_or(0.0),
            p95_ms: percentile(&times, 0.95),
            sample_count: times.len(),
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Percentile of an ascending slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}
