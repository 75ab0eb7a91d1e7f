//! Real-time performance instrumentation.
//!
//! The monitor is an explicitly constructed, shareable instance: the render
//! thread records frames, the generation workers record generation latency,
//! and the renderer records upload latency and memory footprint. All state sits
//! behind one mutex so every update goes through a single serialized path.
//! Every history is fixed-capacity, so memory never grows with uptime.

pub mod ring;

pub use ring::RingBuffer;

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Capacity of the generation and upload latency histories.
pub const LATENCY_HISTORY: usize = 60;

/// Receiver of resource timing events.
///
/// The renderer and the generation workers hold this as an injected
/// dependency; `NoopMetrics` is used when nothing is listening.
pub trait MetricsSink: Send + Sync {
    /// Time spent producing data for a resource.
    ///
    /// One metric covers every producer: waveform generation on the worker
    /// threads, texture rasterization and buffer interleaving on the render
    /// thread. A phrase generated and then drawn with the texture strategy
    /// therefore contributes two samples.
    fn record_generation(&self, duration: Duration);

    /// Time spent uploading a resource to the device.
    fn record_upload(&self, duration: Duration);

    /// Approximate footprint of cached resources: `count * avg_size` bytes.
    fn update_memory_estimate(&self, count: usize, avg_size: usize);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_generation(&self, _duration: Duration) {}
    fn record_upload(&self, _duration: Duration) {}
    fn update_memory_estimate(&self, _count: usize, _avg_size: usize) {}
}

/// Rolling frame pacing statistics over the frame window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameStats {
    /// Samples currently in the window.
    pub window_len: usize,
    pub mean_frame_time_ms: f64,
    pub frame_time_variance_ms2: f64,
    pub max_frame_time_ms: f64,
    pub fps: f64,
}

/// Point-in-time view of everything the monitor tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub frames: FrameStats,
    /// Frames recorded since construction or the last reset.
    pub total_frames: u64,
    /// Mean over every `record_generation` sample, worker and render thread alike.
    pub avg_generation_ms: f64,
    pub avg_upload_ms: f64,
    pub generation_count: u64,
    pub upload_count: u64,
    pub cached_resources: usize,
    pub memory_estimate_bytes: usize,
}

#[derive(Debug)]
struct MonitorState {
    frame_times: RingBuffer,
    generation_times: RingBuffer,
    upload_times: RingBuffer,
    last_frame: Option<Instant>,
    total_frames: u64,
    generation_count: u64,
    upload_count: u64,
    cached_resources: usize,
    memory_estimate_bytes: usize,
    last_publish: Option<Instant>,
    published: Option<PerformanceSnapshot>,
}

impl MonitorState {
    fn new(frame_window: usize) -> Self {
        Self {
            frame_times: RingBuffer::new(frame_window),
            generation_times: RingBuffer::new(LATENCY_HISTORY),
            upload_times: RingBuffer::new(LATENCY_HISTORY),
            last_frame: None,
            total_frames: 0,
            generation_count: 0,
            upload_count: 0,
            cached_resources: 0,
            memory_estimate_bytes: 0,
            last_publish: None,
            published: None,
        }
    }

    fn snapshot(&self) -> PerformanceSnapshot {
        let mean = self.frame_times.mean();
        PerformanceSnapshot {
            frames: FrameStats {
                window_len: self.frame_times.len(),
                mean_frame_time_ms: mean,
                frame_time_variance_ms2: self.frame_times.variance(),
                max_frame_time_ms: self.frame_times.max(),
                fps: if mean > 0.0 { 1000.0 / mean } else { 0.0 },
            },
            total_frames: self.total_frames,
            avg_generation_ms: self.generation_times.mean(),
            avg_upload_ms: self.upload_times.mean(),
            generation_count: self.generation_count,
            upload_count: self.upload_count,
            cached_resources: self.cached_resources,
            memory_estimate_bytes: self.memory_estimate_bytes,
        }
    }
}

/// Frame pacing, generation latency and memory monitor.
#[derive(Debug)]
pub struct PerformanceMonitor {
    state: Mutex<MonitorState>,
    target_refresh_rate_hz: u32,
    publish_interval: Duration,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(120)
    }
}

impl PerformanceMonitor {
    /// Create a monitor whose frame window covers one second at `target_refresh_rate_hz`.
    pub fn new(target_refresh_rate_hz: u32) -> Self {
        let target = target_refresh_rate_hz.max(1);
        Self {
            state: Mutex::new(MonitorState::new(target as usize)),
            target_refresh_rate_hz: target,
            publish_interval: Duration::from_secs(1),
        }
    }

    /// Override the publication cadence (never faster than the caller asks).
    pub fn with_publish_interval(mut self, interval: Duration) -> Self {
        self.publish_interval = interval;
        self
    }

    pub fn target_refresh_rate_hz(&self) -> u32 {
        self.target_refresh_rate_hz
    }

    /// Frame budget at the target rate.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_refresh_rate_hz as f64)
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a presented frame. Returns the time since the previous call.
    pub fn record_frame(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.lock();
        let elapsed = state.last_frame.map(|prev| now.duration_since(prev));
        state.last_frame = Some(now);
        if let Some(elapsed) = elapsed {
            self.push_frame(&mut state, elapsed, now);
        }
        elapsed
    }

    /// Push an externally measured frame duration.
    pub fn record_frame_time(&self, frame_time: Duration) {
        let now = Instant::now();
        let mut state = self.lock();
        self.push_frame(&mut state, frame_time, now);
    }

    fn push_frame(&self, state: &mut MonitorState, frame_time: Duration, now: Instant) {
        state.frame_times.push(frame_time.as_secs_f64() * 1000.0);
        state.total_frames += 1;

        let due = state
            .last_publish
            .map_or(true, |at| now.duration_since(at) >= self.publish_interval);
        if due {
            let snapshot = state.snapshot();
            log::debug!(
                "frame pacing: {:.1} fps, mean {:.3} ms, max {:.3} ms, var {:.4} ms²",
                snapshot.frames.fps,
                snapshot.frames.mean_frame_time_ms,
                snapshot.frames.max_frame_time_ms,
                snapshot.frames.frame_time_variance_ms2
            );
            state.published = Some(snapshot);
            state.last_publish = Some(now);
        }
    }

    /// Current statistics, computed on demand.
    pub fn snapshot(&self) -> PerformanceSnapshot {
        self.lock().snapshot()
    }

    /// Last throttled publication, if any frame has been recorded.
    pub fn published(&self) -> Option<PerformanceSnapshot> {
        self.lock().published.clone()
    }

    /// Clear every history and counter.
    pub fn reset(&self) {
        let mut state = self.lock();
        let window = state.frame_times.capacity();
        *state = MonitorState::new(window);
    }
}

impl MetricsSink for PerformanceMonitor {
    fn record_generation(&self, duration: Duration) {
        let mut state = self.lock();
        state.generation_times.push(duration.as_secs_f64() * 1000.0);
        state.generation_count += 1;
    }

    fn record_upload(&self, duration: Duration) {
        let mut state = self.lock();
        state.upload_times.push(duration.as_secs_f64() * 1000.0);
        state.upload_count += 1;
    }

    fn update_memory_estimate(&self, count: usize, avg_size: usize) {
        let mut state = self.lock();
        state.cached_resources = count;
        state.memory_estimate_bytes = count.saturating_mul(avg_size);
    }
}
