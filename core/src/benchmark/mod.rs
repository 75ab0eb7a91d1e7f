//! Headless strategy benchmark.
//!
//! Drives a `FrameCoordinator` with synthetic phrases under each strategy:
//! a discarded warm-up interval, then a measured interval. Playback is
//! simulated from wall-clock time, and the phrase advances every
//! `phrase_duration`, so measurement includes realistic regeneration.

pub mod report;

pub use report::{percentile, BenchmarkReport, Recommendation, StrategyReport, Verdict};

use crate::compositor::{Rgba, ViewportSize};
use crate::coordinator::{FrameCoordinator, RenderRequest, SlotInput};
use crate::monitor::PerformanceMonitor;
use crate::render::{RenderBackend, RenderError, Strategy};
use crate::waveform::{SyntheticGenerator, WaveformData, DEFAULT_POINT_COUNT};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Phrases cycled through during a run.
const PHRASE_POOL: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkConfig {
    pub warmup: Duration,
    pub measurement: Duration,
    pub viewport: ViewportSize,
    pub point_count: usize,
    /// Simulated playback time per phrase.
    pub phrase_duration: Duration,
    pub zoom_level: f32,
    /// Sleep to this rate between frames; `None` runs flat out.
    pub pacing_hz: Option<u32>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(1),
            measurement: Duration::from_secs(5),
            viewport: ViewportSize::new(1280, 160),
            point_count: DEFAULT_POINT_COUNT,
            phrase_duration: Duration::from_secs(4),
            zoom_level: 1.0,
            pacing_hz: None,
        }
    }
}

pub struct BenchmarkHarness {
    config: BenchmarkConfig,
    phrases: Vec<(String, Arc<WaveformData>)>,
}

impl BenchmarkHarness {
    pub fn new(config: BenchmarkConfig) -> Self {
        let generator = SyntheticGenerator::new(config.point_count.max(1));
        let phrases = (0..PHRASE_POOL)
            .map(|i| {
                let name = format!("bench-phrase-{i}");
                let waveform = Arc::new(generator.waveform(&name));
                (name, waveform)
            })
            .collect();
        Self { config, phrases }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run both strategies, each on a fresh backend from `make_backend`.
    pub fn run<B, F>(&self, mut make_backend: F) -> Result<BenchmarkReport, RenderError>
    where
        B: RenderBackend,
        F: FnMut() -> Result<B, RenderError>,
    {
        let texture_backend = make_backend()?;
        let backend_name = texture_backend.name();
        let texture = self.run_strategy(texture_backend, Strategy::Texture)?;
        let direct = self.run_strategy(make_backend()?, Strategy::Direct)?;

        let report = BenchmarkReport::new(backend_name, self.config.clone(), texture, direct);
        log::info!("Benchmark finished: {}", report.recommendation.summary);
        Ok(report)
    }

    /// Measure one strategy on `backend`.
    pub fn run_strategy<B: RenderBackend>(
        &self,
        mut backend: B,
        strategy: Strategy,
    ) -> Result<StrategyReport, RenderError> {
        let viewport = self.config.viewport;
        if viewport.is_empty() {
            return Err(RenderError::DegenerateInput("zero-area benchmark viewport"));
        }
        let mut target = backend.create_target(viewport)?;
        let refresh_hz = self.config.pacing_hz.unwrap_or(120);
        let monitor = Arc::new(PerformanceMonitor::new(refresh_hz));
        let mut coordinator = FrameCoordinator::new(backend, monitor.clone());
        let pacing = self.config.pacing_hz.map(|hz| Duration::from_secs_f64(1.0 / hz.max(1) as f64));

        log::info!(
            "Benchmarking {strategy} on {}: warm-up {:?}, measure {:?}",
            coordinator.renderer().backend().name(),
            self.config.warmup,
            self.config.measurement
        );

        let clock = Instant::now();
        let mut deadline = clock;
        while clock.elapsed() < self.config.warmup {
            self.frame(&mut coordinator, &mut target, strategy, clock.elapsed());
            pace(pacing, &mut deadline);
        }

        monitor.reset();
        let builds_before = total_builds(&coordinator);
        let mut frame_times_ms = Vec::new();
        let measure_start = Instant::now();
        let mut last = measure_start;

        while measure_start.elapsed() < self.config.measurement {
            self.frame(&mut coordinator, &mut target, strategy, clock.elapsed());
            pace(pacing, &mut deadline);
            let now = Instant::now();
            frame_times_ms.push(now.duration_since(last).as_secs_f64() * 1000.0);
            last = now;
        }

        let generation_count = total_builds(&coordinator) - builds_before;
        let report = StrategyReport::from_frame_times(strategy, &frame_times_ms, generation_count);
        log::info!(
            "{strategy}: {} frames, {:.1} avg fps, p99 {:.2} ms",
            report.frame_count,
            report.avg_fps,
            report.p99_frame_time_ms
        );
        Ok(report)
    }

    /// Request for simulated playback time `elapsed`.
    pub fn request_at(&self, strategy: Strategy, elapsed: Duration) -> RenderRequest {
        let phrase_secs = self.config.phrase_duration.as_secs_f64().max(1e-3);
        let position = elapsed.as_secs_f64() / phrase_secs;
        let index = position.floor() as usize;
        let progress = position.fract() as f32;

        let slot = |offset: usize| {
            let (name, waveform) = &self.phrases[(index + offset) % self.phrases.len()];
            SlotInput::ready(name.as_str(), waveform.clone())
        };

        RenderRequest {
            current: Some(slot(0)),
            next: Some(slot(1)),
            branch: Some(slot(2)),
            progress,
            viewport: self.config.viewport,
            tint: Rgba::WHITE,
            strategy,
            zoom_level: self.config.zoom_level,
        }
    }

    /// One frame: update, draw, then wait for the device.
    ///
    /// There is no display to pace presentation headlessly, so `finish`
    /// stands in for it; without it GPU timings would only cover command
    /// submission.
    fn frame<B: RenderBackend>(
        &self,
        coordinator: &mut FrameCoordinator<B>,
        target: &mut B::Target,
        strategy: Strategy,
        elapsed: Duration,
    ) {
        coordinator.update(&self.request_at(strategy, elapsed));
        coordinator.draw(Some(target));
        coordinator.renderer_mut().backend_mut().finish();
    }
}

fn total_builds<B: RenderBackend>(coordinator: &FrameCoordinator<B>) -> u64 {
    let counts = coordinator.renderer().regeneration_counts();
    counts.textures + counts.buffers
}

fn pace(period: Option<Duration>, deadline: &mut Instant) {
    let Some(period) = period else {
        return;
    };
    *deadline += period;
    let now = Instant::now();
    if *deadline > now {
        std::thread::sleep(*deadline - now);
    } else {
        // fell behind; don't try to catch up with a burst
        *deadline = now;
    }
}
