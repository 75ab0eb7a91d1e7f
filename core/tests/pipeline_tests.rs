//! Integration tests for async generation, the performance monitor and the benchmark.

use scrollwave::benchmark::{BenchmarkConfig, BenchmarkHarness, Recommendation, StrategyReport, Verdict};
use scrollwave::coordinator::{FrameCoordinator, RenderRequest, SlotInput, SlotKind, UpdateSummary};
use scrollwave::{
    CpuBackend, GenerationWorker, MetricsSink, PerformanceMonitor, Strategy, SyntheticGenerator, ViewportSize,
    WaveformData, WaveformGenerator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Worker whose jobs take at least `delay`, so results never land in the submitting frame.
fn worker(monitor: &Arc<PerformanceMonitor>) -> GenerationWorker {
    let synth = SyntheticGenerator::new(200);
    let delay = Duration::from_millis(20);
    let generator: Arc<dyn WaveformGenerator> = Arc::new(move |source: &str| {
        std::thread::sleep(delay);
        Some(synth.waveform(source))
    });
    let metrics: Arc<dyn MetricsSink> = monitor.clone();
    GenerationWorker::spawn(generator, 2, Some(metrics)).unwrap()
}

/// Run `update` until `done` holds or two seconds pass; returns the summed summary.
fn update_until(
    coordinator: &mut FrameCoordinator<CpuBackend>,
    request: &RenderRequest,
    mut done: impl FnMut(&FrameCoordinator<CpuBackend>) -> bool,
) -> UpdateSummary {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut total = UpdateSummary::default();
    loop {
        let summary = coordinator.update(request);
        total.committed += summary.committed;
        total.stale_dropped += summary.stale_dropped;
        total.textures_regenerated += summary.textures_regenerated;
        total.buffers_regenerated += summary.buffers_regenerated;
        if done(coordinator) || Instant::now() > deadline {
            return total;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_generated_waveform_is_committed_and_built() {
    let monitor = Arc::new(PerformanceMonitor::new(120));
    let mut coordinator =
        FrameCoordinator::new(CpuBackend::new(), monitor.clone()).with_worker(worker(&monitor));

    let request = RenderRequest {
        current: Some(SlotInput::generate("phrase-a", "phrase-a.wav")),
        viewport: ViewportSize::new(320, 80),
        strategy: Strategy::Texture,
        ..RenderRequest::default()
    };
    let total = update_until(&mut coordinator, &request, |c| {
        c.slot(SlotKind::Current).texture().is_some()
    });

    assert_eq!(total.committed, 1);
    assert_eq!(total.textures_regenerated, 1);
    assert_eq!(coordinator.in_flight(), 0);
    // One worker generation and one rasterization share the metric
    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.generation_count, 2);
    assert!(snapshot.avg_generation_ms > 0.0);
}

#[test]
fn test_result_for_replaced_phrase_is_dropped() {
    let monitor = Arc::new(PerformanceMonitor::new(120));
    let mut coordinator =
        FrameCoordinator::new(CpuBackend::new(), monitor.clone()).with_worker(worker(&monitor));
    let viewport = ViewportSize::new(320, 80);

    coordinator.update(&RenderRequest {
        current: Some(SlotInput::generate("old", "old.wav")),
        viewport,
        ..RenderRequest::default()
    });
    assert_eq!(coordinator.in_flight(), 1);

    // The transport moves on before the worker finishes
    let ready = Arc::new(WaveformData::constant(200, 0.5, 0.5, 0.5));
    let request = RenderRequest {
        current: Some(SlotInput::ready("new", ready)),
        viewport,
        ..RenderRequest::default()
    };
    let total = update_until(&mut coordinator, &request, |c| c.in_flight() == 0);

    assert_eq!(total.stale_dropped, 1);
    assert_eq!(total.committed, 0);
    let current = coordinator.slot(SlotKind::Current);
    assert_eq!(current.phrase().map(|p| p.as_str()), Some("new"));
    assert_eq!(current.texture().map(|h| h.phrase().as_str()), Some("new"));
    assert_eq!(coordinator.renderer().cached_textures(), 1);
}

#[test]
fn test_phrase_promoted_while_generating_keeps_its_data() {
    let monitor = Arc::new(PerformanceMonitor::new(120));
    let mut coordinator =
        FrameCoordinator::new(CpuBackend::new(), monitor.clone()).with_worker(worker(&monitor));
    let viewport = ViewportSize::new(320, 80);
    let playing = Arc::new(WaveformData::constant(200, 0.5, 0.5, 0.5));

    coordinator.update(&RenderRequest {
        current: Some(SlotInput::ready("playing", playing)),
        next: Some(SlotInput::generate("upcoming", "upcoming.wav")),
        viewport,
        ..RenderRequest::default()
    });

    // Phrase boundary: "upcoming" becomes current before its data arrives
    let request = RenderRequest {
        current: Some(SlotInput::generate("upcoming", "upcoming.wav")),
        viewport,
        ..RenderRequest::default()
    };
    let total = update_until(&mut coordinator, &request, |c| c.slot(SlotKind::Current).has_waveform());

    assert_eq!(total.committed, 1);
    assert_eq!(total.stale_dropped, 0);
    assert!(coordinator.slot(SlotKind::Current).texture().is_some());
}

#[test]
fn test_boundary_reuses_data_loaded_for_next_slot() {
    let monitor = Arc::new(PerformanceMonitor::new(120));
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let synth = SyntheticGenerator::new(200);
    let generator: Arc<dyn WaveformGenerator> = Arc::new(move |source: &str| {
        counted.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        Some(synth.waveform(source))
    });
    let worker = GenerationWorker::spawn(generator, 2, None).unwrap();
    let mut coordinator = FrameCoordinator::new(CpuBackend::new(), monitor).with_worker(worker);
    let viewport = ViewportSize::new(320, 80);
    let playing = Arc::new(WaveformData::constant(200, 0.5, 0.5, 0.5));

    let before = RenderRequest {
        current: Some(SlotInput::ready("a", playing)),
        next: Some(SlotInput::generate("b", "b.wav")),
        viewport,
        strategy: Strategy::Texture,
        ..RenderRequest::default()
    };
    update_until(&mut coordinator, &before, |c| {
        c.slot(SlotKind::Next).texture().map(|h| h.phrase().as_str()) == Some("b")
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // "b" becomes current and "c" is the new next phrase
    let after = RenderRequest {
        current: Some(SlotInput::generate("b", "b.wav")),
        next: Some(SlotInput::generate("c", "c.wav")),
        viewport,
        strategy: Strategy::Texture,
        ..RenderRequest::default()
    };
    let summary = coordinator.update(&after);

    let current = coordinator.slot(SlotKind::Current);
    assert!(current.has_waveform());
    assert_eq!(current.texture().map(|h| h.phrase().as_str()), Some("b"));
    assert_eq!(summary.textures_regenerated, 0);
    assert_eq!(coordinator.in_flight(), 1);

    update_until(&mut coordinator, &after, |c| c.in_flight() == 0);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        coordinator.slot(SlotKind::Current).texture().map(|h| h.phrase().as_str()),
        Some("b")
    );
}

#[test]
fn test_monitor_window_keeps_most_recent_samples() {
    let monitor = PerformanceMonitor::new(120);
    // 30 slow frames, then 120 fast ones push them out of the window
    for _ in 0..30 {
        monitor.record_frame_time(Duration::from_millis(50));
    }
    for _ in 0..120 {
        monitor.record_frame_time(Duration::from_millis(8));
    }

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.total_frames, 150);
    assert_eq!(snapshot.frames.window_len, 120);
    assert!((snapshot.frames.mean_frame_time_ms - 8.0).abs() < 1e-9);
    assert!((snapshot.frames.max_frame_time_ms - 8.0).abs() < 1e-9);
}

#[test]
fn test_benchmark_parity_scenario() {
    let report = |strategy, avg_fps| StrategyReport {
        strategy,
        frame_count: 600,
        avg_fps,
        min_fps: avg_fps,
        max_fps: avg_fps,
        frame_time_variance_ms2: 0.2,
        p95_frame_time_ms: 8.6,
        p99_frame_time_ms: 8.9,
        generation_count: 2,
    };
    let rec = Recommendation::compare(&report(Strategy::Texture, 118.0), &report(Strategy::Direct, 119.5));

    assert!((rec.fps_delta_percent - 1.27).abs() < 0.01);
    assert_eq!(rec.speed, Verdict::Parity);
    assert_eq!(rec.recommended, Verdict::Parity);
    assert!(rec.summary.contains("parity"));
}

#[test]
fn test_headless_benchmark_on_cpu_backend() {
    let harness = BenchmarkHarness::new(BenchmarkConfig {
        warmup: Duration::from_millis(10),
        measurement: Duration::from_millis(60),
        viewport: ViewportSize::new(128, 32),
        point_count: 100,
        phrase_duration: Duration::from_millis(20),
        zoom_level: 2.0,
        pacing_hz: None,
    });

    let report = harness.run(|| Ok(CpuBackend::new())).unwrap();
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["backend"], "cpu");
    assert!(value["texture"]["frame_count"].as_u64().unwrap() > 0);
    assert!(value["direct"]["generation_count"].as_u64().unwrap() > 0);
    assert!(value["recommendation"]["summary"].is_string());
}
