//! Scrollwave Core
//!
//! Real-time scrolling waveform renderer for short audio phrases.
//!
//! # Features
//!
//! - Three-band (low/mid/high) amplitude envelopes centered on a fixed playhead
//! - Texture strategy: rasterize each phrase once, scroll a window per frame
//! - Direct strategy: classify pixels from raw amplitude buffers every frame, with zoom
//! - GPU rendering via wgpu (Metal on macOS, Vulkan on Linux) and a software backend
//! - Phrase-keyed resource caching with explicit invalidation rules
//! - Asynchronous waveform generation with a non-blocking handoff to the render thread
//! - Frame pacing monitor and a headless strategy benchmark

pub mod benchmark;
pub mod compositor;
pub mod config;
pub mod coordinator;
pub mod gpu;
pub mod monitor;
pub mod render;
pub mod waveform;

// Re-export commonly used types
pub use benchmark::{BenchmarkConfig, BenchmarkHarness, BenchmarkReport, Recommendation, StrategyReport, Verdict};
pub use compositor::{parse_hex_color, Band, BandPalette, PlayheadStyle, Rgba, ViewportSize};
pub use config::{ConfigError, RenderSettings};
pub use coordinator::{FrameCoordinator, FrameOutcome, RenderRequest, SlotInput, SlotKind, UpdateSummary};
pub use gpu::{GpuBackend, GpuContext, GpuError, RenderTarget};
pub use monitor::{MetricsSink, NoopMetrics, PerformanceMonitor, PerformanceSnapshot};
pub use render::{
    BufferHandle, CompositeParams, CpuBackend, RenderBackend, RenderError, Strategy, TextureHandle,
    WaveformRenderer,
};
pub use waveform::{
    BandPoint, GenerationWorker, PhraseId, SyntheticGenerator, WaveformData, WaveformError, WaveformGenerator,
};
