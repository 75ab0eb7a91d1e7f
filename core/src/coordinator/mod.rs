//! Per-frame driver.
//!
//! `update` runs at the start of each frame on the render thread: it applies
//! the transport owner's `RenderRequest`, drains finished generations, builds
//! whatever the active strategy is missing and evicts phrases no slot still
//! shows. `draw` then composites strictly from what is cached; it never
//! generates anything.

pub mod slot;

pub use slot::{
    buffer_needs_regeneration, size_changed, texture_needs_regeneration, SlotInput, SlotKind, SlotState,
    WaveformSource,
};

use crate::compositor::{Rgba, ViewportSize};
use crate::monitor::PerformanceMonitor;
use crate::render::{CompositeParams, RenderBackend, SlotResources, Strategy, WaveformRenderer};
use crate::waveform::{GenerationJob, GenerationResult, GenerationWorker, PhraseId};
use std::collections::HashSet;
use std::sync::Arc;

/// Everything the transport owner supplies for one frame.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub current: Option<SlotInput>,
    pub next: Option<SlotInput>,
    pub branch: Option<SlotInput>,
    /// Fraction of the current phrase already played, clamped by the caller.
    pub progress: f32,
    pub viewport: ViewportSize,
    pub tint: Rgba,
    pub strategy: Strategy,
    /// Direct strategy only.
    pub zoom_level: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            current: None,
            next: None,
            branch: None,
            progress: 0.0,
            viewport: ViewportSize::default(),
            tint: Rgba::WHITE,
            strategy: Strategy::default(),
            zoom_level: 1.0,
        }
    }
}

impl RenderRequest {
    fn slot(&self, kind: SlotKind) -> Option<&SlotInput> {
        match kind {
            SlotKind::Current => self.current.as_ref(),
            SlotKind::Next => self.next.as_ref(),
            SlotKind::Branch => self.branch.as_ref(),
        }
    }
}

/// What one `update` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub textures_regenerated: u64,
    pub buffers_regenerated: u64,
    /// Generation results handed to a slot.
    pub committed: usize,
    /// Generation results whose phrase no slot shows any more.
    pub stale_dropped: usize,
}

impl UpdateSummary {
    pub fn regenerated(&self) -> bool {
        self.textures_regenerated > 0 || self.buffers_regenerated > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// No drawable this frame, or nothing requested yet.
    Skipped,
}

/// Snapshot of the request fields `draw` composites with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub progress: f32,
    pub viewport: ViewportSize,
    pub tint: Rgba,
    pub strategy: Strategy,
    pub zoom_level: f32,
    pub has_branch: bool,
}

pub struct FrameCoordinator<B: RenderBackend> {
    renderer: WaveformRenderer<B>,
    monitor: Arc<PerformanceMonitor>,
    worker: Option<GenerationWorker>,
    slots: [SlotState; 3],
    in_flight: HashSet<PhraseId>,
    frame: Option<FrameState>,
}

impl<B: RenderBackend> FrameCoordinator<B> {
    /// Coordinator over a renderer for `backend`, reporting into `monitor`.
    pub fn new(backend: B, monitor: Arc<PerformanceMonitor>) -> Self {
        let renderer = WaveformRenderer::new(backend).with_metrics(monitor.clone());
        Self::from_renderer(renderer, monitor)
    }

    /// Coordinator over an already configured renderer. The renderer's
    /// metrics sink is left as the caller set it.
    pub fn from_renderer(renderer: WaveformRenderer<B>, monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            renderer,
            monitor,
            worker: None,
            slots: Default::default(),
            in_flight: HashSet::new(),
            frame: None,
        }
    }

    /// Attach the worker pool that serves `WaveformSource::Generate` slots.
    pub fn with_worker(mut self, worker: GenerationWorker) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn renderer(&self) -> &WaveformRenderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut WaveformRenderer<B> {
        &mut self.renderer
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn slot(&self, kind: SlotKind) -> &SlotState {
        &self.slots[kind.index()]
    }

    pub fn frame_state(&self) -> Option<&FrameState> {
        self.frame.as_ref()
    }

    /// Generation requests issued and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Apply `request` and bring the caches up to date for it.
    pub fn update(&mut self, request: &RenderRequest) -> UpdateSummary {
        let before = self.renderer.regeneration_counts();
        let mut summary = UpdateSummary::default();

        for kind in SlotKind::ALL {
            self.apply_slot(kind, request.slot(kind));
        }

        if let Some(worker) = &self.worker {
            let results = worker.drain();
            for result in results {
                self.in_flight.remove(&result.phrase);
                if self.commit(result) {
                    summary.committed += 1;
                } else {
                    summary.stale_dropped += 1;
                }
            }
        }

        if !request.viewport.is_empty() {
            self.build_resources(request.strategy, request.viewport);
        }
        self.evict_unreferenced();

        self.frame = Some(FrameState {
            progress: request.progress,
            viewport: request.viewport,
            tint: request.tint,
            strategy: request.strategy,
            zoom_level: request.zoom_level,
            has_branch: request.branch.is_some(),
        });

        let after = self.renderer.regeneration_counts();
        summary.textures_regenerated = after.textures - before.textures;
        summary.buffers_regenerated = after.buffers - before.buffers;
        if summary.regenerated() {
            log::debug!(
                "Frame update rebuilt {} textures, {} buffers",
                summary.textures_regenerated,
                summary.buffers_regenerated
            );
        }
        summary
    }

    /// Composite the last updated state into `target`.
    ///
    /// `None` means the surface has no drawable this frame: the frame is
    /// skipped without touching any state.
    pub fn draw(&mut self, target: Option<&mut B::Target>) -> FrameOutcome {
        let Some(target) = target else {
            log::trace!("No drawable this frame, skipping");
            return FrameOutcome::Skipped;
        };
        let Some(frame) = self.frame else {
            log::trace!("Nothing requested yet, skipping");
            return FrameOutcome::Skipped;
        };

        let params = CompositeParams {
            progress: frame.progress,
            has_branch: frame.has_branch,
            viewport: frame.viewport,
            tint: frame.tint,
            zoom_level: frame.zoom_level,
        };
        let [current, next, branch] = &self.slots;

        match frame.strategy {
            Strategy::Texture => {
                let slots = SlotResources {
                    current: current.texture.as_ref(),
                    next: next.texture.as_ref(),
                    branch: branch.texture.as_ref(),
                };
                self.renderer.render_scroll_strategy(target, slots, &params);
            }
            Strategy::Direct => {
                let slots = SlotResources {
                    current: current.buffer.as_ref(),
                    next: next.buffer.as_ref(),
                    branch: branch.buffer.as_ref(),
                };
                self.renderer.render_direct_strategy(target, slots, &params);
            }
        }

        self.monitor.record_frame();
        FrameOutcome::Presented
    }

    fn apply_slot(&mut self, kind: SlotKind, input: Option<&SlotInput>) {
        // At a phrase boundary the incoming phrase is usually already loaded
        // in another slot (next becomes current); reuse it instead of regenerating.
        let shared = input.and_then(|input| {
            let showing = self.slots[kind.index()].phrase.as_ref();
            if showing == Some(&input.phrase) {
                return None;
            }
            self.slots
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != kind.index())
                .find_map(|(_, other)| other.share(&input.phrase))
        });

        let slot = &mut self.slots[kind.index()];
        let Some(input) = input else {
            if slot.phrase.is_some() {
                log::debug!("{kind:?} slot cleared");
            }
            slot.clear();
            return;
        };

        if slot.phrase.as_ref() != Some(&input.phrase) {
            let waveform = match &input.source {
                WaveformSource::Ready(waveform) => Some(waveform.clone()),
                WaveformSource::Generate(_) => None,
            };
            slot.retarget(input.phrase.clone(), waveform);
            if let Some(shared) = shared {
                log::debug!("{kind:?} slot reuses loaded data for {}", input.phrase);
                slot.adopt(shared);
            }
        } else if slot.waveform.is_none() {
            if let WaveformSource::Ready(waveform) = &input.source {
                slot.waveform = Some(waveform.clone());
            }
        }

        if slot.waveform.is_some() || slot.generation_failed {
            return;
        }
        let WaveformSource::Generate(source) = &input.source else {
            return;
        };
        if self.in_flight.contains(&input.phrase) {
            return;
        }
        let Some(worker) = &self.worker else {
            log::warn!("No generation worker for {}, slot stays empty", input.phrase);
            slot.generation_failed = true;
            return;
        };

        let job = GenerationJob {
            phrase: input.phrase.clone(),
            source: source.clone(),
        };
        if worker.submit(job) {
            self.in_flight.insert(input.phrase.clone());
        } else {
            log::warn!("Generation worker unavailable for {}", input.phrase);
            slot.generation_failed = true;
        }
    }

    /// Hand a finished generation to every slot still waiting on its phrase.
    fn commit(&mut self, result: GenerationResult) -> bool {
        let mut committed = false;
        for slot in &mut self.slots {
            if slot.phrase.as_ref() != Some(&result.phrase) || slot.waveform.is_some() {
                continue;
            }
            match &result.waveform {
                Some(waveform) => slot.waveform = Some(waveform.clone()),
                None => slot.generation_failed = true,
            }
            committed = true;
        }
        if !committed {
            log::debug!("Dropped stale generation result for {}", result.phrase);
        }
        committed
    }

    fn build_resources(&mut self, strategy: Strategy, viewport: ViewportSize) {
        for slot in &mut self.slots {
            let (Some(phrase), Some(waveform)) = (slot.phrase.clone(), slot.waveform.clone()) else {
                continue;
            };

            match strategy {
                Strategy::Texture => {
                    let live = slot.texture.as_ref().is_some_and(|h| self.renderer.has_texture(h));
                    if !slot.wants_texture(&phrase, viewport, live) {
                        continue;
                    }
                    let handle = self
                        .renderer
                        .generate_texture(&waveform, viewport.height as f32, &phrase);
                    slot.texture_failed = handle.is_none();
                    slot.texture = handle;
                    slot.texture_key = Some((phrase, viewport));
                }
                Strategy::Direct => {
                    let live = slot.buffer.as_ref().is_some_and(|h| self.renderer.has_buffer(h));
                    if !slot.wants_buffer(&phrase, live) {
                        continue;
                    }
                    let handle = self.renderer.create_buffer(&waveform, &phrase);
                    slot.buffer_failed = handle.is_none();
                    slot.buffer = handle;
                    slot.buffer_key = Some(phrase);
                }
            }
        }
    }

    /// Drop cached resources for phrases no slot shows or waits on.
    fn evict_unreferenced(&mut self) {
        let live: HashSet<PhraseId> = self
            .slots
            .iter()
            .flat_map(SlotState::referenced_phrases)
            .cloned()
            .collect();
        let dropped = self.renderer.retain(|phrase| live.contains(phrase));
        if dropped > 0 {
            log::debug!("Evicted {dropped} superseded resources");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CpuBackend;
    use crate::waveform::WaveformData;

    fn coordinator() -> FrameCoordinator<CpuBackend> {
        FrameCoordinator::new(CpuBackend::new(), Arc::new(PerformanceMonitor::new(120)))
    }

    fn request(phrase: &str, waveform: &Arc<WaveformData>, strategy: Strategy) -> RenderRequest {
        RenderRequest {
            current: Some(SlotInput::ready(phrase, waveform.clone())),
            viewport: ViewportSize::new(320, 120),
            strategy,
            ..Default::default()
        }
    }

    #[test]
    fn test_only_active_strategy_is_built() {
        let waveform = Arc::new(WaveformData::constant(100, 0.5, 0.5, 0.5));
        let mut coordinator = coordinator();

        let summary = coordinator.update(&request("a", &waveform, Strategy::Texture));
        assert_eq!(summary.textures_regenerated, 1);
        assert_eq!(summary.buffers_regenerated, 0);

        let summary = coordinator.update(&request("a", &waveform, Strategy::Direct));
        assert_eq!(summary.textures_regenerated, 0);
        assert_eq!(summary.buffers_regenerated, 1);
    }

    #[test]
    fn test_resubmitting_request_is_idempotent() {
        let waveform = Arc::new(WaveformData::constant(100, 0.5, 0.5, 0.5));
        let mut coordinator = coordinator();
        let req = request("a", &waveform, Strategy::Texture);

        coordinator.update(&req);
        let summary = coordinator.update(&req);
        assert!(!summary.regenerated());
        assert_eq!(coordinator.renderer().cached_textures(), 1);
    }

    #[test]
    fn test_degenerate_waveform_is_not_retried_every_frame() {
        let empty = Arc::new(WaveformData::default());
        let mut coordinator = coordinator();
        let req = request("silent", &empty, Strategy::Texture);

        coordinator.update(&req);
        coordinator.update(&req);
        assert!(coordinator.slot(SlotKind::Current).texture().is_none());
        assert!(coordinator.slot(SlotKind::Current).texture_failed);
        assert_eq!(coordinator.renderer().texture_builds(), 0);
    }

    #[test]
    fn test_draw_without_target_is_skipped() {
        let waveform = Arc::new(WaveformData::constant(100, 0.5, 0.5, 0.5));
        let mut coordinator = coordinator();
        coordinator.update(&request("a", &waveform, Strategy::Texture));

        assert_eq!(coordinator.draw(None), FrameOutcome::Skipped);
        assert_eq!(coordinator.monitor().snapshot().total_frames, 0);
    }

    #[test]
    fn test_draw_before_update_is_skipped() {
        let mut coordinator = coordinator();
        let mut target = image::RgbaImage::new(8, 8);
        assert_eq!(coordinator.draw(Some(&mut target)), FrameOutcome::Skipped);
    }

    #[test]
    fn test_cleared_slot_releases_resources() {
        let waveform = Arc::new(WaveformData::constant(100, 0.5, 0.5, 0.5));
        let mut coordinator = coordinator();
        let mut req = request("a", &waveform, Strategy::Texture);
        req.branch = Some(SlotInput::ready("b", waveform.clone()));

        coordinator.update(&req);
        assert_eq!(coordinator.renderer().cached_textures(), 2);

        req.branch = None;
        coordinator.update(&req);
        assert_eq!(coordinator.renderer().cached_textures(), 1);
        assert!(!coordinator.frame_state().unwrap().has_branch);
    }

    #[test]
    fn test_generate_without_worker_leaves_slot_empty() {
        let mut coordinator = coordinator();
        let req = RenderRequest {
            current: Some(SlotInput::generate("a", "a.wav")),
            viewport: ViewportSize::new(100, 50),
            ..Default::default()
        };
        let summary = coordinator.update(&req);
        assert!(!summary.regenerated());
        assert!(!coordinator.slot(SlotKind::Current).has_waveform());
        assert_eq!(coordinator.in_flight(), 0);
    }
}
