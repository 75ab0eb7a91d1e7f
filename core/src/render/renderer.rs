//! Waveform renderer: owns the backend, both resource caches and the
//! per-strategy composite passes.

use super::cache::{ResourceCache, ResourceHandle};
use super::{DirectPass, PassRole, PlayheadPass, RenderBackend, ScrollPass};
use crate::compositor::raster::rasterize_waveform;
use crate::compositor::{BandPalette, PlayheadStyle, Rgba, ViewportSize, BRANCH_ALPHA};
use crate::monitor::{MetricsSink, NoopMetrics};
use crate::waveform::{PhraseId, WaveformData};
use std::sync::Arc;
use std::time::Instant;

/// Cached pre-rasterized phrase texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle(ResourceHandle);

/// Cached amplitude buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferHandle(ResourceHandle);

impl TextureHandle {
    pub fn phrase(&self) -> &PhraseId {
        self.0.phrase()
    }
}

impl BufferHandle {
    pub fn phrase(&self) -> &PhraseId {
        self.0.phrase()
    }
}

/// Resources for the three display slots of one frame.
#[derive(Debug)]
pub struct SlotResources<'a, H> {
    pub current: Option<&'a H>,
    pub next: Option<&'a H>,
    pub branch: Option<&'a H>,
}

impl<H> Clone for SlotResources<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for SlotResources<'_, H> {}

impl<H> Default for SlotResources<'_, H> {
    fn default() -> Self {
        Self {
            current: None,
            next: None,
            branch: None,
        }
    }
}

/// Per-frame composite parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub progress: f32,
    pub has_branch: bool,
    pub viewport: ViewportSize,
    pub tint: Rgba,
    /// Only read by the direct strategy.
    pub zoom_level: f32,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            progress: 0.0,
            has_branch: false,
            viewport: ViewportSize::default(),
            tint: Rgba::WHITE,
            zoom_level: 1.0,
        }
    }
}

/// Resources built since the renderer was constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RegenerationCounts {
    pub textures: u64,
    pub buffers: u64,
}

/// Render-thread owner of the backend and its cached resources.
pub struct WaveformRenderer<B: RenderBackend> {
    backend: B,
    textures: ResourceCache<B::Texture>,
    buffers: ResourceCache<B::Buffer>,
    palette: BandPalette,
    playhead: PlayheadStyle,
    background: Rgba,
    metrics: Arc<dyn MetricsSink>,
}

impl<B: RenderBackend> WaveformRenderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            textures: ResourceCache::new("texture"),
            buffers: ResourceCache::new("buffer"),
            palette: BandPalette::default(),
            playhead: PlayheadStyle::default(),
            background: Rgba::TRANSPARENT,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_palette(mut self, palette: BandPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_playhead_style(mut self, style: PlayheadStyle) -> Self {
        self.playhead = style;
        self
    }

    pub fn with_background(mut self, background: Rgba) -> Self {
        self.background = background;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn palette(&self) -> &BandPalette {
        &self.palette
    }

    /// Rasterize and upload the texture for `key` at `target_height`.
    ///
    /// Repeated calls with the same key and rounded height return the cached
    /// handle without rasterizing again. A different height replaces the
    /// cached entry. Returns `None` for an empty waveform, a height that rounds
    /// to zero, or when the device refuses the resource.
    pub fn generate_texture(
        &mut self,
        waveform: &WaveformData,
        target_height: f32,
        key: &PhraseId,
    ) -> Option<TextureHandle> {
        if waveform.is_empty() {
            log::debug!("Skipping texture for {key}: empty waveform");
            return None;
        }
        let rounded = target_height.round();
        if !(rounded >= 1.0) {
            log::debug!("Skipping texture for {key}: height {target_height}");
            return None;
        }
        let height = rounded as u32;

        if let Some(handle) = self.textures.lookup(key, Some(height)) {
            return Some(TextureHandle(handle));
        }

        let max = self.backend.max_texture_dimension();
        let width = waveform.point_count();
        if width > max as usize || height > max {
            log::warn!(
                "Texture for {key} ({width}x{height}) exceeds device limit {max}, not cached"
            );
            return None;
        }

        let start = Instant::now();
        let image = rasterize_waveform(waveform, height, &self.palette)?;
        self.metrics.record_generation(start.elapsed());

        let start = Instant::now();
        let texture = match self.backend.upload_texture(&image, key.as_str()) {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("Texture upload for {key} failed: {e}");
                return None;
            }
        };
        self.metrics.record_upload(start.elapsed());

        let bytes = image.as_raw().len();
        let handle = self.textures.insert(key.clone(), Some(height), bytes, texture);
        log::debug!("Rasterized {key} at {width}x{height} ({bytes} bytes)");
        self.publish_memory_estimate();
        Some(TextureHandle(handle))
    }

    /// Upload the raw triples for `key`, reusing the cached buffer if present.
    pub fn create_buffer(&mut self, waveform: &WaveformData, key: &PhraseId) -> Option<BufferHandle> {
        if waveform.is_empty() {
            log::debug!("Skipping buffer for {key}: empty waveform");
            return None;
        }

        if let Some(handle) = self.buffers.lookup(key, None) {
            return Some(BufferHandle(handle));
        }

        let start = Instant::now();
        let points = waveform.interleaved();
        self.metrics.record_generation(start.elapsed());

        let start = Instant::now();
        let buffer = match self.backend.upload_buffer(&points, key.as_str()) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("Buffer upload for {key} failed: {e}");
                return None;
            }
        };
        self.metrics.record_upload(start.elapsed());

        let bytes = std::mem::size_of_val(points.as_slice());
        let handle = self.buffers.insert(key.clone(), None, bytes, buffer);
        log::debug!("Uploaded {} points for {key} ({bytes} bytes)", points.len());
        self.publish_memory_estimate();
        Some(BufferHandle(handle))
    }

    /// Composite one frame from cached textures.
    ///
    /// The main pass samples `current`, falling back to `next` when current
    /// is absent. With `has_branch` and a branch texture, a second pass covers
    /// only the lower half at a fixed reduced alpha. The playhead is always
    /// drawn last. Missing resources skip their pass.
    pub fn render_scroll_strategy(
        &mut self,
        target: &mut B::Target,
        slots: SlotResources<'_, TextureHandle>,
        params: &CompositeParams,
    ) {
        let viewport = params.viewport;
        if viewport.is_empty() {
            return;
        }

        self.backend.begin_frame(target, self.background);

        let main = slots
            .current
            .and_then(|h| self.textures.get(&h.0))
            .or_else(|| slots.next.and_then(|h| self.textures.get(&h.0)));
        if let Some(texture) = main {
            let pass = ScrollPass {
                role: PassRole::Main,
                viewport: viewport.full_rect(),
                progress: params.progress,
                alpha: 1.0,
            };
            self.backend.draw_scroll(target, texture, &pass);
        }

        if params.has_branch {
            if let Some(texture) = slots.branch.and_then(|h| self.textures.get(&h.0)) {
                let pass = ScrollPass {
                    role: PassRole::Branch,
                    viewport: viewport.lower_half(),
                    progress: params.progress,
                    alpha: BRANCH_ALPHA,
                };
                self.backend.draw_scroll(target, texture, &pass);
            }
        }

        self.draw_playhead(target, params);
        self.backend.end_frame(target);
    }

    /// Composite one frame from cached amplitude buffers.
    ///
    /// Same slot and fallback rules as the scroll strategy, with the visible
    /// window scaled by `params.zoom_level`.
    pub fn render_direct_strategy(
        &mut self,
        target: &mut B::Target,
        slots: SlotResources<'_, BufferHandle>,
        params: &CompositeParams,
    ) {
        let viewport = params.viewport;
        if viewport.is_empty() {
            return;
        }

        self.backend.begin_frame(target, self.background);

        let main = slots
            .current
            .and_then(|h| self.buffers.get(&h.0))
            .or_else(|| slots.next.and_then(|h| self.buffers.get(&h.0)));
        if let Some(buffer) = main {
            let pass = DirectPass {
                role: PassRole::Main,
                viewport: viewport.full_rect(),
                progress: params.progress,
                alpha: 1.0,
                zoom_level: params.zoom_level,
                palette: self.palette,
            };
            self.backend.draw_direct(target, buffer, &pass);
        }

        if params.has_branch {
            if let Some(buffer) = slots.branch.and_then(|h| self.buffers.get(&h.0)) {
                let pass = DirectPass {
                    role: PassRole::Branch,
                    viewport: viewport.lower_half(),
                    progress: params.progress,
                    alpha: BRANCH_ALPHA,
                    zoom_level: params.zoom_level,
                    palette: self.palette,
                };
                self.backend.draw_direct(target, buffer, &pass);
            }
        }

        self.draw_playhead(target, params);
        self.backend.end_frame(target);
    }

    fn draw_playhead(&mut self, target: &mut B::Target, params: &CompositeParams) {
        let pass = PlayheadPass {
            viewport: params.viewport,
            tint: params.tint,
            style: self.playhead,
        };
        self.backend.draw_playhead(target, &pass);
    }

    pub fn texture(&self, handle: &TextureHandle) -> Option<&B::Texture> {
        self.textures.get(&handle.0)
    }

    pub fn buffer(&self, handle: &BufferHandle) -> Option<&B::Buffer> {
        self.buffers.get(&handle.0)
    }

    pub fn has_texture(&self, handle: &TextureHandle) -> bool {
        self.textures.contains(&handle.0)
    }

    pub fn has_buffer(&self, handle: &BufferHandle) -> bool {
        self.buffers.contains(&handle.0)
    }

    /// Point count of a cached buffer, 0 if the handle is stale.
    pub fn buffer_point_count(&self, handle: &BufferHandle) -> usize {
        self.buffers
            .get(&handle.0)
            .map(|buffer| self.backend.point_count(buffer))
            .unwrap_or(0)
    }

    /// Drop both resources cached for `key`.
    pub fn evict(&mut self, key: &PhraseId) {
        let texture = self.textures.evict(key);
        let buffer = self.buffers.evict(key);
        if texture || buffer {
            log::debug!("Evicted resources for {key}");
            self.publish_memory_estimate();
        }
    }

    /// Drop every cached resource whose phrase `keep` rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&PhraseId) -> bool) -> usize {
        let dropped = self.textures.retain(&mut keep) + self.buffers.retain(&mut keep);
        if dropped > 0 {
            self.publish_memory_estimate();
        }
        dropped
    }

    pub fn clear_cache(&mut self) {
        self.textures.clear();
        self.buffers.clear();
        log::debug!("Cleared {} resource caches", self.backend.name());
        self.publish_memory_estimate();
    }

    pub fn cached_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn cached_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Textures rasterized since construction.
    pub fn texture_builds(&self) -> u64 {
        self.textures.builds()
    }

    /// Buffers uploaded since construction.
    pub fn buffer_builds(&self) -> u64 {
        self.buffers.builds()
    }

    pub fn regeneration_counts(&self) -> RegenerationCounts {
        RegenerationCounts {
            textures: self.textures.builds(),
            buffers: self.buffers.builds(),
        }
    }

    pub fn memory_bytes(&self) -> usize {
        self.textures.total_bytes() + self.buffers.total_bytes()
    }

    fn publish_memory_estimate(&self) {
        let count = self.textures.len() + self.buffers.len();
        let avg = if count == 0 { 0 } else { self.memory_bytes() / count };
        self.metrics.update_memory_estimate(count, avg);
    }
}
