//! Per-slot bookkeeping and the regeneration predicates.

use crate::compositor::ViewportSize;
use crate::render::{BufferHandle, TextureHandle};
use crate::waveform::{PhraseId, WaveformData};
use std::sync::Arc;

/// The three display slots of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Current,
    Next,
    Branch,
}

impl SlotKind {
    pub const ALL: [SlotKind; 3] = [SlotKind::Current, SlotKind::Next, SlotKind::Branch];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Where a slot's waveform comes from.
#[derive(Debug, Clone)]
pub enum WaveformSource {
    /// Data already produced by the caller.
    Ready(Arc<WaveformData>),
    /// Source reference to hand to the waveform generator.
    Generate(String),
}

/// What the transport owner puts in one slot for a frame.
#[derive(Debug, Clone)]
pub struct SlotInput {
    pub phrase: PhraseId,
    pub source: WaveformSource,
}

impl SlotInput {
    pub fn ready(phrase: impl Into<PhraseId>, waveform: Arc<WaveformData>) -> Self {
        Self {
            phrase: phrase.into(),
            source: WaveformSource::Ready(waveform),
        }
    }

    pub fn generate(phrase: impl Into<PhraseId>, source: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            source: WaveformSource::Generate(source.into()),
        }
    }
}

/// Whether a viewport moved by more than one pixel on either axis.
#[inline]
pub fn size_changed(previous: ViewportSize, size: ViewportSize) -> bool {
    previous.width.abs_diff(size.width) > 1 || previous.height.abs_diff(size.height) > 1
}

/// Texture rebuild rule: phrase changed, viewport moved by more than 1 px
/// since the last build, or no live handle.
pub fn texture_needs_regeneration(
    built: Option<&(PhraseId, ViewportSize)>,
    handle_live: bool,
    phrase: &PhraseId,
    size: ViewportSize,
) -> bool {
    match built {
        None => true,
        Some((built_phrase, built_size)) => {
            built_phrase != phrase || size_changed(*built_size, size) || !handle_live
        }
    }
}

/// Buffer rebuild rule: phrase changed or no live handle. Size never matters.
pub fn buffer_needs_regeneration(built: Option<&PhraseId>, handle_live: bool, phrase: &PhraseId) -> bool {
    match built {
        None => true,
        Some(built_phrase) => built_phrase != phrase || !handle_live,
    }
}

/// What one slot hands another that switches to the same phrase.
#[derive(Debug, Clone)]
pub(crate) struct SharedPhrase {
    waveform: Arc<WaveformData>,
    texture: Option<(TextureHandle, (PhraseId, ViewportSize))>,
    buffer: Option<(BufferHandle, PhraseId)>,
}

/// Last-seen state of one slot.
///
/// The handles may belong to an older phrase while new data is pending;
/// they keep being drawn until a rebuild replaces them.
#[derive(Debug, Default)]
pub struct SlotState {
    pub(crate) phrase: Option<PhraseId>,
    pub(crate) waveform: Option<Arc<WaveformData>>,
    pub(crate) generation_failed: bool,
    pub(crate) texture: Option<TextureHandle>,
    pub(crate) texture_key: Option<(PhraseId, ViewportSize)>,
    pub(crate) texture_failed: bool,
    pub(crate) buffer: Option<BufferHandle>,
    pub(crate) buffer_key: Option<PhraseId>,
    pub(crate) buffer_failed: bool,
}

impl SlotState {
    pub fn phrase(&self) -> Option<&PhraseId> {
        self.phrase.as_ref()
    }

    pub fn has_waveform(&self) -> bool {
        self.waveform.is_some()
    }

    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    pub fn buffer(&self) -> Option<&BufferHandle> {
        self.buffer.as_ref()
    }

    /// Whether the texture should be built now. A failed build is not
    /// retried until its key changes.
    pub(crate) fn wants_texture(&self, phrase: &PhraseId, size: ViewportSize, handle_live: bool) -> bool {
        if !texture_needs_regeneration(self.texture_key.as_ref(), handle_live, phrase, size) {
            return false;
        }
        let same_key = matches!(
            &self.texture_key,
            Some((built, built_size)) if built == phrase && !size_changed(*built_size, size)
        );
        !(self.texture_failed && same_key)
    }

    pub(crate) fn wants_buffer(&self, phrase: &PhraseId, handle_live: bool) -> bool {
        if !buffer_needs_regeneration(self.buffer_key.as_ref(), handle_live, phrase) {
            return false;
        }
        !(self.buffer_failed && self.buffer_key.as_ref() == Some(phrase))
    }

    /// Point the slot at a new phrase, keeping the current handles on screen.
    pub(crate) fn retarget(&mut self, phrase: PhraseId, waveform: Option<Arc<WaveformData>>) {
        self.phrase = Some(phrase);
        self.waveform = waveform;
        self.generation_failed = false;
    }

    /// Data and resources this slot already holds for `phrase`.
    pub(crate) fn share(&self, phrase: &PhraseId) -> Option<SharedPhrase> {
        if self.phrase.as_ref() != Some(phrase) {
            return None;
        }
        let waveform = self.waveform.clone()?;
        let texture = match (&self.texture, &self.texture_key) {
            (Some(handle), Some(key)) if handle.phrase() == phrase && &key.0 == phrase => {
                Some((handle.clone(), key.clone()))
            }
            _ => None,
        };
        let buffer = match (&self.buffer, &self.buffer_key) {
            (Some(handle), Some(key)) if handle.phrase() == phrase && key == phrase => {
                Some((handle.clone(), key.clone()))
            }
            _ => None,
        };
        Some(SharedPhrase {
            waveform,
            texture,
            buffer,
        })
    }

    /// Take over another slot's data for the phrase this slot now shows.
    pub(crate) fn adopt(&mut self, shared: SharedPhrase) {
        if self.waveform.is_none() {
            self.waveform = Some(shared.waveform);
        }
        if let Some((handle, key)) = shared.texture {
            self.texture = Some(handle);
            self.texture_key = Some(key);
            self.texture_failed = false;
        }
        if let Some((handle, key)) = shared.buffer {
            self.buffer = Some(handle);
            self.buffer_key = Some(key);
            self.buffer_failed = false;
        }
    }

    /// Empty the slot; it draws nothing afterwards.
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Phrases this slot keeps alive in the caches.
    pub(crate) fn referenced_phrases(&self) -> impl Iterator<Item = &PhraseId> {
        self.phrase
            .iter()
            .chain(self.texture.as_ref().map(|h| h.phrase()))
            .chain(self.buffer.as_ref().map(|h| h.phrase()))
    }
}
