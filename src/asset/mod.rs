//! Sound assets: origins, decoded PCM and the load state machine.
//!
//! An asset is created when first registered, loaded on the first playback that
//! needs it, and unloaded explicitly or at teardown. A failed load is sticky:
//! the asset is marked [`AssetState::Ignored`] and never decoded again.

mod load_options;
mod loader;
mod pcm;
mod resampler;

pub use load_options::LoadOptions;
pub use loader::{PcmLoader, SymphoniaLoader};
pub use pcm::PcmData;
pub use resampler::AudioResampler;

use crate::backend::BufferHandle;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

slotmap::new_key_type! {
    /// Generation-checked handle to a registered asset.
    pub struct AssetKey;
}

/// Where an asset's PCM comes from.
#[derive(Debug, Clone)]
pub enum AssetOrigin {
    /// A file on disk, decoded by the loader
    Path(PathBuf),
    /// PCM already in memory; identity is the `Arc` allocation
    Memory(Arc<PcmData>),
}

impl AssetOrigin {
    pub(crate) fn identity(&self) -> OriginId {
        match self {
            Self::Path(path) => OriginId::Path(path.clone()),
            Self::Memory(pcm) => OriginId::Memory(Arc::as_ptr(pcm) as usize),
        }
    }
}

impl std::fmt::Display for AssetOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Memory(pcm) => write!(f, "<memory {:p}>", Arc::as_ptr(pcm)),
        }
    }
}

/// Deduplication key. The registry owns an `Arc` clone of every memory origin,
/// so a pointer stays unique for as long as its entry exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum OriginId {
    Path(PathBuf),
    Memory(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Unloaded,
    Loaded {
        buffer: BufferHandle,
        duration: Duration,
    },
    /// A load attempt failed; no further attempts are made.
    Ignored,
}

#[derive(Debug)]
pub struct SoundAsset {
    origin: AssetOrigin,
    radius: f64,
    pub(crate) state: AssetState,
}

impl SoundAsset {
    pub(crate) fn new(origin: AssetOrigin, radius: f64) -> Self {
        Self {
            origin,
            radius,
            state: AssetState::Unloaded,
        }
    }

    pub fn origin(&self) -> &AssetOrigin {
        &self.origin
    }

    /// Default effective radius handed to emitters playing this asset.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn state(&self) -> AssetState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, AssetState::Loaded { .. })
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.state, AssetState::Ignored)
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        match self.state {
            AssetState::Loaded { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self.state {
            AssetState::Loaded { duration, .. } => Some(duration),
            _ => None,
        }
    }
}

/// Applies the resampling half of [`LoadOptions`] once the loader has produced PCM.
pub(crate) fn prepare(
    pcm: PcmData,
    options: &LoadOptions,
    preferred_sample_rate: Option<u32>,
) -> Result<PcmData> {
    match options.target_sample_rate.or(preferred_sample_rate) {
        Some(rate) if rate != pcm.sample_rate() => pcm.resample(rate),
        _ => Ok(pcm),
    }
}
