//! Emitters and their playback state machine.

use crate::asset::AssetKey;
use crate::backend::VoiceHandle;
use crate::math::DVec3;

slotmap::new_key_type! {
    /// Generation-checked handle to a live emitter.
    pub struct SourceKey;
}

/// Opaque identity of a moving body (a vehicle, a car of a train) plus a
/// sub-index within it. The scheduler never interprets either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment {
    pub body: u64,
    pub index: u32,
}

impl Attachment {
    pub fn new(body: u64, index: u32) -> Self {
        Self { body, index }
    }
}

/// What an emitter belongs to. Set by the caller at creation, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    AttachedBody,
    TrackTriggered,
    Ambient,
    Fixed,
    ObjectAttached,
    #[default]
    Undefined,
}

/// Playback state of an emitter.
///
/// An emitter holds a native voice exactly while it is `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Waiting for admission or for its asset
    PlayPending,
    Playing,
    /// Stop requested; becomes `Stopped` on the next update
    StopPending,
    /// Terminal; the emitter is evicted at the end of the update
    Stopped,
}

/// Parameters for a new emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDesc {
    /// Local offset when attached, world position otherwise
    pub position: DVec3,
    pub pitch: f64,
    pub volume: f64,
    pub looped: bool,
    pub attachment: Option<Attachment>,
    pub kind: SourceKind,
    /// Overrides the asset's default radius
    pub radius: Option<f64>,
}

impl Default for SourceDesc {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            pitch: 1.0,
            volume: 1.0,
            looped: false,
            attachment: None,
            kind: SourceKind::default(),
            radius: None,
        }
    }
}

impl SourceDesc {
    pub fn new() -> Self {
        Self::default()
    }

    /// An emitter fixed at a world position.
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            kind: SourceKind::Fixed,
            ..Self::default()
        }
    }

    /// An emitter riding on a body at a local offset.
    pub fn attached(attachment: Attachment, offset: DVec3) -> Self {
        Self {
            position: offset,
            attachment: Some(attachment),
            kind: SourceKind::AttachedBody,
            ..Self::default()
        }
    }

    pub fn position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    pub fn pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    pub fn kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// One logical sound instance tracked by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSource {
    asset: AssetKey,
    radius: f64,
    pub(crate) pitch: f64,
    pub(crate) volume: f64,
    pub(crate) position: DVec3,
    attachment: Option<Attachment>,
    looped: bool,
    kind: SourceKind,
    state: SourceState,
    voice: Option<VoiceHandle>,
    /// Gain sent to the backend on the last admitted frame
    gain: f64,
}

impl SoundSource {
    pub(crate) fn new(asset: AssetKey, default_radius: f64, desc: SourceDesc) -> Self {
        Self {
            asset,
            radius: desc.radius.unwrap_or(default_radius),
            pitch: desc.pitch,
            volume: desc.volume,
            position: desc.position,
            attachment: desc.attachment,
            looped: desc.looped,
            kind: desc.kind,
            state: SourceState::PlayPending,
            voice: None,
            gain: 0.0,
        }
    }

    pub fn asset(&self) -> AssetKey {
        self.asset
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn attachment(&self) -> Option<Attachment> {
        self.attachment
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn voice(&self) -> Option<VoiceHandle> {
        self.voice
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, SourceState::PlayPending | SourceState::Playing)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state, SourceState::StopPending | SourceState::Stopped)
    }

    pub(crate) fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }

    /// PlayPending -> Playing with a freshly acquired voice.
    pub(crate) fn start(&mut self, voice: VoiceHandle) {
        debug_assert_eq!(self.state, SourceState::PlayPending);
        debug_assert!(self.voice.is_none());
        self.voice = Some(voice);
        self.state = SourceState::Playing;
    }

    /// Playing -> PlayPending, handing back the voice to release.
    pub(crate) fn suspend(&mut self) -> Option<VoiceHandle> {
        if self.state != SourceState::Playing {
            return None;
        }
        self.state = SourceState::PlayPending;
        self.gain = 0.0;
        self.voice.take()
    }

    /// Caller-initiated stop. Returns the voice to release, if any.
    ///
    /// Playing moves to StopPending, PlayPending goes straight to Stopped,
    /// and emitters already stopping are left alone.
    pub(crate) fn request_stop(&mut self) -> Option<VoiceHandle> {
        match self.state {
            SourceState::Playing => {
                self.state = SourceState::StopPending;
                self.gain = 0.0;
                self.voice.take()
            }
            SourceState::PlayPending => {
                self.state = SourceState::Stopped;
                None
            }
            SourceState::StopPending | SourceState::Stopped => None,
        }
    }

    /// Any state -> Stopped. Returns the voice to release, if any.
    pub(crate) fn finish(&mut self) -> Option<VoiceHandle> {
        self.state = SourceState::Stopped;
        self.gain = 0.0;
        self.voice.take()
    }
}
