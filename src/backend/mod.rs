//! Native audio backend interface.
//!
//! The scheduler does its own attenuation math and only ever talks to the
//! backend through [`AudioBackend`]. Every call except initialization, buffer
//! upload and voice creation is best effort: failures are swallowed by the
//! backend and never reach the scheduler's update loop.

mod null;

pub use null::NullBackend;

use crate::asset::PcmData;
use crate::error::Result;
use crate::listener::Listener;
use crate::math::Vec3;
use std::num::NonZeroU32;

/// Opaque handle to PCM uploaded to the backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(NonZeroU32);

/// Opaque handle to one native playback voice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoiceHandle(NonZeroU32);

impl BufferHandle {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl VoiceHandle {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Voice({})", self.0)
    }
}

/// Operations the scheduler needs from a native playback context.
pub trait AudioBackend {
    /// Opens the playback context.
    ///
    /// # Errors
    ///
    /// Returns an error when no device or context is available; the scheduler
    /// then runs silently.
    fn initialize(&mut self) -> Result<()>;

    fn shutdown(&mut self);

    /// Hard voice limit imposed by the device, if any.
    fn max_voices(&self) -> Option<usize> {
        None
    }

    /// Sample rate assets should be converted to before upload, if any.
    fn preferred_sample_rate(&self) -> Option<u32> {
        None
    }

    fn upload_buffer(&mut self, pcm: &PcmData) -> Result<BufferHandle>;

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_voice(&mut self) -> Result<VoiceHandle>;

    fn destroy_voice(&mut self, voice: VoiceHandle);

    fn bind_buffer(&mut self, voice: VoiceHandle, buffer: BufferHandle);

    /// Position relative to the listener.
    fn set_position(&mut self, voice: VoiceHandle, position: Vec3);

    fn set_velocity(&mut self, voice: VoiceHandle, velocity: Vec3);

    fn set_pitch(&mut self, voice: VoiceHandle, pitch: f32);

    fn set_gain(&mut self, voice: VoiceHandle, gain: f32);

    fn set_looping(&mut self, voice: VoiceHandle, looping: bool);

    fn play(&mut self, voice: VoiceHandle);

    /// Whether the voice has stopped on its own (end of a non-looping buffer).
    fn is_finished(&self, voice: VoiceHandle) -> bool;

    /// Listener state; the listener always sits at the origin.
    fn set_listener(&mut self, listener: &Listener);

    /// # Errors
    ///
    /// Some backends reject the call; the scheduler ignores the failure.
    fn set_speed_of_sound(&mut self, speed: f32) -> Result<()>;

    /// Native distance attenuation must be disabled for the scheduler's gains to hold.
    fn set_distance_model_disabled(&mut self, disabled: bool);
}
