use crate::asset::PcmData;
use crate::backend::{AudioBackend, BufferHandle, VoiceHandle};
use crate::error::{Result, VoiceGateError};
use crate::listener::Listener;
use crate::math::Vec3;
use std::collections::{HashMap, HashSet};

/// Headless backend that tracks handles without producing sound.
///
/// Useful for servers, tools and tests. Voices never finish on their own.
#[derive(Debug, Default)]
pub struct NullBackend {
    max_voices: Option<usize>,
    sample_rate: Option<u32>,
    unavailable: Option<String>,
    initialized: bool,
    next_handle: u32,
    buffers: HashMap<BufferHandle, usize>,
    voices: HashSet<VoiceHandle>,
    playing: HashSet<VoiceHandle>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose device reports a hard voice limit.
    pub fn with_max_voices(max_voices: usize) -> Self {
        Self {
            max_voices: Some(max_voices),
            ..Self::default()
        }
    }

    /// Asks for assets to be converted to `rate` before upload.
    pub fn with_preferred_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// A backend whose initialization fails, as when no device is present.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn playing_voices(&self) -> usize {
        self.playing.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl AudioBackend for NullBackend {
    fn initialize(&mut self) -> Result<()> {
        if let Some(reason) = &self.unavailable {
            return Err(VoiceGateError::AudioDevice(reason.clone()));
        }
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.voices.clear();
        self.playing.clear();
        self.buffers.clear();
        self.initialized = false;
    }

    fn max_voices(&self) -> Option<usize> {
        self.max_voices
    }

    fn preferred_sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    fn upload_buffer(&mut self, pcm: &PcmData) -> Result<BufferHandle> {
        let raw = self.allocate();
        let handle = BufferHandle::new(raw)
            .ok_or_else(|| VoiceGateError::Backend("Buffer handles exhausted".to_string()))?;
        self.buffers.insert(handle, pcm.len());
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn create_voice(&mut self) -> Result<VoiceHandle> {
        if let Some(max) = self.max_voices {
            if self.voices.len() >= max {
                return Err(VoiceGateError::Backend(format!(
                    "Voice limit of {} reached",
                    max
                )));
            }
        }
        let raw = self.allocate();
        let handle = VoiceHandle::new(raw)
            .ok_or_else(|| VoiceGateError::Backend("Voice handles exhausted".to_string()))?;
        self.voices.insert(handle);
        Ok(handle)
    }

    fn destroy_voice(&mut self, voice: VoiceHandle) {
        self.voices.remove(&voice);
        self.playing.remove(&voice);
    }

    fn bind_buffer(&mut self, _voice: VoiceHandle, _buffer: BufferHandle) {}

    fn set_position(&mut self, _voice: VoiceHandle, _position: Vec3) {}

    fn set_velocity(&mut self, _voice: VoiceHandle, _velocity: Vec3) {}

    fn set_pitch(&mut self, _voice: VoiceHandle, _pitch: f32) {}

    fn set_gain(&mut self, _voice: VoiceHandle, _gain: f32) {}

    fn set_looping(&mut self, _voice: VoiceHandle, _looping: bool) {}

    fn play(&mut self, voice: VoiceHandle) {
        if self.voices.contains(&voice) {
            self.playing.insert(voice);
        }
    }

    fn is_finished(&self, _voice: VoiceHandle) -> bool {
        false
    }

    fn set_listener(&mut self, _listener: &Listener) {}

    fn set_speed_of_sound(&mut self, speed: f32) -> Result<()> {
        if speed > 0.0 {
            Ok(())
        } else {
            Err(VoiceGateError::Backend(format!(
                "Invalid speed of sound: {}",
                speed
            )))
        }
    }

    fn set_distance_model_disabled(&mut self, _disabled: bool) {}
}
