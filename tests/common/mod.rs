#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use voicegate::asset::{AssetOrigin, LoadOptions, PcmData, PcmLoader};
use voicegate::backend::{AudioBackend, BufferHandle, VoiceHandle};
use voicegate::math::{DVec3, Vec3};
use voicegate::{
    Attachment, CameraState, Listener, Result, Scheduler, SourceState, VoiceGateError, WorldState,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const DT: f64 = 1.0 / 60.0;

/// Parameters last pushed to one voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceRecord {
    pub buffer: Option<BufferHandle>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub pitch: f32,
    pub gain: f32,
    pub looping: bool,
    pub playing: bool,
}

impl Default for VoiceRecord {
    fn default() -> Self {
        Self {
            buffer: None,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            pitch: 1.0,
            gain: 1.0,
            looping: false,
            playing: false,
        }
    }
}

/// Backend that records every call instead of producing sound.
#[derive(Debug, Default)]
pub struct MockBackend {
    pub fail_init: bool,
    pub fail_voice_creation: bool,
    pub max_voices: Option<usize>,
    pub voices: HashMap<VoiceHandle, VoiceRecord>,
    pub buffers: HashSet<BufferHandle>,
    pub finished: HashSet<VoiceHandle>,
    pub voices_created: usize,
    pub voices_destroyed: usize,
    pub calls: usize,
    pub speed_of_sound: Option<f32>,
    pub distance_model_disabled: bool,
    pub listener: Option<Listener>,
    pub shut_down: bool,
    next_handle: u32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn with_max_voices(max_voices: usize) -> Self {
        Self {
            max_voices: Some(max_voices),
            ..Self::default()
        }
    }

    /// Marks every voice as having reached the end of its buffer.
    pub fn finish_all(&mut self) {
        self.finished.extend(self.voices.keys().copied());
    }

    pub fn voice(&self, voice: VoiceHandle) -> &VoiceRecord {
        &self.voices[&voice]
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl AudioBackend for MockBackend {
    fn initialize(&mut self) -> Result<()> {
        self.calls += 1;
        if self.fail_init {
            Err(VoiceGateError::AudioDevice("no output device".to_string()))
        } else {
            Ok(())
        }
    }

    fn shutdown(&mut self) {
        self.calls += 1;
        self.shut_down = true;
    }

    fn max_voices(&self) -> Option<usize> {
        self.max_voices
    }

    fn upload_buffer(&mut self, _pcm: &PcmData) -> Result<BufferHandle> {
        self.calls += 1;
        let handle = BufferHandle::new(self.next()).unwrap();
        self.buffers.insert(handle);
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.calls += 1;
        assert!(self.buffers.remove(&buffer), "deleted unknown buffer");
    }

    fn create_voice(&mut self) -> Result<VoiceHandle> {
        self.calls += 1;
        if self.fail_voice_creation {
            return Err(VoiceGateError::Backend("out of voices".to_string()));
        }
        let handle = VoiceHandle::new(self.next()).unwrap();
        self.voices.insert(handle, VoiceRecord::default());
        self.voices_created += 1;
        Ok(handle)
    }

    fn destroy_voice(&mut self, voice: VoiceHandle) {
        self.calls += 1;
        assert!(self.voices.remove(&voice).is_some(), "destroyed unknown voice");
        self.finished.remove(&voice);
        self.voices_destroyed += 1;
    }

    fn bind_buffer(&mut self, voice: VoiceHandle, buffer: BufferHandle) {
        self.calls += 1;
        assert!(self.buffers.contains(&buffer), "bound unknown buffer");
        self.voices.get_mut(&voice).unwrap().buffer = Some(buffer);
    }

    fn set_position(&mut self, voice: VoiceHandle, position: Vec3) {
        self.calls += 1;
        self.voices.get_mut(&voice).unwrap().position = position;
    }

    fn set_velocity(&mut self, voice: VoiceHandle, velocity: Vec3) {
        self.calls += 1;
        self.voices.get_mut(&voice).unwrap().velocity = velocity;
    }

    fn set_pitch(&mut self, voice: VoiceHandle, pitch: f32) {
        self.calls += 1;
        self.voices.get_mut(&voice).unwrap().pitch = pitch;
    }

    fn set_gain(&mut self, voice: VoiceHandle, gain: f32) {
        self.calls += 1;
        self.voices.get_mut(&voice).unwrap().gain = gain;
    }

    fn set_looping(&mut self, voice: VoiceHandle, looping: bool) {
        self.calls += 1;
        self.voices.get_mut(&voice).unwrap().looping = looping;
    }

    fn play(&mut self, voice: VoiceHandle) {
        self.calls += 1;
        self.voices.get_mut(&voice).unwrap().playing = true;
    }

    fn is_finished(&self, voice: VoiceHandle) -> bool {
        self.finished.contains(&voice)
    }

    fn set_listener(&mut self, listener: &Listener) {
        self.calls += 1;
        self.listener = Some(*listener);
    }

    fn set_speed_of_sound(&mut self, speed: f32) -> Result<()> {
        self.calls += 1;
        self.speed_of_sound = Some(speed);
        Ok(())
    }

    fn set_distance_model_disabled(&mut self, disabled: bool) {
        self.calls += 1;
        self.distance_model_disabled = disabled;
    }
}

/// Loader that serves a short tone for every origin and counts decode attempts.
#[derive(Debug, Clone, Default)]
pub struct CountingLoader {
    pub attempts: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl PcmLoader for CountingLoader {
    fn exists(&self, _origin: &AssetOrigin) -> bool {
        true
    }

    fn load_pcm(&self, origin: &AssetOrigin, _options: &LoadOptions) -> Result<PcmData> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VoiceGateError::AudioLoading(format!(
                "Corrupt stream in {}",
                origin
            )));
        }
        tone()
    }
}

pub fn tone() -> Result<PcmData> {
    let samples = (0..4410)
        .map(|i| (i as f32 * 0.05).sin() * 0.5)
        .collect();
    PcmData::new(samples, 44100, 1, 16)
}

/// World with a fixed camera and a table of body poses.
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    pub camera: CameraState,
    pub bodies: HashMap<u64, (DVec3, DVec3)>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: u64, position: DVec3, velocity: DVec3) -> Self {
        self.bodies.insert(body, (position, velocity));
        self
    }
}

impl WorldState for StaticWorld {
    fn camera(&self) -> CameraState {
        self.camera
    }

    fn resolve_attachment(&self, attachment: Attachment, offset: DVec3) -> Option<(DVec3, DVec3)> {
        self.bodies
            .get(&attachment.body)
            .map(|&(position, velocity)| (position + offset, velocity))
    }
}

/// Every emitter holds a voice exactly while it is playing, and the backend has
/// no voices nobody owns.
pub fn assert_voice_pairing(scheduler: &Scheduler<MockBackend>) {
    let mut held = 0;
    for (key, source) in scheduler.sources() {
        let playing = source.state() == SourceState::Playing;
        assert_eq!(
            source.voice().is_some(),
            playing,
            "emitter {:?} in {:?} with voice {:?}",
            key,
            source.state(),
            source.voice()
        );
        if let Some(voice) = source.voice() {
            assert!(scheduler.backend().voices.contains_key(&voice));
            held += 1;
        }
    }
    assert_eq!(held, scheduler.backend().voices.len(), "leaked voices");
}

pub fn playing_count(scheduler: &Scheduler<MockBackend>) -> usize {
    scheduler
        .sources()
        .filter(|(_, s)| s.state() == SourceState::Playing)
        .count()
}
