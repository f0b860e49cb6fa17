use crate::asset::{
    self, AssetKey, AssetOrigin, AssetState, LoadOptions, OriginId, PcmData, PcmLoader,
    SoundAsset, SymphoniaLoader,
};
use crate::atmosphere::DEFAULT_SPEED_OF_SOUND;
use crate::attenuation::{AttenuationModel, Candidate, InverseModel, LinearModel, ModelKind};
use crate::backend::{AudioBackend, BufferHandle};
use crate::config::SchedulerDesc;
use crate::error::{Result, VoiceGateError};
use crate::events::SchedulerEvent;
use crate::listener::{Listener, WorldState};
use crate::math::{DVec3, to_f32};
use crate::source::{SoundSource, SourceDesc, SourceKey, SourceState};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Frames longer than this are treated as a stall and skipped.
pub const MAX_FRAME_TIME: f64 = 0.5;

/// Outcome of one call to [`Scheduler::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReport {
    /// `dt` was zero, negative, not finite or too long; nothing changed.
    Skipped,
    Processed {
        /// Emitters the model considered audible before admission
        audible: usize,
        /// Emitters holding a voice after the update
        playing: usize,
        /// Emitters removed from the live set
        evicted: usize,
    },
}

/// Snapshot of the scheduler's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub registered_assets: usize,
    pub loaded_assets: usize,
    pub ignored_assets: usize,
    pub live_sources: usize,
    pub playing_sources: usize,
    /// Effective polyphony ceiling
    pub ceiling: usize,
    pub frames: u64,
    pub skipped_frames: u64,
}

/// Where an admitted emitter sits this frame.
#[derive(Debug, Clone, Copy)]
struct Placement {
    /// Position relative to the listener
    relative: DVec3,
    velocity: DVec3,
}

/// Frame-driven scheduler that hands a limited pool of native voices to the
/// most audible emitters.
///
/// The host registers assets, starts emitters with [`play`](Self::play) and
/// calls [`update`](Self::update) once per simulation frame. Everything runs on
/// the caller's thread; the only thing that may cross threads is the event
/// receiver.
///
/// # Example
///
/// ```ignore
/// use voicegate::{NullBackend, Scheduler, SchedulerDesc, SourceDesc};
/// use voicegate::math::DVec3;
///
/// let mut scheduler = Scheduler::new(SchedulerDesc::default(), NullBackend::new())?;
/// let horn = scheduler.register_path("sounds/horn.flac", 30.0)?;
/// let emitter = scheduler.play(horn, SourceDesc::at(DVec3::new(0.0, 0.0, 12.0)))?;
///
/// // in the simulation loop
/// scheduler.update(1.0 / 60.0, &world);
/// assert!(scheduler.is_playing(emitter));
/// ```
pub struct Scheduler<B: AudioBackend> {
    desc: SchedulerDesc,
    backend: B,
    /// False when the backend failed to initialize or was shut down
    backend_ready: bool,
    shut_down: bool,
    loader: Box<dyn PcmLoader>,
    assets: SlotMap<AssetKey, SoundAsset>,
    origins: HashMap<OriginId, AssetKey>,
    sources: SlotMap<SourceKey, SoundSource>,
    linear: LinearModel,
    inverse: InverseModel,
    listener: Listener,
    muted: bool,
    ceiling: usize,
    frames: u64,
    skipped_frames: u64,
    candidates: Vec<Candidate>,
    placements: SecondaryMap<SourceKey, Placement>,
    event_sender: Sender<SchedulerEvent>,
    event_receiver: Receiver<SchedulerEvent>,
}

impl<B: AudioBackend> Scheduler<B> {
    /// Creates a scheduler that decodes path assets with Symphonia.
    ///
    /// A backend that fails to initialize does not fail construction: the error
    /// is logged, reported once as [`SchedulerEvent::BackendUnavailable`], and
    /// the scheduler keeps running silently.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is invalid.
    pub fn new(desc: SchedulerDesc, backend: B) -> Result<Self> {
        Self::with_loader(desc, backend, SymphoniaLoader)
    }

    pub fn with_loader(
        desc: SchedulerDesc,
        mut backend: B,
        loader: impl PcmLoader + 'static,
    ) -> Result<Self> {
        validate(&desc)?;
        let (event_sender, event_receiver) = bounded(desc.event_capacity);

        let backend_ready = match backend.initialize() {
            Ok(()) => {
                backend.set_distance_model_disabled(true);
                if let Err(e) = backend.set_speed_of_sound(DEFAULT_SPEED_OF_SOUND as f32) {
                    log::debug!("Backend rejected speed of sound: {}", e);
                }
                true
            }
            Err(e) => {
                log::error!("Audio backend unavailable, running silently: {}", e);
                emit(
                    &event_sender,
                    SchedulerEvent::BackendUnavailable {
                        error: e.to_string(),
                    },
                );
                false
            }
        };

        let ceiling = effective_ceiling(&desc, &backend);
        log::info!(
            "Scheduler initialized: {} voices, {:?} model, {:?} range",
            ceiling,
            desc.model,
            desc.sound_range
        );

        Ok(Self {
            linear: LinearModel::from_bounds(desc.sound_range.radius_bounds()),
            inverse: InverseModel::new(),
            desc,
            backend,
            backend_ready,
            shut_down: false,
            loader: Box::new(loader),
            assets: SlotMap::with_key(),
            origins: HashMap::new(),
            sources: SlotMap::with_key(),
            listener: Listener::default(),
            muted: false,
            ceiling,
            frames: 0,
            skipped_frames: 0,
            candidates: Vec::new(),
            placements: SecondaryMap::new(),
            event_sender,
            event_receiver,
        })
    }

    pub fn desc(&self) -> &SchedulerDesc {
        &self.desc
    }

    /// Whether voices can be created. False in degraded mode and after shutdown.
    pub fn is_audio_available(&self) -> bool {
        self.backend_ready
    }

    /// Polyphony ceiling after applying the backend's own voice limit.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn linear_model(&self) -> &LinearModel {
        &self.linear
    }

    pub fn inverse_model(&self) -> &InverseModel {
        &self.inverse
    }

    /// Listener as rebuilt by the last processed frame.
    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Applies a new descriptor, re-deriving the linear bounds and resetting
    /// both control loops. Live emitters and loaded assets are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is invalid; the old one stays active.
    pub fn reconfigure(&mut self, desc: SchedulerDesc) -> Result<()> {
        validate(&desc)?;
        self.linear = LinearModel::from_bounds(desc.sound_range.radius_bounds());
        self.inverse.reset();
        self.ceiling = effective_ceiling(&desc, &self.backend);
        self.desc = desc;
        log::info!(
            "Scheduler reconfigured: {} voices, {:?} model, {:?} range",
            self.ceiling,
            self.desc.model,
            self.desc.sound_range
        );
        Ok(())
    }

    // ---- Asset registry ----

    /// Registers an asset, or returns the key of one with the same origin.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceGateError::AssetNotFound`] if the loader reports the
    /// origin as absent, or a configuration error for a negative radius.
    pub fn register(&mut self, origin: AssetOrigin, default_radius: f64) -> Result<AssetKey> {
        let id = origin.identity();
        if let Some(&key) = self.origins.get(&id) {
            return Ok(key);
        }
        if !(default_radius.is_finite() && default_radius >= 0.0) {
            return Err(VoiceGateError::Configuration(format!(
                "Invalid radius {} for {}",
                default_radius, origin
            )));
        }
        if !self.loader.exists(&origin) {
            return Err(VoiceGateError::AssetNotFound(origin.to_string()));
        }

        log::debug!("Registered asset {}", origin);
        let key = self.assets.insert(SoundAsset::new(origin, default_radius));
        self.origins.insert(id, key);
        Ok(key)
    }

    pub fn register_path(
        &mut self,
        path: impl Into<PathBuf>,
        default_radius: f64,
    ) -> Result<AssetKey> {
        self.register(AssetOrigin::Path(path.into()), default_radius)
    }

    /// Registers PCM already in memory. Passing a clone of the same `Arc`
    /// again returns the same key.
    pub fn register_pcm(&mut self, pcm: Arc<PcmData>, default_radius: f64) -> Result<AssetKey> {
        self.register(AssetOrigin::Memory(pcm), default_radius)
    }

    pub fn asset(&self, key: AssetKey) -> Option<&SoundAsset> {
        self.assets.get(key)
    }

    pub fn assets(&self) -> impl Iterator<Item = (AssetKey, &SoundAsset)> {
        self.assets.iter()
    }

    /// Makes an asset resident. Returns whether it is loaded afterwards.
    ///
    /// Loading happens at most once per asset: after a failure the asset is
    /// ignored and this returns `false` without touching the loader again.
    /// Playback loads assets on demand, so calling this is only needed to
    /// warm assets up ahead of time.
    pub fn load_asset(&mut self, key: AssetKey) -> bool {
        if !self.backend_ready {
            return self.assets.get(key).is_some_and(SoundAsset::is_loaded);
        }
        let Some(asset) = self.assets.get_mut(key) else {
            return false;
        };
        ensure_loaded(
            key,
            asset,
            self.loader.as_ref(),
            &mut self.backend,
            &self.desc.load_options,
            &self.event_sender,
        )
        .is_some()
    }

    /// Releases an asset's native buffer. Emitters playing it give their voice
    /// back and wait for the asset to be loaded again. Ignored assets stay
    /// ignored. Returns whether a buffer was released.
    pub fn unload_asset(&mut self, key: AssetKey) -> bool {
        let Some(asset) = self.assets.get_mut(key) else {
            return false;
        };
        let AssetState::Loaded { buffer, .. } = asset.state else {
            return false;
        };

        for (source_key, source) in self.sources.iter_mut() {
            if source.asset() != key {
                continue;
            }
            if let Some(voice) = source.suspend() {
                self.backend.destroy_voice(voice);
                emit(
                    &self.event_sender,
                    SchedulerEvent::SourceSuspended { source: source_key },
                );
            }
        }

        self.backend.delete_buffer(buffer);
        asset.state = AssetState::Unloaded;
        log::debug!("Unloaded asset {}", asset.origin());
        true
    }

    pub fn unload_all_assets(&mut self) {
        let keys: Vec<AssetKey> = self.assets.keys().collect();
        for key in keys {
            self.unload_asset(key);
        }
    }

    // ---- Emitters ----

    /// Starts a new emitter in [`SourceState::PlayPending`]. It acquires a voice
    /// on the first update that admits it.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceGateError::UnknownAsset`] if the key is stale.
    pub fn play(&mut self, asset: AssetKey, desc: SourceDesc) -> Result<SourceKey> {
        let radius = self
            .assets
            .get(asset)
            .ok_or_else(|| VoiceGateError::UnknownAsset(format!("{:?}", asset)))?
            .radius();
        let source = SoundSource::new(asset, radius, desc);
        let key = self.sources.insert(source);
        log::debug!("Emitter {:?} pending on asset {:?}", key, asset);
        Ok(key)
    }

    /// Stops an emitter. A playing emitter releases its voice immediately and is
    /// evicted on the next update; a pending one is stopped outright. Stopping
    /// twice, or stopping an evicted emitter, has no further effect.
    pub fn stop(&mut self, key: SourceKey) {
        let Some(source) = self.sources.get_mut(key) else {
            return;
        };
        let before = source.state();
        if let Some(voice) = source.request_stop() {
            self.backend.destroy_voice(voice);
        }
        if before == SourceState::PlayPending {
            emit(&self.event_sender, SchedulerEvent::SourceStopped { source: key });
        }
        if before != source.state() {
            log::debug!("Emitter {:?} {:?} -> {:?}", key, before, source.state());
        }
    }

    pub fn stop_all(&mut self) {
        let keys: Vec<SourceKey> = self.sources.keys().collect();
        for key in keys {
            self.stop(key);
        }
    }

    /// Stops every emitter riding on `body`.
    pub fn stop_attached(&mut self, body: u64) {
        let keys: Vec<SourceKey> = self
            .sources
            .iter()
            .filter(|(_, s)| s.attachment().is_some_and(|a| a.body == body))
            .map(|(key, _)| key)
            .collect();
        for key in keys {
            self.stop(key);
        }
    }

    /// Changes an emitter's pitch factor, applied on the next update.
    pub fn set_pitch(&mut self, key: SourceKey, pitch: f64) -> bool {
        self.sources
            .get_mut(key)
            .map(|s| s.pitch = pitch)
            .is_some()
    }

    /// Changes an emitter's volume factor, applied on the next update.
    pub fn set_volume(&mut self, key: SourceKey, volume: f64) -> bool {
        self.sources
            .get_mut(key)
            .map(|s| s.volume = volume)
            .is_some()
    }

    /// Moves an emitter. The position is local to its attachment, if any.
    pub fn set_position(&mut self, key: SourceKey, position: DVec3) -> bool {
        self.sources
            .get_mut(key)
            .map(|s| s.position = position)
            .is_some()
    }

    /// Pending or playing.
    pub fn is_playing(&self, key: SourceKey) -> bool {
        self.sources.get(key).is_some_and(SoundSource::is_playing)
    }

    /// Stopping, stopped or already evicted.
    pub fn is_stopped(&self, key: SourceKey) -> bool {
        self.sources.get(key).is_none_or(SoundSource::is_stopped)
    }

    /// State of a live emitter; `None` once evicted.
    pub fn state(&self, key: SourceKey) -> Option<SourceState> {
        self.sources.get(key).map(SoundSource::state)
    }

    pub fn source(&self, key: SourceKey) -> Option<&SoundSource> {
        self.sources.get(key)
    }

    pub fn sources(&self) -> impl Iterator<Item = (SourceKey, &SoundSource)> {
        self.sources.iter()
    }

    /// While muted, one-shot emitters are dropped and loops give back their voices.
    pub fn set_global_mute(&mut self, muted: bool) {
        if self.muted != muted {
            log::info!("Global mute {}", if muted { "on" } else { "off" });
        }
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    // ---- Frame update ----

    /// Runs one frame with the model chosen in the descriptor.
    pub fn update(&mut self, dt: f64, world: &dyn WorldState) -> UpdateReport {
        self.update_with(dt, self.desc.model, world)
    }

    /// Runs one frame with an explicit attenuation model.
    ///
    /// Assets are decoded synchronously the first time one of their emitters
    /// is admitted, so a frame that admits a cold asset can take noticeably
    /// longer. Use [`load_asset`](Self::load_asset) to warm assets up front.
    pub fn update_with(
        &mut self,
        dt: f64,
        model: ModelKind,
        world: &dyn WorldState,
    ) -> UpdateReport {
        if !dt.is_finite() || dt <= 0.0 || dt > MAX_FRAME_TIME {
            log::trace!("Skipping frame with dt = {}", dt);
            self.skipped_frames += 1;
            return UpdateReport::Skipped;
        }
        self.frames += 1;

        self.listener = Listener::from_world(world);
        if self.backend_ready {
            self.backend.set_listener(&self.listener);
            if let Err(e) = self
                .backend
                .set_speed_of_sound(self.listener.speed_of_sound as f32)
            {
                log::trace!("Backend rejected speed of sound: {}", e);
            }
        }

        let silent = self.muted || !self.backend_ready;
        let attenuation: &mut dyn AttenuationModel = match model {
            ModelKind::Linear => &mut self.linear,
            ModelKind::Inverse => &mut self.inverse,
        };
        let mut candidates = std::mem::take(&mut self.candidates);
        candidates.clear();
        self.placements.clear();

        for (key, source) in self.sources.iter_mut() {
            match source.state() {
                SourceState::Stopped => continue,
                SourceState::StopPending => {
                    source.finish();
                    log::debug!("Emitter {:?} stopped", key);
                    emit(&self.event_sender, SchedulerEvent::SourceStopped { source: key });
                    continue;
                }
                SourceState::Playing => {
                    if let Some(voice) = source.voice() {
                        if !source.is_looped() && self.backend.is_finished(voice) {
                            source.finish();
                            self.backend.destroy_voice(voice);
                            log::debug!("Emitter {:?} completed", key);
                            emit(
                                &self.event_sender,
                                SchedulerEvent::SourceCompleted { source: key },
                            );
                            continue;
                        }
                    }
                }
                SourceState::PlayPending => {}
            }

            if silent {
                silence(key, source, &mut self.backend, &self.event_sender);
                continue;
            }

            let (world_position, velocity) = match source.attachment() {
                Some(attachment) => world
                    .resolve_attachment(attachment, source.position())
                    .unwrap_or((source.position(), DVec3::ZERO)),
                None => (source.position(), DVec3::ZERO),
            };
            let relative = world_position - self.listener.position;
            let distance = relative.length();
            let radius = if self.listener.muffles(source.attachment()) {
                0.5 * source.radius()
            } else {
                source.radius()
            };

            match attenuation.evaluate(distance, radius, source.volume()) {
                Some(gain) => {
                    candidates.push(Candidate {
                        key,
                        distance,
                        gain,
                    });
                    self.placements.insert(key, Placement { relative, velocity });
                }
                None => silence(key, source, &mut self.backend, &self.event_sender),
            }
        }

        let audible = candidates.len();
        if !silent {
            attenuation.admit(&mut candidates, self.ceiling, dt);
        }

        // Release before acquiring to stay within the device's voice limit.
        for candidate in candidates.iter().filter(|c| c.gain <= 0.0) {
            if let Some(source) = self.sources.get_mut(candidate.key) {
                silence(candidate.key, source, &mut self.backend, &self.event_sender);
            }
        }

        for candidate in candidates.iter().filter(|c| c.gain > 0.0) {
            let Some(source) = self.sources.get_mut(candidate.key) else {
                continue;
            };
            let Some(placement) = self.placements.get(candidate.key).copied() else {
                continue;
            };

            let asset_key = source.asset();
            let buffer = match self.assets.get_mut(asset_key) {
                Some(asset) => ensure_loaded(
                    asset_key,
                    asset,
                    self.loader.as_ref(),
                    &mut self.backend,
                    &self.desc.load_options,
                    &self.event_sender,
                ),
                None => None,
            };
            let Some(buffer) = buffer else {
                if let Some(voice) = source.finish() {
                    self.backend.destroy_voice(voice);
                }
                log::debug!("Emitter {:?} stopped, asset unavailable", candidate.key);
                emit(
                    &self.event_sender,
                    SchedulerEvent::SourceStopped {
                        source: candidate.key,
                    },
                );
                continue;
            };

            let gain = candidate.gain.min(1.0);
            match source.voice() {
                Some(voice) => {
                    self.backend.set_position(voice, to_f32(placement.relative));
                    self.backend.set_velocity(voice, to_f32(placement.velocity));
                    self.backend.set_pitch(voice, source.pitch() as f32);
                    self.backend.set_gain(voice, gain as f32);
                }
                None => {
                    let voice = match self.backend.create_voice() {
                        Ok(voice) => voice,
                        Err(e) => {
                            log::warn!("Failed to create voice for {:?}: {}", candidate.key, e);
                            continue;
                        }
                    };
                    self.backend.bind_buffer(voice, buffer);
                    self.backend.set_looping(voice, source.is_looped());
                    self.backend.set_position(voice, to_f32(placement.relative));
                    self.backend.set_velocity(voice, to_f32(placement.velocity));
                    self.backend.set_pitch(voice, source.pitch() as f32);
                    self.backend.set_gain(voice, gain as f32);
                    self.backend.play(voice);
                    source.start(voice);
                    log::debug!("Emitter {:?} playing on {}", candidate.key, voice);
                    emit(
                        &self.event_sender,
                        SchedulerEvent::SourceStarted {
                            source: candidate.key,
                        },
                    );
                }
            }
            source.set_gain(gain);
        }
        self.candidates = candidates;

        let before = self.sources.len();
        self.sources.retain(|_, s| s.state() != SourceState::Stopped);
        let evicted = before - self.sources.len();
        let playing = self
            .sources
            .values()
            .filter(|s| s.state() == SourceState::Playing)
            .count();

        log::trace!(
            "Frame {}: {} audible, {} playing, {} evicted",
            self.frames,
            audible,
            playing,
            evicted
        );
        UpdateReport::Processed {
            audible,
            playing,
            evicted,
        }
    }

    // ---- Events and statistics ----

    /// Drains the events raised since the last call.
    pub fn poll_events(&self) -> Vec<SchedulerEvent> {
        self.event_receiver.try_iter().collect()
    }

    /// A receiver that can be handed to another thread.
    pub fn event_receiver(&self) -> Receiver<SchedulerEvent> {
        self.event_receiver.clone()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            registered_assets: self.assets.len(),
            loaded_assets: self.assets.values().filter(|a| a.is_loaded()).count(),
            ignored_assets: self.assets.values().filter(|a| a.is_ignored()).count(),
            live_sources: self.sources.len(),
            playing_sources: self
                .sources
                .values()
                .filter(|s| s.state() == SourceState::Playing)
                .count(),
            ceiling: self.ceiling,
            frames: self.frames,
            skipped_frames: self.skipped_frames,
        }
    }

    /// Releases every voice and buffer and closes the backend. Emitters are
    /// dropped; assets stay registered but unloaded. Also run on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        for (_, source) in self.sources.iter_mut() {
            if let Some(voice) = source.finish() {
                self.backend.destroy_voice(voice);
            }
        }
        self.sources.clear();
        self.unload_all_assets();

        if self.backend_ready {
            self.backend.shutdown();
            self.backend_ready = false;
        }
        log::info!("Scheduler shut down");
    }
}

impl<B: AudioBackend> Drop for Scheduler<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate(desc: &SchedulerDesc) -> Result<()> {
    if desc.sound_number == 0 {
        return Err(VoiceGateError::Configuration(
            "The sound number must be at least 1".to_string(),
        ));
    }
    if let Some(0) = desc.load_options.target_sample_rate {
        return Err(VoiceGateError::Configuration(
            "The target sample rate must be positive".to_string(),
        ));
    }
    Ok(())
}

fn effective_ceiling<B: AudioBackend>(desc: &SchedulerDesc, backend: &B) -> usize {
    desc.sound_number
        .min(backend.max_voices().unwrap_or(usize::MAX))
}

/// Queues an event unless the queue is full. Hosts that never poll lose the
/// newest events instead of growing the queue.
fn emit(events: &Sender<SchedulerEvent>, event: SchedulerEvent) {
    if let Err(TrySendError::Full(event)) = events.try_send(event) {
        log::trace!("Event queue full, dropping {:?}", event);
    }
}

/// Takes an emitter out of play for this frame. Loops give back their voice and
/// wait; everything else is stopped.
fn silence<B: AudioBackend>(
    key: SourceKey,
    source: &mut SoundSource,
    backend: &mut B,
    events: &Sender<SchedulerEvent>,
) {
    if source.is_looped() {
        if let Some(voice) = source.suspend() {
            backend.destroy_voice(voice);
            log::debug!("Emitter {:?} suspended", key);
            emit(events, SchedulerEvent::SourceSuspended { source: key });
        }
    } else {
        if let Some(voice) = source.finish() {
            backend.destroy_voice(voice);
        }
        log::debug!("Emitter {:?} stopped, inaudible", key);
        emit(events, SchedulerEvent::SourceStopped { source: key });
    }
}

/// Returns the asset's buffer, decoding and uploading it on first use. A
/// failure marks the asset as ignored so it is never attempted again.
fn ensure_loaded<B: AudioBackend>(
    key: AssetKey,
    asset: &mut SoundAsset,
    loader: &dyn PcmLoader,
    backend: &mut B,
    options: &LoadOptions,
    events: &Sender<SchedulerEvent>,
) -> Option<BufferHandle> {
    match asset.state {
        AssetState::Loaded { buffer, .. } => return Some(buffer),
        AssetState::Ignored => return None,
        AssetState::Unloaded => {}
    }

    match decode_and_upload(asset.origin(), loader, backend, options) {
        Ok((buffer, duration)) => {
            log::debug!("Loaded asset {} ({:?})", asset.origin(), duration);
            asset.state = AssetState::Loaded { buffer, duration };
            Some(buffer)
        }
        Err(e) => {
            log::warn!("Failed to load asset {}, ignoring it: {}", asset.origin(), e);
            asset.state = AssetState::Ignored;
            emit(
                events,
                SchedulerEvent::AssetLoadFailed {
                    asset: key,
                    error: e.to_string(),
                },
            );
            None
        }
    }
}

fn decode_and_upload<B: AudioBackend>(
    origin: &AssetOrigin,
    loader: &dyn PcmLoader,
    backend: &mut B,
    options: &LoadOptions,
) -> Result<(BufferHandle, Duration)> {
    let pcm = loader.load_pcm(origin, options)?;
    let pcm = asset::prepare(pcm, options, backend.preferred_sample_rate())?;
    let buffer = backend.upload_buffer(&pcm)?;
    Ok((buffer, pcm.duration()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;
    use crate::config::SoundRange;
    use crate::listener::CameraState;
    use crate::source::Attachment;

    struct Origin;

    impl WorldState for Origin {
        fn camera(&self) -> CameraState {
            CameraState::default()
        }

        fn resolve_attachment(
            &self,
            _attachment: Attachment,
            offset: DVec3,
        ) -> Option<(DVec3, DVec3)> {
            Some((offset, DVec3::ZERO))
        }
    }

    fn tone() -> Arc<PcmData> {
        Arc::new(PcmData::new(vec![0.0; 4800], 48000, 1, 16).unwrap())
    }

    fn scheduler(desc: SchedulerDesc) -> Scheduler<NullBackend> {
        Scheduler::new(desc, NullBackend::new()).unwrap()
    }

    #[test]
    fn test_zero_sound_number_rejected() {
        let result = Scheduler::new(SchedulerDesc::new().sound_number(0), NullBackend::new());
        assert!(matches!(result, Err(VoiceGateError::Configuration(_))));
    }

    #[test]
    fn test_backend_limit_caps_ceiling() {
        let s = Scheduler::new(
            SchedulerDesc::new().sound_number(32),
            NullBackend::with_max_voices(8),
        )
        .unwrap();
        assert_eq!(s.ceiling(), 8);
    }

    #[test]
    fn test_register_deduplicates_memory_origin() {
        let mut s = scheduler(SchedulerDesc::default());
        let pcm = tone();
        let a = s.register_pcm(pcm.clone(), 10.0).unwrap();
        let b = s.register_pcm(pcm, 20.0).unwrap();
        let c = s.register_pcm(tone(), 10.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(s.asset(a).unwrap().radius(), 10.0);
        assert_eq!(s.stats().registered_assets, 2);
    }

    #[test]
    fn test_missing_path_rejected() {
        let mut s = scheduler(SchedulerDesc::default());
        let result = s.register_path("no/such/file.wav", 10.0);
        assert!(matches!(result, Err(VoiceGateError::AssetNotFound(_))));
        assert_eq!(s.stats().registered_assets, 0);
    }

    #[test]
    fn test_play_with_stale_asset_key() {
        let mut s = scheduler(SchedulerDesc::default());
        let stale = {
            let mut other: SlotMap<AssetKey, ()> = SlotMap::with_key();
            other.insert(())
        };
        assert!(matches!(
            s.play(stale, SourceDesc::new()),
            Err(VoiceGateError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_load_then_unload() {
        let mut s = scheduler(SchedulerDesc::default());
        let key = s.register_pcm(tone(), 10.0).unwrap();
        assert!(s.load_asset(key));
        assert!(s.load_asset(key));
        assert_eq!(s.backend().live_buffers(), 1);
        let duration = s.asset(key).unwrap().duration().unwrap();
        assert!((duration.as_secs_f64() - 0.1).abs() < 1e-6);
        assert!(s.unload_asset(key));
        assert!(!s.unload_asset(key));
        assert_eq!(s.backend().live_buffers(), 0);
        assert_eq!(s.asset(key).unwrap().state(), AssetState::Unloaded);
    }

    #[test]
    fn test_assets_follow_backend_sample_rate() {
        let backend = NullBackend::new().with_preferred_sample_rate(24000);
        let mut s = Scheduler::new(SchedulerDesc::default(), backend).unwrap();
        let key = s.register_pcm(tone(), 10.0).unwrap();
        assert!(s.load_asset(key));
        let duration = s.asset(key).unwrap().duration().unwrap();
        assert!((duration.as_secs_f64() - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_unload_suspends_playing_emitters() {
        let mut s = scheduler(SchedulerDesc::default());
        let key = s.register_pcm(tone(), 10.0).unwrap();
        let emitter = s.play(key, SourceDesc::new().looped(true)).unwrap();
        s.update(1.0 / 60.0, &Origin);
        assert_eq!(s.state(emitter), Some(SourceState::Playing));
        s.unload_asset(key);
        assert_eq!(s.state(emitter), Some(SourceState::PlayPending));
        assert_eq!(s.backend().live_voices(), 0);
        s.update(1.0 / 60.0, &Origin);
        assert_eq!(s.state(emitter), Some(SourceState::Playing));
    }

    #[test]
    fn test_reconfigure_resets_control_loops() {
        let mut s = scheduler(SchedulerDesc::new().model(ModelKind::Linear));
        for _ in 0..60 {
            s.update(1.0 / 60.0, &Origin);
        }
        assert!(s.linear_model().outer_radius_factor() > 8.0);
        s.reconfigure(SchedulerDesc::new().sound_range(SoundRange::Low))
            .unwrap();
        assert_eq!(s.linear_model().outer_radius_factor(), 4.0);
        assert_eq!(s.linear_model().speed(), 0.0);
        assert_eq!(s.desc().model, ModelKind::Inverse);
    }

    #[test]
    fn test_stop_attached() {
        let mut s = scheduler(SchedulerDesc::default());
        let key = s.register_pcm(tone(), 10.0).unwrap();
        let car = Attachment::new(1, 0);
        let on_car = s.play(key, SourceDesc::attached(car, DVec3::ZERO)).unwrap();
        let elsewhere = s.play(key, SourceDesc::at(DVec3::X)).unwrap();
        s.stop_attached(1);
        assert!(s.is_stopped(on_car));
        assert!(s.is_playing(elsewhere));
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut s = scheduler(SchedulerDesc::default());
        let key = s.register_pcm(tone(), 10.0).unwrap();
        s.play(key, SourceDesc::new().looped(true)).unwrap();
        s.update(1.0 / 60.0, &Origin);
        assert_eq!(s.backend().live_voices(), 1);
        s.shutdown();
        assert_eq!(s.backend().live_voices(), 0);
        assert_eq!(s.backend().live_buffers(), 0);
        assert!(!s.backend().is_initialized());
        assert!(!s.is_audio_available());
        assert_eq!(s.stats().live_sources, 0);
        s.shutdown();
    }
}
