//! # voicegate
//!
//! A frame-driven scheduler for 3D positional audio. Hosts register any number
//! of sound emitters; every frame the scheduler decides which of them are
//! audible, hands a strictly limited pool of native voices to the most
//! important ones, and pushes position, velocity, pitch and gain to the
//! backend for those it admitted.
//!
//! ## Quick Start
//!
//! ```no_run
//! use voicegate::*;
//! use voicegate::math::DVec3;
//!
//! struct Camera;
//!
//! impl WorldState for Camera {
//!     fn camera(&self) -> CameraState {
//!         CameraState::default()
//!     }
//!
//!     fn resolve_attachment(&self, _: Attachment, offset: DVec3) -> Option<(DVec3, DVec3)> {
//!         Some((offset, DVec3::ZERO))
//!     }
//! }
//!
//! let desc = SchedulerDesc::new().sound_number(32).model(ModelKind::Inverse);
//! let mut scheduler = Scheduler::new(desc, NullBackend::new())?;
//!
//! let horn = scheduler.register_path("sounds/horn.flac", 30.0)?;
//! let emitter = scheduler.play(horn, SourceDesc::at(DVec3::new(0.0, 0.0, 12.0)))?;
//!
//! scheduler.update(1.0 / 60.0, &Camera);
//!
//! for event in scheduler.poll_events() {
//!     if let SchedulerEvent::SourceCompleted { source } = event {
//!         println!("Finished: {:?}", source);
//!     }
//! }
//! # let _ = emitter;
//! # Ok::<(), VoiceGateError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`Scheduler`]**: owns assets and emitters and runs the per-frame update
//! - **[`AttenuationModel`]**: the [`LinearModel`] and [`InverseModel`] strategies
//! - **[`AudioBackend`]**: the native playback context; [`NullBackend`] runs headless
//! - **[`PcmLoader`](asset::PcmLoader)**: where asset PCM comes from; Symphonia by default
//! - **[`WorldState`]**: camera and attachment resolution supplied by the host

pub mod asset;
pub mod atmosphere;
pub mod attenuation;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod listener;
pub mod math;
pub mod scheduler;
pub mod source;

pub use asset::{AssetKey, AssetOrigin, AssetState, SoundAsset};
pub use attenuation::{AttenuationModel, GAIN_THRESHOLD, InverseModel, LinearModel, ModelKind};
pub use backend::{AudioBackend, NullBackend};
pub use config::{SchedulerDesc, SoundRange};
pub use error::{Result, VoiceGateError};
pub use events::SchedulerEvent;
pub use listener::{CameraState, Listener, ViewMode, WorldState};
pub use scheduler::{Scheduler, SchedulerStats, UpdateReport};
pub use source::{Attachment, SoundSource, SourceDesc, SourceKey, SourceKind, SourceState};
