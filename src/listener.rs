//! Listener state rebuilt from the world every frame.

use crate::atmosphere::{Atmosphere, DEFAULT_SPEED_OF_SOUND};
use crate::math::{DVec3, Orientation};
use crate::source::Attachment;

/// Camera mode of the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Inside the cab or cabin
    Interior,
    /// Inside, looking along the track ahead
    InteriorLookAhead,
    #[default]
    Exterior,
    Track,
    FlyBy,
    FlyByZooming,
}

impl ViewMode {
    pub fn is_interior(self) -> bool {
        matches!(self, Self::Interior | Self::InteriorLookAhead)
    }
}

/// Camera pose as supplied by the host once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: DVec3,
    pub orientation: Orientation,
    pub velocity: DVec3,
    pub view_mode: ViewMode,
    /// Body the observer rides in, if any
    pub attachment: Option<Attachment>,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            orientation: Orientation::identity(),
            velocity: DVec3::ZERO,
            view_mode: ViewMode::default(),
            attachment: None,
        }
    }
}

/// Read-only view of the simulation the scheduler consults each frame.
pub trait WorldState {
    fn camera(&self) -> CameraState;

    /// Maps an attachment and a local offset to world position and velocity.
    ///
    /// Returns `None` when the attachment no longer exists; the emitter's
    /// position is then taken as absolute.
    fn resolve_attachment(&self, attachment: Attachment, offset: DVec3) -> Option<(DVec3, DVec3)>;

    /// Atmosphere used to derive the speed of sound, if the world models one.
    fn atmosphere(&self) -> Option<Atmosphere> {
        None
    }
}

/// Observer state for a single frame.
///
/// All emitter positions handed to the backend are relative to `position`,
/// so the native listener itself always sits at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub position: DVec3,
    pub orientation: Orientation,
    pub velocity: DVec3,
    pub view_mode: ViewMode,
    pub attachment: Option<Attachment>,
    pub speed_of_sound: f64,
}

impl Default for Listener {
    fn default() -> Self {
        Self::from_camera(CameraState::default(), None)
    }
}

impl Listener {
    pub fn from_world(world: &dyn WorldState) -> Self {
        Self::from_camera(world.camera(), world.atmosphere())
    }

    pub fn from_camera(camera: CameraState, atmosphere: Option<Atmosphere>) -> Self {
        let speed_of_sound = atmosphere
            .map(|a| a.speed_of_sound(camera.position.y))
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_SPEED_OF_SOUND);
        Self {
            position: camera.position,
            orientation: camera.orientation,
            velocity: camera.velocity,
            view_mode: camera.view_mode,
            attachment: camera.attachment,
            speed_of_sound,
        }
    }

    /// Whether an emitter's radius is halved for this observer: interior views
    /// muffle everything not attached to the observer's own car. Other cars
    /// of the same train are muffled too.
    pub fn muffles(&self, emitter_attachment: Option<Attachment>) -> bool {
        if !self.view_mode.is_interior() {
            return false;
        }
        match (emitter_attachment, self.attachment) {
            (Some(emitter), Some(own)) => emitter != own,
            _ => true,
        }
    }
}
