//! Math types for voicegate
//!
//! World-space math runs in `f64`; values handed to the backend are `f32`.

pub use glam::{DQuat, DVec3, Vec3};

/// Orthonormal orientation basis of the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub side: DVec3,
    pub up: DVec3,
    pub direction: DVec3,
}

impl Orientation {
    pub fn new(side: DVec3, up: DVec3, direction: DVec3) -> Self {
        Self {
            side,
            up,
            direction,
        }
    }

    pub fn identity() -> Self {
        Self {
            side: DVec3::X,
            up: DVec3::Y,
            direction: DVec3::Z,
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            side: rotation * DVec3::X,
            up: rotation * DVec3::Y,
            direction: rotation * DVec3::Z,
        }
    }

    pub fn look_at(direction: DVec3, up: DVec3) -> Self {
        let direction = direction.normalize_or(DVec3::Z);
        let side = up.cross(direction).normalize_or(DVec3::X);
        let up = direction.cross(side);
        Self {
            side,
            up,
            direction,
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

pub(crate) fn to_f32(v: DVec3) -> Vec3 {
    v.as_vec3()
}
