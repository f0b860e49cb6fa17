//! Distance attenuation and voice admission.
//!
//! A model turns an emitter's distance, radius and volume into a raw gain,
//! then ranks the frame's audible candidates against the polyphony ceiling
//! while running its own smoothing control loop.

mod inverse;
mod linear;

pub use inverse::InverseModel;
pub use linear::LinearModel;

use crate::source::SourceKey;

/// Gains at or below this are treated as silence.
pub const GAIN_THRESHOLD: f64 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    /// Smoothstep ramp between an inner and an adaptive outer radius
    Linear,
    /// Inverse-distance falloff cut by an adaptive clamp factor
    #[default]
    Inverse,
}

/// An audible emitter competing for a voice this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub key: SourceKey,
    pub distance: f64,
    pub gain: f64,
}

pub trait AttenuationModel {
    fn kind(&self) -> ModelKind;

    /// Raw gain of an emitter, or `None` if it cannot be heard at all.
    fn evaluate(&self, distance: f64, radius: f64, volume: f64) -> Option<f64>;

    /// Advances the control loop by `dt` and rewrites every candidate's gain
    /// to its final value. Candidates left with a gain of zero or less are
    /// not admitted; at most `ceiling` candidates keep a positive gain.
    fn admit(&mut self, candidates: &mut [Candidate], ceiling: usize, dt: f64);

    /// Returns the control loop to its initial state.
    fn reset(&mut self);
}

/// Sorts candidates by descending gain, ties broken by distance.
pub(crate) fn rank_by_gain(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.gain
            .total_cmp(&a.gain)
            .then_with(|| a.distance.total_cmp(&b.distance))
    });
}
