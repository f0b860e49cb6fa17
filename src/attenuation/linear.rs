use crate::attenuation::{
    AttenuationModel, Candidate, GAIN_THRESHOLD, ModelKind, rank_by_gain,
};
use crate::config::RadiusBounds;

/// Acceleration of the outer radius factor while too many emitters are audible.
const SHRINK_ACCELERATION: f64 = 1.0;
/// Acceleration of the outer radius factor while voices are to spare.
const GROW_ACCELERATION: f64 = 0.5;

/// Smoothstep falloff between the emitter's radius and an adaptive outer radius.
///
/// The outer radius is `outer_radius_factor * radius`. The factor drifts with a
/// rate-limited speed: it shrinks while the audible count sits within two of the
/// ceiling, grows while at least six voices are free, and coasts to a halt in
/// between.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    bounds: RadiusBounds,
    outer_radius_factor: f64,
    speed: f64,
}

impl LinearModel {
    pub fn from_bounds(bounds: RadiusBounds) -> Self {
        Self {
            bounds,
            outer_radius_factor: bounds.initial_factor(),
            speed: 0.0,
        }
    }

    pub fn bounds(&self) -> RadiusBounds {
        self.bounds
    }

    pub fn outer_radius_factor(&self) -> f64 {
        self.outer_radius_factor
    }

    /// Current rate of change of the outer radius factor, per second.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    fn steer(&mut self, audible: usize, ceiling: usize, dt: f64) {
        if audible + 2 >= ceiling {
            self.speed -= SHRINK_ACCELERATION * dt;
        } else if audible + 6 <= ceiling {
            self.speed += GROW_ACCELERATION * dt;
        } else {
            let step = SHRINK_ACCELERATION * dt;
            if self.speed.abs() <= step {
                self.speed = 0.0;
            } else {
                self.speed -= step * self.speed.signum();
            }
        }

        let max_speed = self.bounds.maximum_speed;
        self.speed = self.speed.clamp(-max_speed, max_speed);

        self.outer_radius_factor += self.speed * dt;
        if self.outer_radius_factor <= self.bounds.minimum {
            self.outer_radius_factor = self.bounds.minimum;
            self.speed = 0.0;
        } else if self.outer_radius_factor >= self.bounds.maximum {
            self.outer_radius_factor = self.bounds.maximum;
            self.speed = 0.0;
        }
    }
}

impl AttenuationModel for LinearModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }

    fn evaluate(&self, distance: f64, radius: f64, volume: f64) -> Option<f64> {
        let inner = radius;
        let outer = self.outer_radius_factor * inner;
        let gain = if distance <= inner {
            1.0
        } else if distance >= outer {
            0.0
        } else {
            let g = (outer - distance) / (outer - inner);
            (3.0 - 2.0 * g) * g * g
        };
        let gain = gain * volume;
        (gain > GAIN_THRESHOLD).then_some(gain)
    }

    fn admit(&mut self, candidates: &mut [Candidate], ceiling: usize, dt: f64) {
        self.steer(candidates.len(), ceiling, dt);

        for candidate in candidates.iter_mut() {
            candidate.gain = (candidate.gain - GAIN_THRESHOLD) / (1.0 - GAIN_THRESHOLD);
        }

        if candidates.len() > ceiling {
            rank_by_gain(candidates);
            for candidate in &mut candidates[ceiling..] {
                candidate.gain = 0.0;
            }
        }
    }

    fn reset(&mut self) {
        self.outer_radius_factor = self.bounds.initial_factor();
        self.speed = 0.0;
    }
}
