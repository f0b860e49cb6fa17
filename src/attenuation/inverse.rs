use crate::attenuation::{AttenuationModel, Candidate, ModelKind};

pub const LOG_CLAMP_FACTOR_MIN: f64 = -20.0;
pub const LOG_CLAMP_FACTOR_MAX: f64 = -1.0;
pub const LOG_CLAMP_FACTOR_INITIAL: f64 = -15.0;
/// How fast the log clamp factor follows its target, in units per second.
pub const LOG_CLAMP_FACTOR_RATE: f64 = 3.0;

/// Inverse-distance falloff with an adaptive clamp.
///
/// Every candidate loses `exp(log_clamp_factor) * distance²` of gain. The clamp
/// is steered so that the first candidate past the ceiling sits exactly at
/// zero, and everything ranked past the ceiling is cut outright.
#[derive(Debug, Clone, PartialEq)]
pub struct InverseModel {
    log_clamp_factor: f64,
}

impl Default for InverseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl InverseModel {
    pub fn new() -> Self {
        Self {
            log_clamp_factor: LOG_CLAMP_FACTOR_INITIAL,
        }
    }

    pub fn log_clamp_factor(&self) -> f64 {
        self.log_clamp_factor
    }

    pub fn clamp_factor(&self) -> f64 {
        self.log_clamp_factor.exp()
    }

    /// Target log clamp factor for candidates already ranked by adjusted gain.
    fn desired(candidates: &[Candidate], ceiling: usize) -> f64 {
        match candidates.get(ceiling) {
            None => LOG_CLAMP_FACTOR_MIN,
            Some(cutoff) if cutoff.distance <= 0.0 => LOG_CLAMP_FACTOR_MAX,
            Some(cutoff) => {
                let target = (cutoff.gain / (cutoff.distance * cutoff.distance)).ln();
                if target.is_nan() {
                    LOG_CLAMP_FACTOR_MAX
                } else {
                    target.clamp(LOG_CLAMP_FACTOR_MIN, LOG_CLAMP_FACTOR_MAX)
                }
            }
        }
    }
}

impl AttenuationModel for InverseModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Inverse
    }

    fn evaluate(&self, distance: f64, radius: f64, volume: f64) -> Option<f64> {
        if radius <= 0.0 {
            return None;
        }
        let gain = if distance < 2.0 * radius {
            let r3 = radius * radius * radius;
            1.0 - distance * distance * (4.0 * radius - distance) / (16.0 * r3)
        } else {
            radius / distance
        };
        let gain = gain * volume;
        (gain > 0.0).then_some(gain)
    }

    fn admit(&mut self, candidates: &mut [Candidate], ceiling: usize, dt: f64) {
        let clamp = self.clamp_factor();
        candidates.sort_by(|a, b| {
            let a_adjusted = a.gain - clamp * a.distance * a.distance;
            let b_adjusted = b.gain - clamp * b.distance * b.distance;
            b_adjusted.total_cmp(&a_adjusted)
        });

        let desired = Self::desired(candidates, ceiling);
        let step = LOG_CLAMP_FACTOR_RATE * dt;
        self.log_clamp_factor = if self.log_clamp_factor < desired {
            (self.log_clamp_factor + step).min(desired)
        } else {
            (self.log_clamp_factor - step).max(desired)
        };

        let clamp = self.clamp_factor();
        for (rank, candidate) in candidates.iter_mut().enumerate() {
            candidate.gain = if rank < ceiling {
                (candidate.gain - clamp * candidate.distance * candidate.distance).max(0.0)
            } else {
                0.0
            };
        }
    }

    fn reset(&mut self) {
        self.log_clamp_factor = LOG_CLAMP_FACTOR_INITIAL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attenuation::test_support::{admitted, candidates};

    #[test]
    fn test_unity_at_origin() {
        assert_eq!(InverseModel::new().evaluate(0.0, 10.0, 1.0), Some(1.0));
    }

    #[test]
    fn test_continuous_at_twice_radius() {
        let m = InverseModel::new();
        let inside = m.evaluate(20.0 - 1e-9, 10.0, 1.0).unwrap();
        let outside = m.evaluate(20.0, 10.0, 1.0).unwrap();
        assert!((inside - 0.5).abs() < 1e-6);
        assert_eq!(outside, 0.5);
    }

    #[test]
    fn test_volume_scales_gain() {
        let m = InverseModel::new();
        assert_eq!(m.evaluate(40.0, 10.0, 0.5), Some(0.125));
        assert_eq!(m.evaluate(40.0, 10.0, 0.0), None);
        assert_eq!(m.evaluate(5.0, 0.0, 1.0), None);
    }

    #[test]
    fn test_few_candidates_relax_clamp() {
        let mut m = InverseModel::new();
        let mut list = candidates(&[(5.0, 0.9)]);
        m.admit(&mut list, 4, 1.0);
        assert_eq!(m.log_clamp_factor(), LOG_CLAMP_FACTOR_INITIAL - 3.0);
        m.admit(&mut list, 4, 10.0);
        assert_eq!(m.log_clamp_factor(), LOG_CLAMP_FACTOR_MIN);
    }

    #[test]
    fn test_rate_limited_toward_cutoff() {
        let mut m = InverseModel::new();
        let mut list = candidates(&[(5.0, 0.9), (30.0, 1.0 / 3.0)]);
        m.admit(&mut list, 1, 1.0 / 60.0);
        assert!((m.log_clamp_factor() - (LOG_CLAMP_FACTOR_INITIAL + 0.05)).abs() < 1e-12);
    }

    #[test]
    fn test_cutoff_at_zero_distance_saturates() {
        let mut list = candidates(&[(0.0, 1.0), (0.0, 1.0)]);
        assert_eq!(InverseModel::desired(&list, 1), LOG_CLAMP_FACTOR_MAX);
        let mut m = InverseModel::new();
        m.admit(&mut list, 1, 1.0 / 60.0);
        assert_eq!(admitted(&list), 1);
    }

    #[test]
    fn test_never_exceeds_ceiling() {
        let mut m = InverseModel::new();
        let entries: Vec<(f64, f64)> = (0..500)
            .map(|i| {
                let d = 1.0 + i as f64 * 0.5;
                (d, m.evaluate(d, 25.0, 1.0).unwrap())
            })
            .collect();
        for _ in 0..300 {
            let mut list = candidates(&entries);
            m.admit(&mut list, 32, 1.0 / 60.0);
            assert!(admitted(&list) <= 32);
        }
        let mut list = candidates(&entries);
        m.admit(&mut list, 32, 1.0 / 60.0);
        assert_eq!(admitted(&list), 32);
    }

    #[test]
    fn test_final_gain_subtracts_clamp() {
        let mut m = InverseModel::new();
        let mut list = candidates(&[(10.0, 0.5)]);
        m.admit(&mut list, 4, 1.0 / 60.0);
        let expected = 0.5 - m.clamp_factor() * 100.0;
        assert!((list[0].gain - expected).abs() < 1e-15);
    }
}
