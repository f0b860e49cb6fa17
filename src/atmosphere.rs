//! Atmospheric model feeding the backend's speed of sound.

const MOLAR_MASS: f64 = 0.0289644;
const UNIVERSAL_GAS_CONSTANT: f64 = 8.31447;
const TEMPERATURE_LAPSE_RATE: f64 = -0.0065;
const COEFFICIENT_OF_STIFFNESS: f64 = 144117.325646911;

/// Speed of sound used when the world supplies no atmosphere.
pub const DEFAULT_SPEED_OF_SOUND: f64 = 343.0;

/// Standard-lapse-rate atmosphere anchored at sea level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmosphere {
    /// Kelvin
    pub sea_level_temperature: f64,
    /// Pascal
    pub sea_level_pressure: f64,
    /// Elevation of the world origin above sea level, in meters
    pub initial_elevation: f64,
    pub gravity: f64,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            sea_level_temperature: 293.15,
            sea_level_pressure: 101325.0,
            initial_elevation: 0.0,
            gravity: 9.80665,
        }
    }
}

impl Atmosphere {
    /// Builds an atmosphere from conditions measured at `elevation`.
    pub fn from_initial_conditions(
        temperature: f64,
        pressure: f64,
        elevation: f64,
        gravity: f64,
    ) -> Self {
        let sea_level_temperature = temperature - TEMPERATURE_LAPSE_RATE * elevation;
        let exponent = gravity * MOLAR_MASS / (UNIVERSAL_GAS_CONSTANT * TEMPERATURE_LAPSE_RATE);
        let base = 1.0 + TEMPERATURE_LAPSE_RATE * elevation / sea_level_temperature;
        let sea_level_pressure = if base >= 0.0 {
            (pressure * base.powf(exponent)).max(0.001)
        } else {
            0.001
        };
        Self {
            sea_level_temperature,
            sea_level_pressure,
            initial_elevation: elevation,
            gravity,
        }
    }

    pub fn air_temperature(&self, elevation: f64) -> f64 {
        (self.sea_level_temperature + TEMPERATURE_LAPSE_RATE * elevation).max(1.0)
    }

    pub fn air_pressure(&self, elevation: f64) -> f64 {
        let exponent =
            -self.gravity * MOLAR_MASS / (UNIVERSAL_GAS_CONSTANT * TEMPERATURE_LAPSE_RATE);
        let base = 1.0 + TEMPERATURE_LAPSE_RATE * elevation / self.sea_level_temperature;
        if base >= 0.0 {
            (self.sea_level_pressure * base.powf(exponent)).max(0.001)
        } else {
            0.001
        }
    }

    pub fn air_density(pressure: f64, temperature: f64) -> f64 {
        (pressure * MOLAR_MASS / (UNIVERSAL_GAS_CONSTANT * temperature)).max(0.001)
    }

    /// Speed of sound at a height `y` above the world origin.
    pub fn speed_of_sound(&self, y: f64) -> f64 {
        let elevation = y + self.initial_elevation;
        let temperature = self.air_temperature(elevation);
        let pressure = self.air_pressure(elevation);
        (COEFFICIENT_OF_STIFFNESS / Self::air_density(pressure, temperature)).sqrt()
    }
}
