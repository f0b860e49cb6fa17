//! Configuration for the scheduler

use crate::asset::LoadOptions;
use crate::attenuation::ModelKind;

/// Default polyphony ceiling.
pub const DEFAULT_SOUND_NUMBER: usize = 16;

/// Default number of undrained events kept before new ones are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Coarse audible-range tier for the linear model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundRange {
    Low,
    #[default]
    Medium,
    High,
}

/// Bounds of the linear model's outer radius factor and of its rate of change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusBounds {
    pub minimum: f64,
    pub maximum: f64,
    pub maximum_speed: f64,
}

impl RadiusBounds {
    /// Geometric mean of the bounds, the controller's starting point.
    pub fn initial_factor(&self) -> f64 {
        (self.minimum * self.maximum).sqrt()
    }
}

impl SoundRange {
    pub fn radius_bounds(self) -> RadiusBounds {
        match self {
            Self::Low => RadiusBounds {
                minimum: 2.0,
                maximum: 8.0,
                maximum_speed: 1.0,
            },
            Self::Medium => RadiusBounds {
                minimum: 4.0,
                maximum: 16.0,
                maximum_speed: 2.0,
            },
            Self::High => RadiusBounds {
                minimum: 6.0,
                maximum: 24.0,
                maximum_speed: 3.0,
            },
        }
    }
}

/// Descriptor read at initialization and on explicit reconfiguration.
#[derive(Debug, Clone)]
pub struct SchedulerDesc {
    /// Polyphony ceiling: the most native voices that may play at once
    pub sound_number: usize,
    /// Range tier selecting the linear model's bounds
    pub sound_range: SoundRange,
    /// Attenuation model used by [`Scheduler::update`](crate::Scheduler::update)
    pub model: ModelKind,
    /// How decoded PCM is prepared before upload
    pub load_options: LoadOptions,
    /// Events kept until the host polls them; read only at construction.
    /// Zero disables events.
    pub event_capacity: usize,
}

impl Default for SchedulerDesc {
    fn default() -> Self {
        Self {
            sound_number: DEFAULT_SOUND_NUMBER,
            sound_range: SoundRange::default(),
            model: ModelKind::default(),
            load_options: LoadOptions::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SchedulerDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sound_number(mut self, number: usize) -> Self {
        self.sound_number = number;
        self
    }

    pub fn sound_range(mut self, range: SoundRange) -> Self {
        self.sound_range = range;
        self
    }

    pub fn model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
