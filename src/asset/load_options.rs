use std::time::Duration;

/// Controls how decoded PCM is prepared before it is uploaded to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Downmix to a single channel; positional voices render mono input
    pub convert_to_mono: bool,
    /// Resample to this rate (None = keep the backend's preference or the source rate)
    pub target_sample_rate: Option<u32>,
    /// Maximum duration to decode (None = decode the entire file)
    pub max_duration: Option<Duration>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            convert_to_mono: true,
            target_sample_rate: None,
            max_duration: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert_to_mono(mut self, convert: bool) -> Self {
        self.convert_to_mono = convert;
        self
    }

    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }
}
