use crate::asset::AudioResampler;
use crate::error::{Result, VoiceGateError};
use std::time::Duration;

/// Decoded PCM audio as produced by a [`PcmLoader`](crate::asset::PcmLoader).
#[derive(Debug, Clone, PartialEq)]
pub struct PcmData {
    /// Interleaved samples normalized to `[-1.0, 1.0]`
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    /// Bit depth of the source material (informational once converted to f32)
    bits_per_sample: u16,
    duration: Duration,
    total_frames: usize,
}

impl PcmData {
    pub fn new(
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(VoiceGateError::AudioFormat(
                "The sample rate must be positive".to_string(),
            ));
        }
        if channels == 0 {
            return Err(VoiceGateError::AudioFormat(
                "There must be at least one channel".to_string(),
            ));
        }
        let total_frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate as f64);
        Ok(Self {
            samples,
            sample_rate,
            channels,
            bits_per_sample,
            duration,
            total_frames,
        })
    }

    /// Builds PCM from raw per-channel bytes.
    ///
    /// 8-bit samples are unsigned around 128, 16-bit samples are signed little endian.
    pub fn from_raw_channels(
        sample_rate: u32,
        bits_per_sample: u16,
        channels: &[Vec<u8>],
    ) -> Result<Self> {
        if channels.is_empty() {
            return Err(VoiceGateError::AudioFormat(
                "There must be at least one channel".to_string(),
            ));
        }
        if channels.iter().any(|c| c.len() != channels[0].len()) {
            return Err(VoiceGateError::AudioFormat(
                "The data bytes of the channels are of unequal length".to_string(),
            ));
        }

        let decoded: Vec<Vec<f32>> = match bits_per_sample {
            8 => channels
                .iter()
                .map(|bytes| {
                    bytes
                        .iter()
                        .map(|&b| (b as f32 - 128.0) / if b < 128 { 128.0 } else { 127.0 })
                        .collect()
                })
                .collect(),
            16 => channels
                .iter()
                .map(|bytes| {
                    bytes
                        .chunks_exact(2)
                        .map(|pair| {
                            let value = i16::from_le_bytes([pair[0], pair[1]]);
                            value as f32 / if value < 0 { 32768.0 } else { 32767.0 }
                        })
                        .collect()
                })
                .collect(),
            other => {
                return Err(VoiceGateError::AudioFormat(format!(
                    "Unsupported bits per sample: {}",
                    other
                )));
            }
        };

        let frames = decoded[0].len();
        let mut interleaved = Vec::with_capacity(frames * decoded.len());
        for frame in 0..frames {
            for channel in &decoded {
                interleaved.push(channel[frame]);
            }
        }

        Self::new(
            interleaved,
            sample_rate,
            channels.len() as u16,
            bits_per_sample,
        )
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Keeps at most `max_duration` of audio from the start.
    pub fn truncated(&self, max_duration: Duration) -> Self {
        let max_frames = (max_duration.as_secs_f64() * self.sample_rate as f64) as usize;
        if max_frames >= self.total_frames {
            return self.clone();
        }
        Self {
            samples: self.samples[..max_frames * self.channels as usize].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
            duration: Duration::from_secs_f64(max_frames as f64 / self.sample_rate as f64),
            total_frames: max_frames,
        }
    }

    /// Convert to mono by downmixing all channels
    pub fn to_mono(&self) -> Self {
        if self.channels == 1 {
            return self.clone();
        }

        let mono_samples: Vec<f32> = self
            .samples
            .chunks(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect();

        Self {
            total_frames: mono_samples.len(),
            samples: mono_samples,
            channels: 1,
            ..self.clone()
        }
    }

    /// Resample to a different sample rate using rubato
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.sample_rate {
            return Ok(self.clone());
        }

        let resampler = AudioResampler::new(
            self.sample_rate,
            target_sample_rate,
            self.channels,
            Some(1024),
        )?;
        let resampled = resampler.resample_interleaved(&self.samples)?;

        Self::new(
            resampled,
            target_sample_rate,
            self.channels,
            self.bits_per_sample,
        )
    }
}
