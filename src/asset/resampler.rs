use crate::error::{Result, VoiceGateError};
use rubato::{FftFixedIn, Resampler};

/// Offline sample-rate converter used while preparing assets for upload.
pub struct AudioResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    channels: u16,
    chunk_size: usize,
}

impl AudioResampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: u16,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(VoiceGateError::AudioFormat(
                "Sample rates must be greater than 0".to_string(),
            ));
        }

        if channels == 0 {
            return Err(VoiceGateError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            channels,
            chunk_size: chunk_size.unwrap_or(1024),
        })
    }

    /// Resamples interleaved audio, processing all channels in one pass.
    pub fn resample_interleaved(&self, interleaved: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate {
            return Ok(interleaved.to_vec());
        }

        let channels = self.channels as usize;
        let frames = interleaved.len() / channels;
        let mut planar: Vec<Vec<f32>> = (0..channels)
            .map(|ch| interleaved.iter().skip(ch).step_by(channels).copied().collect())
            .collect();

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2,
            channels,
        )
        .map_err(|e| VoiceGateError::AudioLoading(format!("Failed to create resampler: {}", e)))?;

        // Zero-pad to a whole number of input chunks.
        let padded = frames.div_ceil(self.chunk_size).max(1) * self.chunk_size;
        for channel in &mut planar {
            channel.resize(padded, 0.0);
        }

        let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels];
        for start in (0..padded).step_by(self.chunk_size) {
            let chunk: Vec<&[f32]> = planar
                .iter()
                .map(|channel| &channel[start..start + self.chunk_size])
                .collect();
            let processed = resampler
                .process(&chunk, None)
                .map_err(|e| VoiceGateError::AudioLoading(format!("Resampling error: {}", e)))?;
            for (out, channel) in output.iter_mut().zip(processed) {
                out.extend_from_slice(&channel);
            }
        }

        let expected = (frames as f64 * self.resample_ratio()).ceil() as usize;
        let produced = output[0].len().min(expected);

        let mut interleaved = Vec::with_capacity(produced * channels);
        for frame in 0..produced {
            for channel in &output {
                interleaved.push(channel[frame]);
            }
        }
        Ok(interleaved)
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    pub fn resample_ratio(&self) -> f64 {
        self.target_sample_rate as f64 / self.source_sample_rate as f64
    }
}
