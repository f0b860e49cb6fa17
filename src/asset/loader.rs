use crate::asset::{AssetOrigin, LoadOptions, PcmData};
use crate::error::{Result, VoiceGateError};
use std::fs::File;
use std::path::Path;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Source of decoded PCM for an [`AssetOrigin`].
///
/// The scheduler calls [`load_pcm`](PcmLoader::load_pcm) at most once per asset:
/// a failure marks the asset as ignored for the rest of its lifetime.
///
/// # Example
///
/// ```ignore
/// use voicegate::asset::{AssetOrigin, LoadOptions, PcmData, PcmLoader};
/// use voicegate::error::Result;
///
/// struct ToneLoader;
///
/// impl PcmLoader for ToneLoader {
///     fn load_pcm(&self, _origin: &AssetOrigin, _options: &LoadOptions) -> Result<PcmData> {
///         PcmData::new(vec![0.0; 4800], 48000, 1, 16)
///     }
/// }
/// ```
pub trait PcmLoader {
    /// Whether the origin can be registered at all. Missing files are refused.
    fn exists(&self, origin: &AssetOrigin) -> bool {
        match origin {
            AssetOrigin::Path(path) => path.is_file(),
            AssetOrigin::Memory(_) => true,
        }
    }

    /// Produces PCM for the origin.
    ///
    /// # Errors
    ///
    /// Returns a `VoiceGateError` if the origin cannot be read or decoded.
    fn load_pcm(&self, origin: &AssetOrigin, options: &LoadOptions) -> Result<PcmData>;
}

/// Default loader: decodes files with Symphonia, passes in-memory PCM through.
///
/// Both kinds of origin honour [`LoadOptions::max_duration`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaLoader;

impl PcmLoader for SymphoniaLoader {
    fn load_pcm(&self, origin: &AssetOrigin, options: &LoadOptions) -> Result<PcmData> {
        let pcm = match origin {
            AssetOrigin::Path(path) => decode_file(path, options)?,
            AssetOrigin::Memory(pcm) => match options.max_duration {
                Some(max) => pcm.truncated(max),
                None => pcm.as_ref().clone(),
            },
        };
        Ok(if options.convert_to_mono {
            pcm.to_mono()
        } else {
            pcm
        })
    }
}

fn decode_file(path: &Path, options: &LoadOptions) -> Result<PcmData> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| VoiceGateError::AudioLoading(format!("Failed to probe audio format: {:?}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| VoiceGateError::AudioLoading("No default audio track found".to_string()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| VoiceGateError::AudioLoading("Sample rate not found".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| VoiceGateError::AudioLoading("Channel count not found".to_string()))?
        .count() as u16;

    let bits_per_sample = track.codec_params.bits_per_sample.unwrap_or(16) as u16;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| VoiceGateError::AudioLoading(format!("Failed to create decoder: {:?}", e)))?;

    let max_frames = options
        .max_duration
        .map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
        .unwrap_or(usize::MAX);

    let mut samples: Vec<f32> = Vec::new();
    let mut frames_decoded = 0;

    while frames_decoded < max_frames {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break, // end-of-file
            Err(e) => {
                return Err(VoiceGateError::AudioLoading(format!(
                    "Error reading packet: {:?}",
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(Error::IoError(_)) => break,
            Err(Error::DecodeError(_)) => continue, // recoverable corruption
            Err(e) => {
                return Err(VoiceGateError::AudioLoading(format!(
                    "Error decoding packet: {:?}",
                    e
                )));
            }
        };

        let spec = *decoded.spec();
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);

        let frames = buffer.samples().len() / channels as usize;
        let take = frames.min(max_frames - frames_decoded);
        samples.extend_from_slice(&buffer.samples()[..take * channels as usize]);
        frames_decoded += take;
    }

    if samples.is_empty() {
        return Err(VoiceGateError::AudioLoading(format!(
            "No audio decoded from {}",
            path.display()
        )));
    }

    PcmData::new(samples, sample_rate, channels, bits_per_sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_memory_origin_passthrough_downmixes() {
        let pcm = PcmData::new(vec![1.0, 0.0, 1.0, 0.0], 8000, 2, 16).unwrap();
        let origin = AssetOrigin::Memory(Arc::new(pcm));
        let loaded = SymphoniaLoader
            .load_pcm(&origin, &LoadOptions::default())
            .unwrap();
        assert_eq!(loaded.channels(), 1);
        assert_eq!(loaded.samples(), &[0.5, 0.5]);
    }

    #[test]
    fn test_memory_origin_honours_max_duration() {
        let pcm = PcmData::new(vec![0.25; 8000], 8000, 1, 16).unwrap();
        let origin = AssetOrigin::Memory(Arc::new(pcm));
        let options = LoadOptions::new().max_duration(Duration::from_millis(250));
        let loaded = SymphoniaLoader.load_pcm(&origin, &options).unwrap();
        assert_eq!(loaded.total_frames(), 2000);
        assert_eq!(loaded.duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_file_is_not_registrable() {
        let origin = AssetOrigin::Path("does/not/exist.wav".into());
        assert!(!SymphoniaLoader.exists(&origin));
        assert!(SymphoniaLoader
            .load_pcm(&origin, &LoadOptions::default())
            .is_err());
    }
}
