//! WAV I/O and the in-memory waveform type.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use super::mulaw;
use crate::error::{NsynthError, Result};

/// Mono waveform with its native sample rate.
///
/// Samples are 32-bit floats in \[-1.0, 1.0\].
///
/// # Example
///
/// ```rust,ignore
/// let audio = AudioBuffer::load("seed.wav")?;
/// println!("Duration: {:.2}s", audio.duration());
///
/// // Back from the generator's normalized µ-law values
/// let audio = AudioBuffer::from_quantized(&generated, 16000);
/// audio.save("generated.wav")?;
/// ```
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono audio samples in \[-1.0, 1.0\] range
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a waveform from normalized µ-law values (`code / 128`), the
    /// representation the generator produces.
    pub fn from_quantized(values: &[f32], sample_rate: u32) -> Self {
        Self::new(mulaw::decode_normalized(values), sample_rate)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Keep at most the first `max_samples` samples.
    pub fn truncate(&mut self, max_samples: usize) {
        self.samples.truncate(max_samples);
    }

    /// Save as 16-bit PCM WAV
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_wav(path, &self.samples, self.sample_rate)
    }

    /// Load from WAV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_wav(path)
    }
}

/// Load a WAV file, mixing multi-channel audio down to mono.
///
/// The native sample rate is kept; nothing is resampled.
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let reader = WavReader::open(path).map_err(|source| NsynthError::WavOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let mono_samples = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        samples = mono_samples.len(),
        "loaded wav"
    );

    Ok(AudioBuffer::new(mono_samples, spec.sample_rate))
}

/// Save samples as a mono 16-bit PCM WAV file.
pub fn save_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize()?;
    Ok(())
}
