//! Audio loading and quantization.
//!
//! This module provides:
//! - WAV file I/O
//! - µ-law companding
//! - [`load_audio`], which turns a 16 kHz WAV file into the `(1, 1, N)`
//!   normalized µ-law tensor the model consumes

mod io;
pub mod mulaw;

pub use io::{load_wav, save_wav, AudioBuffer};

use candle_core::{Device, Tensor};
use std::path::Path;

use crate::error::{NsynthError, Result};

/// Sample rate the model is trained on.
pub const SAMPLE_RATE: u32 = 16000;

/// Load a WAV file and quantize it into model input.
///
/// Fails with [`NsynthError::UnsupportedSampleRate`] unless the file is at
/// exactly [`SAMPLE_RATE`]. The result has shape `(1, 1, N)` and holds
/// `µlaw(x) / 128`.
pub fn load_audio<P: AsRef<Path>>(path: P, device: &Device) -> Result<Tensor> {
    let audio = load_wav(path)?;
    quantize_buffer(&audio, device)
}

/// Quantize an in-memory waveform into model input.
pub fn quantize_buffer(audio: &AudioBuffer, device: &Device) -> Result<Tensor> {
    if audio.sample_rate != SAMPLE_RATE {
        return Err(NsynthError::UnsupportedSampleRate {
            expected: SAMPLE_RATE,
            found: audio.sample_rate,
        });
    }
    let values = mulaw::encode_normalized(&audio.samples);
    let len = values.len();
    Ok(Tensor::from_vec(values, (1, 1, len), device)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_buffer_shape_and_values() {
        let audio = AudioBuffer::new(vec![0.0, 0.3, -0.3, 1.0], SAMPLE_RATE);
        let x = quantize_buffer(&audio, &Device::Cpu).unwrap();
        assert_eq!(x.dims(), &[1, 1, 4]);
        let values: Vec<f32> = x.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![0.0, 100.0 / 128.0, -101.0 / 128.0, 127.0 / 128.0]);
    }

    #[test]
    fn test_quantize_buffer_rejects_other_rates() {
        let audio = AudioBuffer::new(vec![0.0; 8], 24000);
        let err = quantize_buffer(&audio, &Device::Cpu).unwrap_err();
        assert!(matches!(
            err,
            NsynthError::UnsupportedSampleRate {
                expected: 16000,
                found: 24000
            }
        ));
    }

    #[test]
    fn test_quantize_buffer_empty() {
        let audio = AudioBuffer::new(vec![], SAMPLE_RATE);
        let x = quantize_buffer(&audio, &Device::Cpu).unwrap();
        assert_eq!(x.dims(), &[1, 1, 0]);
    }
}
