//! # nsynth
//!
//! Sample-by-sample audio generation with a WaveNet autoencoder
//! ([NSynth](https://magenta.tensorflow.org/nsynth)), on top of candle.
//!
//! ## Features
//!
//! - **CPU inference**, with **CUDA** and **Metal** behind feature flags
//! - **Model-agnostic generator**: anything implementing [`AutoEncoder`] can
//!   be driven by [`generate`]
//! - **Deterministic**: greedy decoding, no sampling state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nsynth::{generate, load_audio, load_pretrained, parse_device, AudioBuffer};
//!
//! let device = parse_device("auto")?;
//! let model = load_pretrained("path/to/model", &device)?;
//!
//! // 16 kHz mono seed, µ-law encoded and scaled to [-1, 1)
//! let x = load_audio("seed.wav", &device)?;
//! let generation = generate(&model, &x)?;
//!
//! let samples: Vec<f32> = generation.samples.to_vec1()?;
//! AudioBuffer::from_quantized(&samples, 16000).save("generated.wav")?;
//! ```
//!
//! ## Pipeline
//!
//! 1. **Audio loader**: WAV at exactly 16 kHz, mixed to mono, µ-law encoded
//!    and divided by 128 into a `(1, 1, N)` tensor.
//!
//! 2. **Encoder**: the whole seed is encoded once into an embedding of
//!    `ceil(N / hop_length)` frames.
//!
//! 3. **Conditioning**: every decoder layer's projector (and the final one)
//!    is applied to the embedding and upsampled by nearest neighbour to
//!    sample resolution, once, before generation starts.
//!
//! 4. **Generation**: the first `receptive_field` samples of the seed are
//!    kept; every following sample is the decoder's argmax over 256 µ-law
//!    classes given the previous `receptive_field` generated samples and the
//!    conditioning slice aligned with them.
//!
//! ## Checkpoints
//!
//! Weights are safetensors files with tensors named `encoder.*` and
//! `decoder.*`; see [`models::WavenetAutoEncoder`]. Restoring a checkpoint
//! to resume training is not supported.

pub mod audio;
pub mod checkpoint;
pub mod error;
pub mod generation;
pub mod models;

use candle_core::Device;
use std::path::Path;

pub use audio::{load_audio, quantize_buffer, AudioBuffer, SAMPLE_RATE};
pub use checkpoint::{load_model, FromVarBuilder};
pub use error::{NsynthError, Result};
pub use generation::{generate, generate_with_progress, Generation};
pub use models::{AutoEncoder, Decoder, Encoder, WavenetAutoEncoder, WavenetConfig};

/// Checkpoint file name inside a model directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Architecture file name inside a model directory.
pub const CONFIG_FILE: &str = "config.json";

/// Load a WaveNet autoencoder for inference from a model directory.
///
/// The directory holds [`WEIGHTS_FILE`] and, optionally, [`CONFIG_FILE`];
/// without a config the published NSynth hyperparameters are assumed.
pub fn load_pretrained<P: AsRef<Path>>(
    model_dir: P,
    device: &Device,
) -> Result<WavenetAutoEncoder> {
    let model_dir = model_dir.as_ref();
    let config_path = model_dir.join(CONFIG_FILE);
    let config = if config_path.exists() {
        WavenetConfig::from_file(&config_path)?
    } else {
        tracing::warn!(
            "{} not found in {}, using default architecture",
            CONFIG_FILE,
            model_dir.display()
        );
        WavenetConfig::default()
    };
    load_model(model_dir.join(WEIGHTS_FILE), device, &config, false)
}

/// Select the best available device.
///
/// Priority: CUDA → Metal → CPU. CUDA and Metal are only considered when
/// the crate is built with the matching feature.
pub fn auto_device() -> Result<Device> {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::cuda_if_available(0) {
            if device.is_cuda() {
                tracing::info!("Using CUDA device");
                return Ok(device);
            }
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            tracing::info!("Using Metal device");
            return Ok(device);
        }
    }

    tracing::info!("Using CPU device");
    Ok(Device::Cpu)
}

/// Parse a device selector into a [`Device`].
///
/// Supported formats: `"auto"`, `"cpu"`, `"cuda"`, `"cuda:N"`, `"metal"`.
///
/// Requesting a backend that was not compiled in (see the `cuda` and `metal`
/// features) fails with [`NsynthError::UnsupportedDevice`].
pub fn parse_device(device_str: &str) -> Result<Device> {
    let unsupported = NsynthError::UnsupportedDevice;
    match device_str.to_lowercase().as_str() {
        "auto" => auto_device(),
        "cpu" => Ok(Device::Cpu),
        s if s.starts_with("cuda") => {
            let ordinal: usize = match s.strip_prefix("cuda:") {
                Some(idx) => idx
                    .parse()
                    .map_err(|e| unsupported(format!("invalid CUDA device index: {e}")))?,
                None if s == "cuda" => 0,
                None => return Err(unsupported(format!("unknown device '{s}'"))),
            };
            Device::new_cuda(ordinal).map_err(|e| {
                unsupported(format!("failed to init CUDA device {ordinal}: {e}"))
            })
        }
        "metal" => Device::new_metal(0)
            .map_err(|e| unsupported(format!("failed to init Metal device: {e}"))),
        other => Err(unsupported(format!(
            "unknown device '{other}'. Supported: auto, cpu, cuda, cuda:N, metal"
        ))),
    }
}

/// Human-readable label for a [`Device`].
pub fn device_info(device: &Device) -> String {
    match device {
        Device::Cpu => "CPU".to_string(),
        Device::Cuda(_) => "CUDA".to_string(),
        Device::Metal(_) => "Metal".to_string(),
    }
}
