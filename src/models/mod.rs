//! Model contract and the WaveNet autoencoder.
//!
//! The generator only talks to a model through the traits defined here:
//! - [`Encoder`]: waveform to latent embedding
//! - [`Decoder`]: receptive field, upsample factor, conditioning projectors
//!   and the autoregressive forward pass
//! - [`AutoEncoder`]: pairs the two
//!
//! The concrete NSynth architecture lives in:
//! - `config`: architecture hyperparameters
//! - `conv`: dilated 1D convolution (causal or centred)
//! - `encoder`: temporal encoder
//! - `decoder`: WaveNet decoder
//! - `wavenet`: the assembled autoencoder

pub mod config;
pub mod conv;
pub mod decoder;
pub mod encoder;
pub mod wavenet;

pub use config::WavenetConfig;
pub use decoder::WavenetDecoder;
pub use encoder::TemporalEncoder;
pub use wavenet::WavenetAutoEncoder;

use candle_core::{Module, Tensor};

use crate::error::Result;

/// Maps a quantized waveform `(1, 1, N)` to a latent embedding `(1, C, E)`.
pub trait Encoder {
    fn encode(&self, x: &Tensor) -> Result<Tensor>;
}

/// Autoregressive decoder conditioned on an upsampled embedding.
pub trait Decoder {
    /// Number of trailing samples needed to predict the next one.
    fn receptive_field(&self) -> usize;

    /// Time upsampling factor from embedding frames to samples.
    fn scale_factor(&self) -> usize;

    /// Per-layer conditioning projectors, in layer order.
    fn conds(&self) -> Vec<&dyn Module>;

    /// Projector feeding the output stack.
    fn final_cond(&self) -> &dyn Module;

    /// Score every quantization class at every step of `x`.
    ///
    /// `x` is `(1, 1, T)`; `conditionals` holds one `(1, C_l, T)` slice per
    /// projector with the final one last. Returns `(1, classes, T)`.
    fn forward(&self, x: &Tensor, conditionals: &[Tensor]) -> Result<Tensor>;
}

/// Encoder/decoder pair consumed by [`crate::generation::generate`].
pub trait AutoEncoder {
    type Encoder: Encoder;
    type Decoder: Decoder;

    fn encoder(&self) -> &Self::Encoder;

    fn decoder(&self) -> &Self::Decoder;

    /// Run the decoder on a window with time-aligned conditioning.
    fn forward(&self, window: &Tensor, conditionals: &[Tensor]) -> Result<Tensor> {
        self.decoder().forward(window, conditionals)
    }
}

/// Nearest-neighbour upsampling along the last axis of a `(B, C, T)` tensor.
///
/// Each step is repeated `scale` times, giving `(B, C, T * scale)`.
pub fn upsample_nearest(x: &Tensor, scale: usize) -> Result<Tensor> {
    let (batch, channels, steps) = x.dims3()?;
    Ok(x.unsqueeze(3)?
        .broadcast_as((batch, channels, steps, scale))?
        .contiguous()?
        .reshape((batch, channels, steps * scale))?)
}

/// Project the embedding through every conditioning projector and upsample
/// each result to sample resolution.
///
/// The output follows [`Decoder::conds`] order with the
/// [`Decoder::final_cond`] sequence appended last.
pub fn build_conditionals<D: Decoder + ?Sized>(
    decoder: &D,
    embedding: &Tensor,
) -> Result<Vec<Tensor>> {
    let scale = decoder.scale_factor();
    let conds = decoder.conds();
    let mut conditionals = Vec::with_capacity(conds.len() + 1);
    for cond in conds {
        conditionals.push(upsample_nearest(&cond.forward(embedding)?, scale)?);
    }
    conditionals.push(upsample_nearest(
        &decoder.final_cond().forward(embedding)?,
        scale,
    )?);
    Ok(conditionals)
}
