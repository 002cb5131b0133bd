//! Temporal encoder
//!
//! Non-causal residual stack of dilated convolutions followed by a 1x1
//! bottleneck and average pooling by `hop_length`, turning a waveform of `N`
//! samples into `ceil(N / hop_length)` embedding frames.

use candle_core::Tensor;
use candle_nn::{conv1d, Conv1d, Conv1dConfig, Module, VarBuilder};

use super::config::WavenetConfig;
use super::conv::{DilatedConv1d, Padding};
use super::Encoder;
use crate::error::Result;

struct ResidualLayer {
    dilated: DilatedConv1d,
    residual: Conv1d,
}

impl ResidualLayer {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.dilated.forward(&x.relu()?)?;
        let h = self.residual.forward(&h.relu()?)?;
        Ok((x + h)?)
    }
}

/// Encoder half of the NSynth autoencoder.
pub struct TemporalEncoder {
    input: DilatedConv1d,
    layers: Vec<ResidualLayer>,
    bottleneck: Conv1d,
    hop_length: usize,
}

impl TemporalEncoder {
    /// Weights are read under `input`, `layers.{i}.dilated`,
    /// `layers.{i}.residual` and `bottleneck`.
    pub fn new(config: &WavenetConfig, vb: VarBuilder) -> Result<Self> {
        let width = config.encoder_width;
        let input = DilatedConv1d::new(
            1,
            width,
            config.kernel_size,
            1,
            Padding::Centered,
            vb.pp("input"),
        )?;

        let layers = config
            .encoder_dilations()
            .into_iter()
            .enumerate()
            .map(|(i, dilation)| -> Result<ResidualLayer> {
                let lvb = vb.pp(format!("layers.{i}"));
                Ok(ResidualLayer {
                    dilated: DilatedConv1d::new(
                        width,
                        width,
                        config.kernel_size,
                        dilation,
                        Padding::Centered,
                        lvb.pp("dilated"),
                    )?,
                    residual: conv1d(
                        width,
                        width,
                        1,
                        Conv1dConfig::default(),
                        lvb.pp("residual"),
                    )?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let bottleneck = conv1d(
            width,
            config.bottleneck_dims,
            1,
            Conv1dConfig::default(),
            vb.pp("bottleneck"),
        )?;

        Ok(Self {
            input,
            layers,
            bottleneck,
            hop_length: config.hop_length,
        })
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }
}

impl Encoder for TemporalEncoder {
    /// `(1, 1, N)` to `(1, bottleneck_dims, ceil(N / hop_length))`.
    fn encode(&self, x: &Tensor) -> Result<Tensor> {
        let steps = x.dim(2)?;
        let padded_len = steps.div_ceil(self.hop_length) * self.hop_length;
        let x = if padded_len > steps {
            x.pad_with_zeros(2, 0, padded_len - steps)?
        } else {
            x.clone()
        };

        let mut h = self.input.forward(&x)?;
        for layer in &self.layers {
            h = layer.forward(&h)?;
        }
        let h = self.bottleneck.forward(&h)?;

        Ok(h
            .unsqueeze(2)?
            .avg_pool2d((1, self.hop_length))?
            .squeeze(2)?)
    }
}
