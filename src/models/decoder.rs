//! WaveNet decoder
//!
//! Causal stack of dilated, gated convolutions. Every layer adds its own
//! conditioning sequence before the gate; skip outputs are summed, then
//! conditioned once more and projected onto the quantization classes.

use candle_core::Tensor;
use candle_nn::{conv1d, Conv1d, Conv1dConfig, Module, VarBuilder};

use super::config::WavenetConfig;
use super::conv::{DilatedConv1d, Padding};
use super::Decoder;
use crate::error::{NsynthError, Result};

struct GatedLayer {
    dilated: DilatedConv1d,
    cond: Conv1d,
    residual: Conv1d,
    skip: Conv1d,
}

impl GatedLayer {
    /// Returns the updated residual stream and this layer's skip output.
    fn forward(
        &self,
        x: &Tensor,
        conditional: &Tensor,
        width: usize,
    ) -> Result<(Tensor, Tensor)> {
        let h = self.dilated.forward(x)?.broadcast_add(conditional)?;
        let filter = h.narrow(1, 0, width)?.tanh()?;
        let gate = candle_nn::ops::sigmoid(&h.narrow(1, width, width)?)?;
        let gated = (filter * gate)?;
        let residual = (x + self.residual.forward(&gated)?)?;
        let skip = self.skip.forward(&gated)?;
        Ok((residual, skip))
    }
}

/// Decoder half of the NSynth autoencoder.
pub struct WavenetDecoder {
    initial: Conv1d,
    initial_skip: Conv1d,
    layers: Vec<GatedLayer>,
    final_skip: Conv1d,
    final_cond: Conv1d,
    final_quant: Conv1d,
    width: usize,
    receptive_field: usize,
    scale_factor: usize,
}

impl WavenetDecoder {
    /// Weights are read under `initial`, `initial_skip`,
    /// `layers.{i}.{dilated,cond,residual,skip}`, `final_skip`, `final_cond`
    /// and `final_quant`.
    pub fn new(config: &WavenetConfig, vb: VarBuilder) -> Result<Self> {
        let width = config.decoder_width;
        let skip_width = config.skip_width;
        let pointwise = Conv1dConfig::default();

        let initial = conv1d(1, width, 1, pointwise, vb.pp("initial"))?;
        let initial_skip = conv1d(width, skip_width, 1, pointwise, vb.pp("initial_skip"))?;

        let layers = config
            .decoder_dilations()
            .into_iter()
            .enumerate()
            .map(|(i, dilation)| -> Result<GatedLayer> {
                let lvb = vb.pp(format!("layers.{i}"));
                Ok(GatedLayer {
                    dilated: DilatedConv1d::new(
                        width,
                        2 * width,
                        config.kernel_size,
                        dilation,
                        Padding::Causal,
                        lvb.pp("dilated"),
                    )?,
                    cond: conv1d(config.bottleneck_dims, 2 * width, 1, pointwise, lvb.pp("cond"))?,
                    residual: conv1d(width, width, 1, pointwise, lvb.pp("residual"))?,
                    skip: conv1d(width, skip_width, 1, pointwise, lvb.pp("skip"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let final_skip = conv1d(skip_width, skip_width, 1, pointwise, vb.pp("final_skip"))?;
        let final_cond = conv1d(
            config.bottleneck_dims,
            skip_width,
            1,
            pointwise,
            vb.pp("final_cond"),
        )?;
        let final_quant = conv1d(
            skip_width,
            config.quantization_channels,
            1,
            pointwise,
            vb.pp("final_quant"),
        )?;

        Ok(Self {
            initial,
            initial_skip,
            layers,
            final_skip,
            final_cond,
            final_quant,
            width,
            receptive_field: config.receptive_field(),
            scale_factor: config.hop_length,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl Decoder for WavenetDecoder {
    fn receptive_field(&self) -> usize {
        self.receptive_field
    }

    fn scale_factor(&self) -> usize {
        self.scale_factor
    }

    fn conds(&self) -> Vec<&dyn Module> {
        self.layers.iter().map(|l| &l.cond as &dyn Module).collect()
    }

    fn final_cond(&self) -> &dyn Module {
        &self.final_cond
    }

    fn forward(&self, x: &Tensor, conditionals: &[Tensor]) -> Result<Tensor> {
        if conditionals.len() != self.layers.len() + 1 {
            return Err(NsynthError::ConditioningMismatch {
                expected: self.layers.len() + 1,
                found: conditionals.len(),
            });
        }

        let mut h = self.initial.forward(x)?;
        let mut skip = self.initial_skip.forward(&h)?;
        for (layer, conditional) in self.layers.iter().zip(conditionals) {
            let (residual, layer_skip) = layer.forward(&h, conditional, self.width)?;
            h = residual;
            skip = (skip + layer_skip)?;
        }

        let final_conditional = &conditionals[self.layers.len()];
        let skip = self
            .final_skip
            .forward(&skip.relu()?)?
            .broadcast_add(final_conditional)?;
        Ok(self.final_quant.forward(&skip.relu()?)?)
    }
}
