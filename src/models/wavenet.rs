//! NSynth WaveNet autoencoder

use candle_core::Tensor;
use candle_nn::VarBuilder;

use super::config::WavenetConfig;
use super::decoder::WavenetDecoder;
use super::encoder::TemporalEncoder;
use super::{build_conditionals, AutoEncoder, Decoder};
use crate::checkpoint::FromVarBuilder;
use crate::error::{NsynthError, Result};

/// Temporal encoder and WaveNet decoder, with weights under `encoder.*` and
/// `decoder.*`.
pub struct WavenetAutoEncoder {
    encoder: TemporalEncoder,
    decoder: WavenetDecoder,
    config: WavenetConfig,
}

impl WavenetAutoEncoder {
    pub fn new(config: &WavenetConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let encoder = TemporalEncoder::new(config, vb.pp("encoder"))?;
        let decoder = WavenetDecoder::new(config, vb.pp("decoder"))?;
        tracing::debug!(
            receptive_field = decoder.receptive_field(),
            layers = decoder.num_layers(),
            hop_length = config.hop_length,
            "built wavenet autoencoder"
        );
        Ok(Self {
            encoder,
            decoder,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &WavenetConfig {
        &self.config
    }

    /// Score every step of `x` in one parallel pass, conditioned on
    /// `embedding`.
    ///
    /// Input step `t` is paired with conditioning step `t + 1`, the
    /// alignment the generator uses, so step `t` of the result scores
    /// sample `t + 1`. The upsampled embedding must therefore be longer than
    /// `x`.
    pub fn forward_with_embedding(&self, x: &Tensor, embedding: &Tensor) -> Result<Tensor> {
        let steps = x.dim(2)?;
        let conditionals = build_conditionals(&self.decoder, embedding)?;
        let mut aligned = Vec::with_capacity(conditionals.len());
        for (index, conditional) in conditionals.iter().enumerate() {
            let available = conditional.dim(2)?;
            if available < steps + 1 {
                return Err(NsynthError::ConditioningTooShort {
                    index,
                    available,
                    required: steps + 1,
                });
            }
            aligned.push(conditional.narrow(2, 1, steps)?);
        }
        self.decoder.forward(x, &aligned)
    }
}

impl AutoEncoder for WavenetAutoEncoder {
    type Encoder = TemporalEncoder;
    type Decoder = WavenetDecoder;

    fn encoder(&self) -> &TemporalEncoder {
        &self.encoder
    }

    fn decoder(&self) -> &WavenetDecoder {
        &self.decoder
    }
}

impl FromVarBuilder for WavenetAutoEncoder {
    type Config = WavenetConfig;

    fn from_var_builder(config: &WavenetConfig, vb: VarBuilder) -> Result<Self> {
        Self::new(config, vb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Encoder;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn tiny_config() -> WavenetConfig {
        WavenetConfig {
            encoder_width: 4,
            encoder_layers: 2,
            encoder_blocks: 1,
            kernel_size: 3,
            bottleneck_dims: 2,
            hop_length: 4,
            decoder_width: 4,
            skip_width: 4,
            decoder_layers: 2,
            decoder_blocks: 1,
            quantization_channels: 256,
        }
    }

    #[test]
    fn test_weight_prefixes() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let _model = WavenetAutoEncoder::new(&tiny_config(), vb).unwrap();
        let data = varmap.data().lock().unwrap();
        assert!(data.contains_key("encoder.bottleneck.weight"));
        assert!(data.contains_key("decoder.layers.0.cond.weight"));
        assert!(data.contains_key("decoder.final_cond.bias"));
        assert!(data.contains_key("decoder.final_quant.weight"));
    }

    #[test]
    fn test_forward_with_embedding_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = WavenetAutoEncoder::new(&tiny_config(), vb).unwrap();
        let x = Tensor::randn(0f32, 0.5, (1, 1, 10), &device).unwrap();
        let embedding = model.encoder().encode(&x).unwrap();
        // 3 frames * hop 4 = 12 conditioning steps
        let scores = model
            .forward_with_embedding(&x.narrow(2, 0, 9).unwrap(), &embedding)
            .unwrap();
        assert_eq!(scores.dims(), &[1, 256, 9]);
    }

    #[test]
    fn test_forward_with_embedding_needs_one_extra_step() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = WavenetAutoEncoder::new(&tiny_config(), vb).unwrap();
        let x = Tensor::zeros((1, 1, 8), DType::F32, &device).unwrap();
        let embedding = model.encoder().encode(&x).unwrap();
        let err = model.forward_with_embedding(&x, &embedding).unwrap_err();
        assert!(matches!(
            err,
            NsynthError::ConditioningTooShort {
                available: 8,
                required: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_hop_length_rejected_before_building() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = WavenetConfig {
            hop_length: 0,
            ..tiny_config()
        };
        let result = WavenetAutoEncoder::new(&config, vb);
        assert!(matches!(result, Err(NsynthError::InvalidConfig(_))));
        assert!(varmap.all_vars().is_empty());
    }

    #[test]
    fn test_trait_accessors() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = WavenetAutoEncoder::new(&tiny_config(), vb).unwrap();
        assert_eq!(model.decoder().receptive_field(), 7);
        assert_eq!(model.decoder().scale_factor(), 4);
        assert_eq!(model.config().hop_length, 4);
    }
}
