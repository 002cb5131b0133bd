//! Architecture configuration for the WaveNet autoencoder

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{NsynthError, Result};

/// Hyperparameters shared by the temporal encoder and the WaveNet decoder.
///
/// Every field has a default matching the published NSynth model, so a
/// `config.json` only needs to list what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavenetConfig {
    /// Channel width of the encoder's residual stack
    #[serde(default = "default_encoder_width")]
    pub encoder_width: usize,

    /// Dilated layers per encoder block (dilation doubles per layer)
    #[serde(default = "default_layers")]
    pub encoder_layers: usize,

    /// Number of encoder blocks
    #[serde(default = "default_blocks")]
    pub encoder_blocks: usize,

    /// Kernel size of every dilated convolution
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,

    /// Embedding channels
    #[serde(default = "default_bottleneck_dims")]
    pub bottleneck_dims: usize,

    /// Samples per embedding frame; also the decoder's upsample factor
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,

    /// Residual channel width of the decoder
    #[serde(default = "default_decoder_width")]
    pub decoder_width: usize,

    /// Skip-connection width of the decoder
    #[serde(default = "default_skip_width")]
    pub skip_width: usize,

    /// Dilated layers per decoder block
    #[serde(default = "default_layers")]
    pub decoder_layers: usize,

    /// Number of decoder blocks
    #[serde(default = "default_blocks")]
    pub decoder_blocks: usize,

    /// Output classes (256 for 8-bit µ-law)
    #[serde(default = "default_quantization_channels")]
    pub quantization_channels: usize,
}

fn default_encoder_width() -> usize {
    128
}
fn default_layers() -> usize {
    10
}
fn default_blocks() -> usize {
    3
}
fn default_kernel_size() -> usize {
    3
}
fn default_bottleneck_dims() -> usize {
    16
}
fn default_hop_length() -> usize {
    512
}
fn default_decoder_width() -> usize {
    512
}
fn default_skip_width() -> usize {
    256
}
fn default_quantization_channels() -> usize {
    256
}

impl Default for WavenetConfig {
    fn default() -> Self {
        Self {
            encoder_width: default_encoder_width(),
            encoder_layers: default_layers(),
            encoder_blocks: default_blocks(),
            kernel_size: default_kernel_size(),
            bottleneck_dims: default_bottleneck_dims(),
            hop_length: default_hop_length(),
            decoder_width: default_decoder_width(),
            skip_width: default_skip_width(),
            decoder_layers: default_layers(),
            decoder_blocks: default_blocks(),
            quantization_channels: default_quantization_channels(),
        }
    }
}

impl WavenetConfig {
    /// Load from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject hyperparameters that would produce empty layers, a zero-width
    /// kernel or a zero upsampling factor.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("encoder_width", self.encoder_width),
            ("encoder_layers", self.encoder_layers),
            ("encoder_blocks", self.encoder_blocks),
            ("kernel_size", self.kernel_size),
            ("bottleneck_dims", self.bottleneck_dims),
            ("hop_length", self.hop_length),
            ("decoder_width", self.decoder_width),
            ("skip_width", self.skip_width),
            ("decoder_layers", self.decoder_layers),
            ("decoder_blocks", self.decoder_blocks),
            ("quantization_channels", self.quantization_channels),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(NsynthError::InvalidConfig(format!("{name} must be at least 1")));
        }
        // Dilation 2^(layers - 1) has to fit in a usize shift.
        for (name, layers) in [
            ("encoder_layers", self.encoder_layers),
            ("decoder_layers", self.decoder_layers),
        ] {
            if layers >= usize::BITS as usize {
                return Err(NsynthError::InvalidConfig(format!(
                    "{name} = {layers} overflows the dilation schedule"
                )));
            }
        }
        Ok(())
    }

    /// Dilation of every decoder layer, in order.
    pub fn decoder_dilations(&self) -> Vec<usize> {
        dilations(self.decoder_layers, self.decoder_blocks)
    }

    /// Dilation of every encoder layer, in order.
    pub fn encoder_dilations(&self) -> Vec<usize> {
        dilations(self.encoder_layers, self.encoder_blocks)
    }

    /// Trailing samples the causal decoder stack can see, including the
    /// current one.
    pub fn receptive_field(&self) -> usize {
        1 + self
            .decoder_dilations()
            .iter()
            .map(|d| d * (self.kernel_size - 1))
            .sum::<usize>()
    }
}

fn dilations(layers: usize, blocks: usize) -> Vec<usize> {
    (0..blocks)
        .flat_map(|_| (0..layers).map(|i| 1usize << i))
        .collect()
}
