//! Dilated 1D convolution
//!
//! A Conv1d whose padding is applied by hand so the output keeps the input
//! length. Causal padding puts all of it on the left, so the output at
//! position t depends only on inputs at positions <= t; centred padding
//! splits it between both sides.

use candle_core::{Module, Tensor};
use candle_nn::{conv1d, Conv1d, Conv1dConfig, VarBuilder};

use crate::error::Result;

/// Where the `dilation * (kernel_size - 1)` padding goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// All padding on the left (decoder)
    Causal,
    /// Split evenly, extra step on the right (encoder)
    Centered,
}

/// Length-preserving dilated convolution.
pub struct DilatedConv1d {
    conv: Conv1d,
    left: usize,
    right: usize,
}

impl DilatedConv1d {
    /// # Arguments
    /// * `in_channels` - Number of input channels
    /// * `out_channels` - Number of output channels
    /// * `kernel_size` - Size of the convolving kernel
    /// * `dilation` - Spacing between kernel elements
    /// * `padding` - Causal or centred
    /// * `vb` - Variable builder for loading weights
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        dilation: usize,
        padding: Padding,
        vb: VarBuilder,
    ) -> Result<Self> {
        let config = Conv1dConfig {
            padding: 0,
            stride: 1,
            dilation,
            groups: 1,
            ..Default::default()
        };
        let conv = conv1d(in_channels, out_channels, kernel_size, config, vb)?;

        let total = dilation * (kernel_size - 1);
        let (left, right) = match padding {
            Padding::Causal => (total, 0),
            Padding::Centered => (total / 2, total - total / 2),
        };

        Ok(Self { conv, left, right })
    }

    /// Input shape: [batch, in_channels, seq_len]
    /// Output shape: [batch, out_channels, seq_len]
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = if self.left + self.right > 0 {
            x.pad_with_zeros(2, self.left, self.right)?
        } else {
            x.clone()
        };
        Ok(self.conv.forward(&x)?)
    }
}
