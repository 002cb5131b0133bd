//! Class selection for autoregressive generation
//!
//! Decoding is greedy: the highest-scoring class wins, so a fixed model and
//! seed always produce the same output.

use candle_core::{Tensor, D};

use crate::error::{NsynthError, Result};

/// Greedy sampling (argmax)
///
/// # Arguments
/// * `logits` - Scores of shape `[batch, classes]`
///
/// # Returns
/// Class indices of shape `[batch]` (U32)
pub fn greedy_sample(logits: &Tensor) -> Result<Tensor> {
    Ok(logits.argmax(D::Minus1)?)
}

/// Greedy class for the last time step of `(1, classes, T)` decoder scores.
pub fn greedy_last_step(scores: &Tensor) -> Result<u32> {
    let steps = scores.dim(D::Minus1)?;
    if steps == 0 {
        return Err(NsynthError::InvalidShape {
            expected: "decoder scores with at least one time step",
            found: scores.dims().to_vec(),
        });
    }
    let last = scores.narrow(2, steps - 1, 1)?.squeeze(2)?;
    let classes: Vec<u32> = greedy_sample(&last)?.to_vec1()?;
    Ok(classes[0])
}
