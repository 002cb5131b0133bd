//! Autoregressive waveform generation
//!
//! This module provides:
//! - [`generate`]: embedding, conditioning and the sample-by-sample loop
//! - Greedy class selection

mod autoregressive;
mod sampling;

pub use autoregressive::{generate, generate_with_progress, Generation};
pub use sampling::{greedy_last_step, greedy_sample};
