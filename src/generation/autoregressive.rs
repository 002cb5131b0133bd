//! Sample-by-sample waveform generation conditioned on an embedding.

use candle_core::{Tensor, D};
use indicatif::ProgressBar;

use super::sampling::greedy_last_step;
use crate::audio::mulaw::dequantize_class;
use crate::error::{NsynthError, Result};
use crate::models::{build_conditionals, AutoEncoder, Decoder, Encoder};

/// Output of [`generate`].
#[derive(Debug, Clone)]
pub struct Generation {
    /// Seed followed by every generated value, shape `(L,)`, normalized µ-law.
    pub samples: Tensor,
    /// Embedding of the seed, as produced by the encoder.
    pub embedding: Tensor,
}

/// Re-synthesize `x` sample by sample from its own embedding.
///
/// `x` is the `(1, 1, L)` quantized signal from
/// [`crate::audio::load_audio`]. The first `R = receptive_field` samples are
/// copied as seed context; each of the remaining `L - R` samples is the
/// greedy prediction from the previous `R` generated samples and the
/// conditioning slice aligned with them.
pub fn generate<M: AutoEncoder>(model: &M, x: &Tensor) -> Result<Generation> {
    generate_with_progress(model, x, &ProgressBar::hidden())
}

/// [`generate`], advancing `progress` once per generated sample.
pub fn generate_with_progress<M: AutoEncoder>(
    model: &M,
    x: &Tensor,
    progress: &ProgressBar,
) -> Result<Generation> {
    let device = x.device();
    let (batch, channels, length) = x.dims3()?;
    if batch != 1 || channels != 1 {
        return Err(NsynthError::InvalidShape {
            expected: "a (1, 1, N) seed",
            found: x.dims().to_vec(),
        });
    }
    let decoder = model.decoder();
    let receptive_field = decoder.receptive_field();
    if length < receptive_field {
        return Err(NsynthError::InputTooShort {
            length,
            receptive_field,
        });
    }

    let embedding = model.encoder().encode(x)?;
    let conditionals = build_conditionals(decoder, &embedding)?;
    for (index, conditional) in conditionals.iter().enumerate() {
        let available = conditional.dim(D::Minus1)?;
        if available < length {
            return Err(NsynthError::ConditioningTooShort {
                index,
                available,
                required: length,
            });
        }
    }

    let input: Vec<f32> = x.flatten_all()?.to_vec1()?;
    let mut generation = Vec::with_capacity(length);
    generation.extend_from_slice(&input[..receptive_field]);
    let remaining = length - receptive_field;

    let _span = tracing::info_span!("generate", length, receptive_field).entered();
    tracing::info!(remaining, conditionals = conditionals.len(), "starting generation");
    progress.set_length(remaining as u64);

    for _ in 0..remaining {
        let window = Tensor::from_slice(
            &generation[generation.len() - receptive_field..],
            (1, 1, receptive_field),
            device,
        )?;
        // Position of the sample about to be produced, one-based.
        let g = generation.len() + 1;
        let aligned = conditionals
            .iter()
            .map(|c| c.narrow(2, g - receptive_field, receptive_field))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let scores = model.forward(&window, &aligned)?;
        let class = greedy_last_step(&scores)?;
        generation.push(dequantize_class(class));
        progress.inc(1);
    }
    progress.finish();
    tracing::info!(samples = generation.len(), "generation complete");

    let samples = Tensor::from_vec(generation, length, device)?;
    Ok(Generation { samples, embedding })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, Module};
    use std::cell::{Cell, RefCell};

    struct Identity;

    impl Module for Identity {
        fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
            Ok(xs.clone())
        }
    }

    /// Embedding is the frame index `0..frames`, so upsampled conditioning
    /// values reveal which positions a slice covers.
    struct RampEncoder {
        frames: usize,
    }

    impl Encoder for RampEncoder {
        fn encode(&self, x: &Tensor) -> Result<Tensor> {
            let ramp = Tensor::arange(0u32, self.frames as u32, x.device())?.to_dtype(DType::F32)?;
            Ok(ramp.reshape((1, 1, self.frames))?)
        }
    }

    /// Always predicts `class`; records every window and conditioning slice.
    struct FixedDecoder {
        receptive_field: usize,
        scale_factor: usize,
        class: usize,
        conds: Vec<Identity>,
        final_cond: Identity,
        calls: Cell<usize>,
        windows: RefCell<Vec<Vec<f32>>>,
        slices: RefCell<Vec<Vec<f32>>>,
    }

    impl Decoder for FixedDecoder {
        fn receptive_field(&self) -> usize {
            self.receptive_field
        }

        fn scale_factor(&self) -> usize {
            self.scale_factor
        }

        fn conds(&self) -> Vec<&dyn Module> {
            self.conds.iter().map(|c| c as &dyn Module).collect()
        }

        fn final_cond(&self) -> &dyn Module {
            &self.final_cond
        }

        fn forward(&self, x: &Tensor, conditionals: &[Tensor]) -> Result<Tensor> {
            self.calls.set(self.calls.get() + 1);
            self.windows
                .borrow_mut()
                .push(x.flatten_all()?.to_vec1()?);
            for c in conditionals {
                assert_eq!(c.dims(), &[1, 1, self.receptive_field]);
            }
            self.slices
                .borrow_mut()
                .push(conditionals[0].flatten_all()?.to_vec1()?);

            let steps = x.dim(2)?;
            let mut scores = vec![0f32; 256 * steps];
            for t in 0..steps {
                scores[self.class * steps + t] = 1.0;
            }
            Ok(Tensor::from_vec(scores, (1, 256, steps), x.device())?)
        }
    }

    struct MockModel {
        encoder: RampEncoder,
        decoder: FixedDecoder,
    }

    impl AutoEncoder for MockModel {
        type Encoder = RampEncoder;
        type Decoder = FixedDecoder;

        fn encoder(&self) -> &RampEncoder {
            &self.encoder
        }

        fn decoder(&self) -> &FixedDecoder {
            &self.decoder
        }
    }

    fn mock(receptive_field: usize, frames: usize, scale_factor: usize, class: usize) -> MockModel {
        MockModel {
            encoder: RampEncoder { frames },
            decoder: FixedDecoder {
                receptive_field,
                scale_factor,
                class,
                conds: vec![Identity, Identity],
                final_cond: Identity,
                calls: Cell::new(0),
                windows: RefCell::new(Vec::new()),
                slices: RefCell::new(Vec::new()),
            },
        }
    }

    fn seed(values: &[f32]) -> Tensor {
        Tensor::from_slice(values, (1, 1, values.len()), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_fixed_class_scenario() {
        let model = mock(4, 3, 2, 200);
        let x = seed(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        let generation = generate(&model, &x).unwrap();

        let samples: Vec<f32> = generation.samples.to_vec1().unwrap();
        assert_eq!(samples, vec![10.0, 20.0, 30.0, 40.0, 0.5625, 0.5625]);
        assert_eq!(generation.embedding.dims(), &[1, 1, 3]);
    }

    #[test]
    fn test_one_decode_per_generated_sample() {
        let model = mock(4, 5, 2, 128);
        let x = seed(&[0.0; 10]);
        let generation = generate(&model, &x).unwrap();
        assert_eq!(model.decoder.calls.get(), 6);
        assert_eq!(generation.samples.dims(), &[10]);
    }

    #[test]
    fn test_windows_trail_the_generation_buffer() {
        let model = mock(3, 6, 1, 192);
        let x = seed(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        generate(&model, &x).unwrap();

        let windows = model.decoder.windows.borrow();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(windows[1], vec![0.2, 0.3, 0.5]);
        assert_eq!(windows[2], vec![0.3, 0.5, 0.5]);
    }

    #[test]
    fn test_conditioning_slices_align_with_window() {
        // Scale 1 and a ramp embedding make conditioning value == position.
        let model = mock(4, 6, 1, 128);
        let x = seed(&[0.0; 6]);
        generate(&model, &x).unwrap();

        let slices = model.decoder.slices.borrow();
        // g = 5 then g = 6: slices [1, 5) and [2, 6)
        assert_eq!(slices[0], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(slices[1], vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_conditioning_exactly_covers_input() {
        // U * E == L: the final slice ends exactly at L.
        let model = mock(2, 4, 2, 128);
        let x = seed(&[0.0; 8]);
        let generation = generate(&model, &x).unwrap();
        assert_eq!(generation.samples.dims(), &[8]);
        assert_eq!(model.decoder.calls.get(), 6);
    }

    #[test]
    fn test_conditioning_one_short_is_rejected() {
        // U * E == L - 1
        let model = mock(2, 7, 1, 128);
        let x = seed(&[0.0; 8]);
        let err = generate(&model, &x).unwrap_err();
        assert!(matches!(
            err,
            NsynthError::ConditioningTooShort {
                index: 0,
                available: 7,
                required: 8
            }
        ));
        assert_eq!(model.decoder.calls.get(), 0);
    }

    #[test]
    fn test_input_equal_to_receptive_field() {
        let model = mock(4, 2, 2, 0);
        let x = seed(&[0.1, 0.2, 0.3, 0.4]);
        let generation = generate(&model, &x).unwrap();
        let samples: Vec<f32> = generation.samples.to_vec1().unwrap();
        assert_eq!(samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(model.decoder.calls.get(), 0);
    }

    #[test]
    fn test_input_shorter_than_receptive_field() {
        let model = mock(4, 2, 2, 0);
        let x = seed(&[0.1, 0.2, 0.3]);
        assert!(matches!(
            generate(&model, &x),
            Err(NsynthError::InputTooShort {
                length: 3,
                receptive_field: 4
            })
        ));
    }

    #[test]
    fn test_rejects_non_3d_input() {
        let model = mock(2, 4, 2, 0);
        let x = Tensor::zeros(8, DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(generate(&model, &x), Err(NsynthError::Candle(_))));
    }

    #[test]
    fn test_rejects_batched_or_multichannel_input() {
        let model = mock(2, 4, 2, 0);
        for shape in [(2, 1, 8), (1, 2, 8)] {
            let x = Tensor::zeros(shape, DType::F32, &Device::Cpu).unwrap();
            assert!(matches!(
                generate(&model, &x),
                Err(NsynthError::InvalidShape { .. })
            ));
        }
        assert_eq!(model.decoder.calls.get(), 0);
    }

    #[test]
    fn test_progress_counts_generated_samples() {
        let model = mock(4, 3, 2, 200);
        let x = seed(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        let progress = ProgressBar::hidden();
        generate_with_progress(&model, &x, &progress).unwrap();
        assert_eq!(progress.position(), 2);
        assert_eq!(progress.length(), Some(2));
    }
}
